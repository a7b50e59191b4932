//! Collision detection and the diagnostics log

use std::fs;
use std::path::PathBuf;

use junction_sim::simulation::{find_collisions, Collision, CollisionLog, LaneId, SimWorld};

fn temp_log(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("junction_sim_{}_{}.log", name, std::process::id()))
}

#[test]
fn test_no_collisions_on_clean_world() {
    let mut world = SimWorld::create_standard_world(50, Some(1)).unwrap();
    world.place_car(LaneId(0), 4, 0).unwrap();
    world.place_car(LaneId(1), 4, 0).unwrap();

    assert!(find_collisions(world.state()).is_empty());
}

#[test]
fn test_detects_cars_sharing_a_position() {
    let mut world = SimWorld::create_standard_world(50, Some(1)).unwrap();
    let first = world.place_car(LaneId(2), 4, 0).unwrap();
    let second = world.place_car(LaneId(2), 6, 0).unwrap();
    world.car_mut(second).unwrap().position = 4;

    let collisions = find_collisions(world.state());

    assert_eq!(
        collisions,
        vec![Collision {
            lane: LaneId(2),
            position: 4,
            first,
            second,
        }]
    );
}

/// Cars parked in a node have no lane and cannot collide
#[test]
fn test_ignores_detached_cars() {
    let mut world = SimWorld::create_standard_world(50, Some(1)).unwrap();
    let a = world.create_detached_car();
    let b = world.create_detached_car();
    assert_eq!(world.car(a).unwrap().position, world.car(b).unwrap().position);

    assert!(find_collisions(world.state()).is_empty());
}

#[test]
fn test_collision_log_records_one_line_per_collision() {
    let path = temp_log("records");
    let mut world = SimWorld::create_standard_world(50, Some(1)).unwrap();
    let first = world.place_car(LaneId(3), 10, 0).unwrap();
    let second = world.place_car(LaneId(3), 12, 0).unwrap();
    world.car_mut(second).unwrap().position = 10;

    let mut log = CollisionLog::create(&path).unwrap();
    for collision in find_collisions(world.state()) {
        log.append(17, &collision).unwrap();
    }
    log.flush().unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("tick 17"));
    assert!(lines[0].contains("position 10"));
    assert!(lines[0].contains("lane#3"));
    assert!(lines[0].contains(&first.to_string()));
    assert!(lines[0].contains(&second.to_string()));

    let _ = fs::remove_file(&path);
}

#[test]
fn test_collision_log_truncates_previous_run() {
    let path = temp_log("truncate");
    fs::write(&path, "stale contents\n").unwrap();

    let mut log = CollisionLog::create(&path).unwrap();
    log.flush().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "");
    let _ = fs::remove_file(&path);
}

#[test]
fn test_collision_log_fails_on_directory() {
    let result = CollisionLog::create(&std::env::temp_dir());
    assert!(result.is_err());
}

#[test]
fn test_collision_log_append_keeps_previous_records() {
    let path = temp_log("append");
    fs::write(&path, "***Collision at tick 1: earlier record\n").unwrap();
    let mut world = SimWorld::create_standard_world(50, Some(1)).unwrap();
    world.place_car(LaneId(1), 6, 0).unwrap();
    let second = world.place_car(LaneId(1), 8, 0).unwrap();
    world.car_mut(second).unwrap().position = 6;

    let mut log = CollisionLog::open_append(&path).unwrap();
    for collision in find_collisions(world.state()) {
        log.append(2, &collision).unwrap();
    }
    log.flush().unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("earlier record"));
    assert!(lines[1].contains("tick 2"));

    let _ = fs::remove_file(&path);
}
