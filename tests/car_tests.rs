//! Car motion rules
//!
//! These tests drive single cars on a short lane ending at the junction.

use junction_sim::simulation::{CarMove, LaneId, NodeId, SignalColor, SimWorld};

const LANE_LENGTH: u32 = 10;

/// Origin -> junction -> terminal, both lanes of length 10
fn build_world(initial: SignalColor) -> (SimWorld, LaneId, LaneId, NodeId) {
    let mut world = SimWorld::new_with_seed(7);
    let origin = world.add_origin();
    let junction = world.add_intersection().unwrap();
    let terminal = world.add_terminal();
    let incoming = world.add_lane(origin, junction, LANE_LENGTH).unwrap();
    let outgoing = world.add_lane(junction, terminal, LANE_LENGTH).unwrap();
    world.create_connection(incoming, outgoing, initial).unwrap();
    (world, incoming, outgoing, junction)
}

#[test]
fn test_car_blocked_by_car() {
    let (mut world, incoming, _, _) = build_world(SignalColor::Red);

    let car1 = world.place_car(incoming, 0, 0).unwrap();
    world.car_mut(car1).unwrap().accelerate();
    for _ in 0..5 {
        world.move_car(car1);
    }
    assert_eq!(world.car(car1).unwrap().position, 10, "precondition: car1 at 10");

    let car2 = world.place_car(incoming, 0, 0).unwrap();
    world.car_mut(car2).unwrap().accelerate();
    for _ in 0..4 {
        world.move_car(car2);
    }
    assert_eq!(world.car(car2).unwrap().position, 8, "precondition: car2 at 8");

    assert!(!world.can_move(car2));
}

#[test]
fn test_car_blocked_by_red_signal() {
    let (mut world, incoming, _, _) = build_world(SignalColor::Red);

    let car = world.place_car(incoming, 0, 0).unwrap();
    world.car_mut(car).unwrap().accelerate();
    for _ in 0..5 {
        world.move_car(car);
    }
    assert_eq!(world.car(car).unwrap().position, 10, "precondition: car at 10");

    assert!(!world.can_move(car));
}

#[test]
fn test_car_unblocked() {
    let (mut world, incoming, _, _) = build_world(SignalColor::Red);

    let car = world.place_car(incoming, 0, 0).unwrap();
    world.car_mut(car).unwrap().accelerate();
    for _ in 0..4 {
        world.move_car(car);
    }
    assert_eq!(world.car(car).unwrap().position, 8, "precondition: car at 8");

    assert!(world.can_move(car));
}

/// A stopped car at the end of the lane looks two units ahead into the junction
#[test]
fn test_stopped_car_at_lane_end_can_move_on_green() {
    let (mut world, incoming, _, _) = build_world(SignalColor::Green);
    let car = world.place_car(incoming, LANE_LENGTH, 0).unwrap();
    assert!(world.can_move(car));
}

#[test]
fn test_yellow_signal_admits_cars() {
    let (mut world, incoming, _, _) = build_world(SignalColor::Yellow);
    let car = world.place_car(incoming, LANE_LENGTH, 2).unwrap();
    assert!(world.can_move(car));
}

/// A movable car at the front makes the whole queue behind it movable
#[test]
fn test_movable_chain_propagates_backward() {
    let (mut world, incoming, _, _) = build_world(SignalColor::Green);
    let front = world.place_car(incoming, 10, 0).unwrap();
    let middle = world.place_car(incoming, 8, 0).unwrap();
    let back = world.place_car(incoming, 6, 0).unwrap();

    assert!(world.can_move(front));
    assert!(world.can_move(middle));
    assert!(world.can_move(back));
}

/// A full junction slot blocks the front car and everything queued behind it
#[test]
fn test_blocked_chain_propagates_backward() {
    let (mut world, incoming, outgoing, junction) = build_world(SignalColor::Green);
    let parked = world.create_detached_car();
    world.accept(junction, incoming, parked);
    assert_eq!(
        world.intersection().unwrap().buffered_car(outgoing),
        Some(parked)
    );

    let front = world.place_car(incoming, 10, 2).unwrap();
    let middle = world.place_car(incoming, 8, 2).unwrap();
    let back = world.place_car(incoming, 6, 2).unwrap();

    assert!(!world.can_move(front));
    assert!(!world.can_move(middle));
    assert!(!world.can_move(back));
}

#[test]
fn test_accelerate_and_decelerate() {
    let (mut world, incoming, _, _) = build_world(SignalColor::Red);
    let car = world.place_car(incoming, 0, 0).unwrap();

    let car = world.car_mut(car).unwrap();
    assert!(!car.is_moving());
    car.accelerate();
    assert_eq!(car.speed, 2);
    assert!(car.is_moving());
    car.decelerate();
    assert_eq!(car.speed, 0);
    car.decelerate();
    assert_eq!(car.speed, 0, "speed is floored at zero");
}

/// A car at the lane end on green leaves the lane and waits in the junction
#[test]
fn test_step_hands_car_to_junction() {
    let (mut world, incoming, outgoing, junction) = build_world(SignalColor::Green);
    let car = world.place_car(incoming, LANE_LENGTH, 2).unwrap();

    assert_eq!(world.step_car(car), CarMove::HandedOff(junction));

    let state = world.car(car).unwrap();
    assert_eq!(state.lane, None);
    assert_eq!(state.speed, 2);
    assert!(world.lane(incoming).unwrap().cars().is_empty());
    assert_eq!(world.intersection().unwrap().buffered_car(outgoing), Some(car));
}

/// On red the car brakes and stays where it is
#[test]
fn test_step_holds_car_at_red() {
    let (mut world, incoming, outgoing, _) = build_world(SignalColor::Red);
    let car = world.place_car(incoming, LANE_LENGTH, 2).unwrap();

    assert_eq!(world.step_car(car), CarMove::Advanced(LANE_LENGTH));

    let state = world.car(car).unwrap();
    assert_eq!(state.speed, 0);
    assert_eq!(state.position, LANE_LENGTH);
    assert_eq!(state.lane, Some(incoming));
    assert_eq!(world.intersection().unwrap().buffered_car(outgoing), None);
}

/// Moving without the speed rule refuses the hand-off when the exit says no
#[test]
fn test_move_is_held_when_exit_refuses() {
    let (mut world, incoming, _, _) = build_world(SignalColor::Red);
    let car = world.place_car(incoming, LANE_LENGTH, 2).unwrap();

    assert_eq!(world.move_car(car), CarMove::Held);
    assert_eq!(world.car(car).unwrap().position, LANE_LENGTH);
}

#[test]
fn test_detached_car_is_not_moved() {
    let (mut world, _, _, _) = build_world(SignalColor::Green);
    let car = world.create_detached_car();
    world.car_mut(car).unwrap().speed = 4;

    assert!(!world.can_move(car));
    assert_eq!(world.step_car(car), CarMove::Detached);
    assert_eq!(world.car(car).unwrap().speed, 4, "parked cars keep their speed");
}

#[test]
fn test_place_car_rejects_occupied_and_out_of_range() {
    let (mut world, incoming, _, _) = build_world(SignalColor::Red);
    world.place_car(incoming, 4, 0).unwrap();

    assert!(world.place_car(incoming, 4, 0).is_err());
    assert!(world.place_car(incoming, LANE_LENGTH + 1, 0).is_err());
    assert!(world.place_car(LaneId(99), 0, 0).is_err());
}
