//! Threaded engine: start, stop, restart and the monitor

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use junction_sim::render::{NullRenderer, RenderSnapshot, Renderer};
use junction_sim::simulation::{
    lock_world, CarId, LaneId, SimConfig, SimWorld, SimulationEngine,
};

fn test_config(name: &str) -> SimConfig {
    SimConfig {
        tick_period: Duration::from_millis(5),
        signal_period: Duration::from_millis(20),
        monitor_period: Duration::from_millis(5),
        lane_length: 20,
        seed: Some(3),
        collision_log: std::env::temp_dir()
            .join(format!("junction_sim_engine_{}_{}.log", name, std::process::id())),
    }
}

/// Counts snapshots it is handed
struct CountingRenderer {
    frames: Arc<AtomicUsize>,
}

impl Renderer for CountingRenderer {
    fn render(&mut self, _snapshot: &RenderSnapshot) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }
}

fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

fn cleanup(path: &PathBuf) {
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_start_and_stop_runs_ticks() {
    let config = test_config("start_stop");
    let log_path = config.collision_log.clone();
    let mut engine = SimulationEngine::new(config, Box::new(NullRenderer)).unwrap();
    assert!(!engine.is_running());
    assert_eq!(engine.config().tick_period, Duration::from_millis(5));

    engine.start().unwrap();
    assert!(engine.is_running());
    assert!(wait_for(Duration::from_secs(5), || engine.stats().ticks >= 10));

    engine.stop();
    assert!(!engine.is_running());
    let ticks = engine.stats().ticks;

    thread::sleep(Duration::from_millis(30));
    assert_eq!(engine.stats().ticks, ticks, "no ticks after stop");
    assert_eq!(engine.stats().collisions_detected, 0);
    assert!(log_path.exists(), "monitor creates its log");

    cleanup(&log_path);
}

#[test]
fn test_double_start_is_rejected() {
    let config = test_config("double_start");
    let log_path = config.collision_log.clone();
    let mut engine = SimulationEngine::new(config, Box::new(NullRenderer)).unwrap();

    engine.start().unwrap();
    assert!(engine.start().is_err());
    assert!(engine.is_running());

    engine.stop();
    cleanup(&log_path);
}

#[test]
fn test_stop_without_start_is_harmless() {
    let mut engine = SimulationEngine::new(test_config("idle"), Box::new(NullRenderer)).unwrap();
    engine.stop();
    engine.stop();
    assert!(!engine.is_running());
    assert_eq!(engine.stats().ticks, 0);
}

#[test]
fn test_engine_can_restart() {
    let config = test_config("restart");
    let log_path = config.collision_log.clone();
    let mut engine = SimulationEngine::new(config, Box::new(NullRenderer)).unwrap();

    engine.start().unwrap();
    assert!(wait_for(Duration::from_secs(5), || engine.stats().ticks >= 3));
    engine.stop();
    let first_run = engine.stats().ticks;

    engine.start().unwrap();
    assert!(wait_for(Duration::from_secs(5), || engine
        .stats()
        .ticks
        >= first_run + 3));
    engine.stop();

    cleanup(&log_path);
}

#[test]
fn test_renderer_receives_snapshots() {
    let frames = Arc::new(AtomicUsize::new(0));
    let renderer = CountingRenderer {
        frames: Arc::clone(&frames),
    };
    let config = test_config("renderer");
    let log_path = config.collision_log.clone();
    let mut engine = SimulationEngine::new(config, Box::new(renderer)).unwrap();

    engine.start().unwrap();
    assert!(wait_for(Duration::from_secs(5), || frames.load(Ordering::SeqCst) >= 5));
    engine.stop();

    let rendered = frames.load(Ordering::SeqCst) as u64;
    assert_eq!(rendered, engine.stats().ticks, "one snapshot per tick");

    cleanup(&log_path);
}

/// The monitor failing to open its log does not take the tick task down
#[test]
fn test_ticks_continue_when_monitor_cannot_start() {
    let mut config = test_config("monitor_failure");
    config.collision_log = std::env::temp_dir();
    let mut engine = SimulationEngine::new(config, Box::new(NullRenderer)).unwrap();

    engine.start().unwrap();
    assert!(wait_for(Duration::from_secs(5), || engine.stats().ticks >= 5));
    engine.stop();
}

#[test]
fn test_signals_cycle_while_running() {
    let config = test_config("signals");
    let log_path = config.collision_log.clone();
    let mut engine = SimulationEngine::new(config, Box::new(NullRenderer)).unwrap();
    let world = engine.world();
    let north = LaneId(0);
    let initial = lock_world(&world).get_signal(north);

    engine.start().unwrap();
    let changed = wait_for(Duration::from_secs(5), || {
        lock_world(&world).get_signal(north) != initial
    });
    engine.stop();

    assert!(changed, "stop light never changed");
    cleanup(&log_path);
}

#[test]
fn test_rejects_invalid_world() {
    let mut world = SimWorld::new();
    world.add_origin();

    let result = SimulationEngine::with_world(world, test_config("invalid"), Box::new(NullRenderer));
    assert!(result.is_err());
}

/// Two cars forced onto one spot at the back of a queue held by a red light
fn collision_world(lane_length: u32) -> SimWorld {
    let mut world = SimWorld::create_standard_world(lane_length, Some(5)).unwrap();
    world.place_car(LaneId(0), 10, 0).unwrap();
    let second = world.place_car(LaneId(0), 12, 0).unwrap();
    world.car_mut(second).unwrap().position = 10;
    for position in (12..=lane_length).step_by(2) {
        world.place_car(LaneId(0), position, 0).unwrap();
    }
    world
}

fn log_lines(path: &PathBuf) -> u64 {
    std::fs::read_to_string(path)
        .map(|contents| contents.lines().count() as u64)
        .unwrap_or(0)
}

#[test]
fn test_engine_reports_collisions() {
    let mut config = test_config("collisions");
    config.signal_period = Duration::from_secs(60);
    let log_path = config.collision_log.clone();
    let world = collision_world(config.lane_length);
    let (first, second) = (CarId(0), CarId(1));
    let mut engine = SimulationEngine::with_world(world, config, Box::new(NullRenderer)).unwrap();

    engine.start().unwrap();
    assert!(wait_for(Duration::from_secs(5), || engine
        .stats()
        .collisions_detected
        > 0));
    engine.stop();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents.starts_with("***Collision at tick"));
    assert!(contents.contains(&first.to_string()));
    assert!(contents.contains(&second.to_string()));

    cleanup(&log_path);
}

/// A restart keeps earlier records, so the log always matches the count
#[test]
fn test_collision_log_matches_count_across_restart() {
    let mut config = test_config("restart_log");
    config.signal_period = Duration::from_secs(60);
    let log_path = config.collision_log.clone();
    let world = collision_world(config.lane_length);
    let mut engine = SimulationEngine::with_world(world, config, Box::new(NullRenderer)).unwrap();

    engine.start().unwrap();
    assert!(wait_for(Duration::from_secs(5), || engine
        .stats()
        .collisions_detected
        >= 3));
    engine.stop();
    let first_run = engine.stats().collisions_detected;
    assert_eq!(log_lines(&log_path), first_run);

    engine.start().unwrap();
    assert!(wait_for(Duration::from_secs(5), || engine
        .stats()
        .collisions_detected
        >= first_run + 3));
    engine.stop();

    assert_eq!(log_lines(&log_path), engine.stats().collisions_detected);
    cleanup(&log_path);
}

/// Stopping interrupts the phase clock's wait and never holds the world
/// while the clock winds down
#[test]
fn test_stop_is_prompt_with_long_signal_period() {
    let mut config = test_config("prompt_stop");
    config.signal_period = Duration::from_secs(60);
    let log_path = config.collision_log.clone();
    let mut engine = SimulationEngine::new(config, Box::new(NullRenderer)).unwrap();
    assert_eq!(engine.config().signal_period, Duration::from_secs(60));
    let world = engine.world();

    engine.start().unwrap();
    assert!(lock_world(&world).intersection().unwrap().are_signals_running());
    assert!(wait_for(Duration::from_secs(5), || engine.stats().ticks >= 3));

    let reader = {
        let world = Arc::clone(&world);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let started = Instant::now();
            let _guard = lock_world(&world);
            started.elapsed()
        })
    };

    let started = Instant::now();
    engine.stop();
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "stop took {:?}",
        started.elapsed()
    );

    let lock_wait = reader.join().unwrap();
    assert!(lock_wait < Duration::from_secs(2), "world lock held for {:?}", lock_wait);
    assert!(!lock_world(&world).intersection().unwrap().are_signals_running());

    cleanup(&log_path);
}
