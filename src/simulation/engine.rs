//! Threaded simulation engine
//!
//! Three periodic tasks share the world:
//! - the tick task advances the world every tick period under the graph lock
//!   and hands a snapshot to the renderer,
//! - the junction's signal clock advances stop lights under the signal lock,
//! - the monitor scans for collisions under the graph lock and writes them to
//!   the diagnostics log.
//!
//! Stopping is cooperative: each task finishes its current iteration, sees the
//! running flag cleared and exits.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

use super::config::SimConfig;
use super::monitor::{find_collisions, CollisionLog};
use super::stats::SimStats;
use super::world::SimWorld;
use crate::render::Renderer;

/// Take the graph lock. A panic in another task leaves only plain integer
/// state behind, so a poisoned lock is recovered rather than propagated.
pub fn lock_world(world: &Mutex<SimWorld>) -> MutexGuard<'_, SimWorld> {
    world.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn!("World lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Owns the world and the tasks that run it
pub struct SimulationEngine {
    config: SimConfig,
    world: Arc<Mutex<SimWorld>>,
    running: Arc<AtomicBool>,
    collisions: Arc<AtomicU64>,
    renderer: Option<Box<dyn Renderer>>,
    tick_task: Option<JoinHandle<Box<dyn Renderer>>>,
    monitor_task: Option<JoinHandle<()>>,
    /// Set once the first run has truncated the collision log; later runs
    /// append so the log matches the collision count
    log_started: bool,
}

impl SimulationEngine {
    /// Engine over the standard four-way layout
    pub fn new(config: SimConfig, renderer: Box<dyn Renderer>) -> Result<Self> {
        let world = SimWorld::create_standard_world(config.lane_length, config.seed)
            .context("Failed to build the standard intersection")?;
        Self::with_world(world, config, renderer)
    }

    /// Engine over a caller-built world
    pub fn with_world(world: SimWorld, config: SimConfig, renderer: Box<dyn Renderer>) -> Result<Self> {
        world
            .validate_topology()
            .context("World topology is invalid")?;

        Ok(Self {
            config,
            world: Arc::new(Mutex::new(world)),
            running: Arc::new(AtomicBool::new(false)),
            collisions: Arc::new(AtomicU64::new(0)),
            renderer: Some(renderer),
            tick_task: None,
            monitor_task: None,
            log_started: false,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Shared handle to the world. Lock it with [`lock_world`].
    pub fn world(&self) -> Arc<Mutex<SimWorld>> {
        Arc::clone(&self.world)
    }

    /// Run a closure against the world under the graph lock
    pub fn with_world_locked<R>(&self, f: impl FnOnce(&SimWorld) -> R) -> R {
        f(&lock_world(&self.world))
    }

    /// Counters so far, including collisions seen by the monitor
    pub fn stats(&self) -> SimStats {
        let mut stats = lock_world(&self.world).stats().clone();
        stats.collisions_detected = self.collisions.load(Ordering::Acquire);
        stats
    }

    /// Start the signal clock, the tick task and the monitor
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() || self.tick_task.is_some() {
            anyhow::bail!("Simulation is already running");
        }
        let renderer = self
            .renderer
            .take()
            .context("Renderer is not available")?;

        if let Err(e) = lock_world(&self.world).start_signals(self.config.signal_period) {
            self.renderer = Some(renderer);
            return Err(e);
        }

        self.running.store(true, Ordering::Release);

        match self.spawn_tick_task(renderer) {
            Ok(handle) => self.tick_task = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::Release);
                lock_world(&self.world).stop_signals();
                return Err(e);
            }
        }

        match self.spawn_monitor_task() {
            Ok(handle) => {
                self.monitor_task = Some(handle);
                self.log_started = true;
            }
            Err(e) => error!("Monitor not started: {:#}", e),
        }

        info!(
            "Simulation started (tick {:?}, signal {:?}, monitor {:?})",
            self.config.tick_period, self.config.signal_period, self.config.monitor_period
        );
        Ok(())
    }

    /// Let the running tasks finish their current iteration, then stop the
    /// signal clock
    pub fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::AcqRel);

        if let Some(handle) = self.tick_task.take() {
            match handle.join() {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(_) => error!("Tick task panicked"),
            }
        }
        if let Some(handle) = self.monitor_task.take() {
            if handle.join().is_err() {
                error!("Monitor task panicked");
            }
        }

        let clock = lock_world(&self.world).take_signal_clock();
        if let Some(mut clock) = clock {
            clock.stop();
            info!("Signal clock stopped");
        }

        if was_running {
            info!("Simulation stopped. {}", self.stats().summary());
        }
    }

    fn spawn_tick_task(&self, mut renderer: Box<dyn Renderer>) -> Result<JoinHandle<Box<dyn Renderer>>> {
        let world = Arc::clone(&self.world);
        let running = Arc::clone(&self.running);
        let period = self.config.tick_period;

        thread::Builder::new()
            .name("sim-tick".to_string())
            .spawn(move || {
                while running.load(Ordering::Acquire) {
                    thread::sleep(period);

                    let snapshot = {
                        let mut world = lock_world(&world);
                        world.tick();
                        world.snapshot()
                    };

                    renderer.render(&snapshot);
                }
                debug!("Tick task exited");
                renderer
            })
            .context("Failed to spawn tick thread")
    }

    fn spawn_monitor_task(&self) -> Result<JoinHandle<()>> {
        let world = Arc::clone(&self.world);
        let running = Arc::clone(&self.running);
        let collisions = Arc::clone(&self.collisions);
        let period = self.config.monitor_period;
        let path = self.config.collision_log.clone();
        let append = self.log_started;

        thread::Builder::new()
            .name("sim-monitor".to_string())
            .spawn(move || {
                let opened = if append {
                    CollisionLog::open_append(&path)
                } else {
                    CollisionLog::create(&path)
                };
                let mut log = match opened {
                    Ok(log) => log,
                    Err(e) => {
                        error!("Monitor disabled: {:#}", e);
                        return;
                    }
                };
                info!("Monitor writing to {}", log.path().display());

                while running.load(Ordering::Acquire) {
                    thread::sleep(period);

                    let (tick, found) = {
                        let world = lock_world(&world);
                        (world.stats().ticks, find_collisions(world.state()))
                    };

                    for collision in &found {
                        error!("Collision at tick {}: {}", tick, collision);
                        collisions.fetch_add(1, Ordering::AcqRel);
                        if let Err(e) = log.append(tick, collision) {
                            warn!("{:#}", e);
                        }
                    }
                    if let Err(e) = log.flush() {
                        warn!("{:#}", e);
                    }
                }
                debug!("Monitor task exited");
            })
            .context("Failed to spawn monitor thread")
    }
}

impl Drop for SimulationEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
