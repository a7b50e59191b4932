//! Signalized junction for the intersection simulation
//!
//! The junction is both the exit node of every inbound lane and the entry node
//! of every outbound lane. Each inbound lane has its own stop light and is
//! routed to exactly one outbound lane. A car crossing the junction waits in a
//! single slot per outbound lane until position 0 of that lane is free.
//!
//! Stop lights sit behind their own lock so the phase clock thread can advance
//! them without touching the lane graph.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use super::nodes::{Enterable, Exitable};
use super::state::TickContext;
use super::types::{CarId, LaneId, NodeId};

/// Stop light colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalColor {
    Red,
    Yellow,
    Green,
}

impl SignalColor {
    /// Number of phase ticks a light stays in this color
    pub fn dwell(self) -> u32 {
        match self {
            SignalColor::Red => 5,
            SignalColor::Green => 4,
            SignalColor::Yellow => 1,
        }
    }

    /// Red -> Green -> Yellow -> Red
    pub fn next(self) -> SignalColor {
        match self {
            SignalColor::Red => SignalColor::Green,
            SignalColor::Green => SignalColor::Yellow,
            SignalColor::Yellow => SignalColor::Red,
        }
    }
}

impl fmt::Display for SignalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalColor::Red => "red",
            SignalColor::Yellow => "yellow",
            SignalColor::Green => "green",
        };
        f.write_str(name)
    }
}

/// A single stop light counting down phase ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopLight {
    state: SignalColor,
    wait_ticks: u32,
}

impl StopLight {
    pub fn new(initial: SignalColor) -> Self {
        Self {
            state: initial,
            wait_ticks: initial.dwell(),
        }
    }

    pub fn state(&self) -> SignalColor {
        self.state
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.wait_ticks
    }

    /// Count down one phase tick, switching color when the countdown runs out
    pub fn process_tick(&mut self) {
        self.wait_ticks = self.wait_ticks.saturating_sub(1);
        if self.wait_ticks == 0 {
            self.advance();
        }
    }

    pub fn advance(&mut self) {
        self.state = self.state.next();
        self.wait_ticks = self.state.dwell();
    }
}

/// Stop lights keyed by the inbound lane they guard
pub type SignalBank = Arc<Mutex<BTreeMap<LaneId, StopLight>>>;

fn lock_signals(signals: &SignalBank) -> MutexGuard<'_, BTreeMap<LaneId, StopLight>> {
    signals.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Advance every stop light in the bank by one phase tick
pub fn pulse_signals(signals: &SignalBank) {
    let mut lights = lock_signals(signals);
    for light in lights.values_mut() {
        light.process_tick();
    }
}

/// Background thread driving the stop lights
#[derive(Debug)]
pub struct SignalClock {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SignalClock {
    /// Spawn the phase clock. Each period it waits, then advances every light.
    /// The wait ends early when the clock is stopped.
    pub fn start(signals: SignalBank, period: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("signal-clock".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => pulse_signals(&signals),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Signal clock exited");
            })
            .context("Failed to spawn signal clock thread")?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Interrupt the current wait and join the clock thread
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Signal clock thread panicked");
            }
        }
    }
}

impl Drop for SignalClock {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A junction in the simulation
#[derive(Debug)]
pub struct SimIntersection {
    pub id: NodeId,
    /// Route from each inbound lane to its outbound lane
    connections: BTreeMap<LaneId, LaneId>,
    /// Car waiting to enter each outbound lane
    car_buffer: BTreeMap<LaneId, Option<CarId>>,
    signals: SignalBank,
    clock: Option<SignalClock>,
}

impl SimIntersection {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            connections: BTreeMap::new(),
            car_buffer: BTreeMap::new(),
            signals: Arc::new(Mutex::new(BTreeMap::new())),
            clock: None,
        }
    }

    /// Route `from` onto `to` and give `from` a stop light in `initial_signal`
    pub fn create_connection(&mut self, from: LaneId, to: LaneId, initial_signal: SignalColor) {
        self.connections.insert(from, to);
        self.car_buffer.entry(to).or_insert(None);
        lock_signals(&self.signals).insert(from, StopLight::new(initial_signal));
    }

    pub fn connections(&self) -> impl Iterator<Item = (LaneId, LaneId)> + '_ {
        self.connections.iter().map(|(from, to)| (*from, *to))
    }

    pub fn route(&self, from: LaneId) -> Option<LaneId> {
        self.connections.get(&from).copied()
    }

    /// Car parked in the slot for outbound lane `to`
    pub fn buffered_car(&self, to: LaneId) -> Option<CarId> {
        self.car_buffer.get(&to).copied().flatten()
    }

    /// Cars currently parked inside the junction
    pub fn buffered_cars(&self) -> impl Iterator<Item = CarId> + '_ {
        self.car_buffer.values().filter_map(|slot| *slot)
    }

    /// Current color of the light guarding `lane`
    pub fn get_signal(&self, lane: LaneId) -> Option<SignalColor> {
        lock_signals(&self.signals).get(&lane).map(StopLight::state)
    }

    /// Copy of every light, taken under the signal lock
    pub fn signal_states(&self) -> BTreeMap<LaneId, StopLight> {
        lock_signals(&self.signals).clone()
    }

    pub fn signal_bank(&self) -> SignalBank {
        Arc::clone(&self.signals)
    }

    pub fn start_traffic_signals(&mut self, period: Duration) -> Result<()> {
        if self.clock.as_ref().is_some_and(SignalClock::is_running) {
            return Ok(());
        }
        self.clock = Some(SignalClock::start(self.signal_bank(), period)?);
        info!("Signal clock started for {} ({:?} per phase)", self.id, period);
        Ok(())
    }

    pub fn stop_traffic_signals(&mut self) {
        if let Some(mut clock) = self.take_signal_clock() {
            clock.stop();
            info!("Signal clock stopped for {}", self.id);
        }
    }

    /// Detach the running clock so it can be stopped without holding the
    /// world
    pub fn take_signal_clock(&mut self) -> Option<SignalClock> {
        self.clock.take()
    }

    pub fn are_signals_running(&self) -> bool {
        self.clock.as_ref().is_some_and(SignalClock::is_running)
    }
}

impl Enterable for SimIntersection {
    fn can_enter(&self, from: LaneId) -> bool {
        match self.get_signal(from) {
            None | Some(SignalColor::Red) => false,
            Some(_) => self
                .route(from)
                .is_some_and(|to| self.buffered_car(to).is_none()),
        }
    }

    /// Park the car in the slot of the routed outbound lane. Overwrites an
    /// occupied slot, so callers check `can_enter` first.
    fn accept(&mut self, from: LaneId, car: CarId) {
        let Some(to) = self.route(from) else {
            warn!("{} has no route from {}, dropping {}", self.id, from, car);
            return;
        };
        self.car_buffer.insert(to, Some(car));
    }

    fn process_before_tick(&mut self, _ctx: &mut TickContext<'_>) {}
}

impl Exitable for SimIntersection {
    /// Move each parked car onto position 0 of its outbound lane when free
    fn process_after_tick(&mut self, ctx: &mut TickContext<'_>) {
        for (to, slot) in self.car_buffer.iter_mut() {
            let Some(car) = *slot else {
                continue;
            };
            if !ctx.state.is_entry_free(*to) {
                continue;
            }
            ctx.state.attach_car(car, *to);
            *slot = None;
        }
    }
}
