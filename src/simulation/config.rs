//! Runtime settings for a simulation session

use std::path::PathBuf;
use std::time::Duration;

use super::types::DEFAULT_LANE_LENGTH;

/// Period of the main tick task
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(250);

/// Period of the stop light phase clock
pub const DEFAULT_SIGNAL_PERIOD: Duration = Duration::from_millis(1000);

/// Period of the collision monitor
pub const DEFAULT_MONITOR_PERIOD: Duration = Duration::from_millis(125);

/// Default diagnostics log written by the monitor
pub const DEFAULT_COLLISION_LOG: &str = "collisions.log";

/// Settings for a simulation engine
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub tick_period: Duration,
    pub signal_period: Duration,
    pub monitor_period: Duration,
    pub lane_length: u32,
    /// Seed for reproducible generator rolls; `None` uses the thread RNG
    pub seed: Option<u64>,
    pub collision_log: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            signal_period: DEFAULT_SIGNAL_PERIOD,
            monitor_period: DEFAULT_MONITOR_PERIOD,
            lane_length: DEFAULT_LANE_LENGTH,
            seed: None,
            collision_log: PathBuf::from(DEFAULT_COLLISION_LOG),
        }
    }
}
