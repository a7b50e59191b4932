//! Running counters for a simulation session

/// Counters updated by the tick, the lifecycle handler and the monitor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    pub ticks: u64,
    pub cars_spawned: u64,
    pub cars_released: u64,
    /// Creation requests dropped because the lane entry was occupied
    pub spawns_dropped: u64,
    /// Deletion requests for cars that were no longer live
    pub stale_releases: u64,
    pub collisions_detected: u64,
}

impl SimStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cars allocated and not yet released
    pub fn active_cars(&self) -> u64 {
        self.cars_spawned.saturating_sub(self.cars_released)
    }

    /// Share of spawned cars that made it to a sink, as a percentage
    pub fn completion_rate(&self) -> f32 {
        if self.cars_spawned == 0 {
            return 0.0;
        }
        self.cars_released as f32 / self.cars_spawned as f32 * 100.0
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        format!(
            "Ticks: {} | Spawned: {} | Released: {} | Active: {} | Dropped spawns: {} | Stale releases: {} | Collisions: {} | Completion: {:.1}%",
            self.ticks,
            self.cars_spawned,
            self.cars_released,
            self.active_cars(),
            self.spawns_dropped,
            self.stale_releases,
            self.collisions_detected,
            self.completion_rate()
        )
    }
}
