//! Consistency monitor: detects two cars on the same lane position
//!
//! The scan is read-only. Findings go to an append-only text log, one line
//! per collision, so a run can be checked afterwards with grep.

use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::state::TrafficState;
use super::types::{CarId, LaneId};

/// Two cars found at the same spot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub lane: LaneId,
    pub position: u32,
    /// The car seen first in creation order
    pub first: CarId,
    pub second: CarId,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} and {} both at position {} on {}",
            self.first, self.second, self.position, self.lane
        )
    }
}

/// Every pair of cars sharing a (lane, position). A third car on the same
/// spot is reported against the first one.
pub fn find_collisions(state: &TrafficState) -> Vec<Collision> {
    let mut occupied: HashMap<(LaneId, u32), CarId> = HashMap::new();
    let mut collisions = Vec::new();

    for car in state.cars.values() {
        let Some(lane) = car.lane else {
            continue;
        };
        match occupied.get(&(lane, car.position)) {
            Some(&first) => collisions.push(Collision {
                lane,
                position: car.position,
                first,
                second: car.id,
            }),
            None => {
                occupied.insert((lane, car.position), car.id);
            }
        }
    }

    collisions
}

/// Append-only diagnostics file
pub struct CollisionLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CollisionLog {
    /// Open the log, truncating whatever an earlier run left behind
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to open collision log {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Open the log for appending, keeping earlier records
    pub fn open_append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open collision log {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, tick: u64, collision: &Collision) -> Result<()> {
        writeln!(self.writer, "***Collision at tick {}: {}", tick, collision)
            .with_context(|| format!("Failed to write to {}", self.path.display()))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))
    }
}
