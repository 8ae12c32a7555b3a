//! Bounded per-tick history for external charting.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySample {
    pub tick: u64,
    pub live_cells: usize,
    pub food: usize,
    pub highest_generation: u32,
}

#[derive(Debug, Clone)]
pub struct PopulationHistory {
    capacity: usize,
    samples: VecDeque<HistorySample>,
}

impl Default for PopulationHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl PopulationHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Append a sample, evicting the oldest once full
    pub fn record(&mut self, sample: HistorySample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> + '_ {
        self.samples.iter()
    }

    pub fn peak_population(&self) -> usize {
        self.samples.iter().map(|s| s.live_cells).max().unwrap_or(0)
    }
}
