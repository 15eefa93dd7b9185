// Rolling series - bounded FIFO history of readings
use std::collections::VecDeque;

pub const DEFAULT_SERIES_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct RollingSeries {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingSeries {
    /// A capacity of zero is bumped to one so `append` always retains the newest value.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Oldest first, most recent last
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

impl Default for RollingSeries {
    fn default() -> Self {
        Self::new(DEFAULT_SERIES_CAPACITY)
    }
}
