// Plot range - y-axis ceiling shared with whatever renders the series
use serde::Serialize;

pub const DEFAULT_Y_MAX: u32 = 2000;
pub const DEFAULT_Y_STEP: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlotRange {
    pub y_min: u32,
    pub y_max: u32,
    #[serde(skip)]
    step: u32,
}

impl PlotRange {
    pub fn new(y_max: u32, step: u32) -> Self {
        Self {
            y_min: 0,
            y_max,
            step,
        }
    }

    pub fn increase(&mut self) {
        self.y_max = self.y_max.saturating_add(self.step);
    }

    /// Never drops below zero
    pub fn decrease(&mut self) {
        self.y_max = self.y_max.saturating_sub(self.step);
    }
}

impl Default for PlotRange {
    fn default() -> Self {
        Self::new(DEFAULT_Y_MAX, DEFAULT_Y_STEP)
    }
}
