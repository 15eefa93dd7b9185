// Peak registry - sticky peak markers reported by the device
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakMarker {
    pub index: u32,
    pub value: f64,
}

impl PeakMarker {
    pub fn new(index: u32, value: f64) -> Self {
        Self { index, value }
    }
}

/// Markers accumulate until `reset`. `latest` always mirrors the last marker.
#[derive(Debug, Clone, Default)]
pub struct PeakRegistry {
    markers: Vec<PeakMarker>,
    latest: Option<f64>,
}

impl PeakRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, index: u32, value: f64) {
        self.markers.push(PeakMarker::new(index, value));
        self.latest = Some(value);
    }

    pub fn reset(&mut self) {
        self.markers.clear();
        self.latest = None;
    }

    /// Insertion order; this is exactly the set of reference lines a renderer draws
    pub fn snapshot(&self) -> Vec<PeakMarker> {
        self.markers.clone()
    }

    pub fn latest(&self) -> Option<f64> {
        self.latest
    }
}
