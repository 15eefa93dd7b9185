// Snapshot - immutable view of engine state handed to renderers
use super::device_status::DeviceStatus;
use super::peaks::PeakMarker;
use super::plot::PlotRange;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub series: Vec<f64>,
    pub peaks: Vec<PeakMarker>,
    pub latest_peak: Option<f64>,
    pub status: DeviceStatus,
    pub port: String,
    pub status_label: String,
    pub link_error: Option<String>,
    pub plot: PlotRange,
    pub unit: &'static str,
    pub captured_at_ms: i64,
}
