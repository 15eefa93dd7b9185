// Telemetry engine - applies decoded device events to measurement state
use crate::application::link_session::{ConnectAttempt, ConnectOutcome, ConnectResult, LinkSession, SendError};
use crate::domain::command::Command;
use crate::domain::device_status::DeviceStatus;
use crate::domain::peaks::PeakRegistry;
use crate::domain::plot::PlotRange;
use crate::domain::series::{RollingSeries, DEFAULT_SERIES_CAPACITY};
use crate::domain::snapshot::TelemetrySnapshot;
use crate::domain::telemetry::{decode, TelemetryEvent};

pub const UNIT: &str = "oz";

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub series_capacity: usize,
    /// Whether the user "clear" action also drops peak markers
    pub clear_also_resets_peaks: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            series_capacity: DEFAULT_SERIES_CAPACITY,
            clear_also_resets_peaks: true,
        }
    }
}

/// Owns all measurement state plus the link. Not reentrant: callers serialize access.
#[derive(Debug)]
pub struct TelemetryEngine {
    series: RollingSeries,
    peaks: PeakRegistry,
    status: DeviceStatus,
    link: LinkSession,
    plot: PlotRange,
    options: EngineOptions,
}

impl TelemetryEngine {
    pub fn new(link: LinkSession, options: EngineOptions, plot: PlotRange) -> Self {
        let mut status = DeviceStatus::new();
        status.apply_link(link.state());

        Self {
            series: RollingSeries::new(options.series_capacity),
            peaks: PeakRegistry::new(),
            status,
            link,
            plot,
            options,
        }
    }

    /// One telemetry tick: pull at most one line, decode and apply it.
    pub fn tick(&mut self) -> Option<TelemetryEvent> {
        let line = self.link.poll_line();
        self.sync_link();

        let line = line?;
        let event = decode(&strip_invalid_utf8(&line));
        self.apply(&event);
        Some(event)
    }

    pub fn apply(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::Measurement(value) => self.series.append(*value),
            TelemetryEvent::PeakReport { index, value } => self.peaks.record(*index, *value),
            TelemetryEvent::PeakReset => self.peaks.reset(),
            TelemetryEvent::PowerState { awake } => self.status.apply_power(*awake),
            TelemetryEvent::Unrecognized(raw) => {
                tracing::debug!("Ignoring unrecognized line: {:?}", raw);
            }
        }
    }

    pub fn clear_all(&mut self) {
        self.series.clear();
        if self.options.clear_also_resets_peaks {
            self.peaks.reset();
        }
    }

    pub fn send(&mut self, command: &Command) -> Result<(), SendError> {
        let sent = self.link.send(command);
        self.sync_link();
        sent
    }

    pub fn select_port(&mut self, port_id: impl Into<String>) {
        self.link.select_port(port_id);
        self.sync_link();
    }

    pub fn begin_connect(&mut self) -> Option<ConnectAttempt> {
        let attempt = self.link.begin_connect();
        self.sync_link();
        attempt
    }

    pub fn complete_connect(&mut self, result: ConnectResult) -> ConnectOutcome {
        let outcome = self.link.complete_connect(result);
        self.sync_link();
        outcome
    }

    pub fn shutdown(&mut self) {
        self.link.shutdown();
        self.sync_link();
    }

    pub fn plot_mut(&mut self) -> &mut PlotRange {
        &mut self.plot
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let port = self.link.port_id().to_string();
        TelemetrySnapshot {
            series: self.series.snapshot(),
            peaks: self.peaks.snapshot(),
            latest_peak: self.peaks.latest(),
            status: self.status,
            status_label: self.status.label(&port),
            port,
            link_error: self.link.last_error().map(str::to_string),
            plot: self.plot,
            unit: UNIT,
            captured_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    fn sync_link(&mut self) {
        self.status.apply_link(self.link.state());
    }
}

/// Keep the valid UTF-8 runs of a raw line and drop everything else, so boot
/// noise glued to a reading does not cost the reading itself.
fn strip_invalid_utf8(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
