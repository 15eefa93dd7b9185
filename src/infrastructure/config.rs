use crate::application::monitor_service::MonitorTiming;
use crate::application::telemetry_engine::EngineOptions;
use crate::domain::plot::{PlotRange, DEFAULT_Y_MAX, DEFAULT_Y_STEP};
use crate::domain::series::DEFAULT_SERIES_CAPACITY;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub plot: PlotSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub settle_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "COM7".to_string(),
            baud_rate: 9600,
            settle_ms: 2000,
            read_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineSettings {
    pub series_capacity: usize,
    pub clear_also_resets_peaks: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            series_capacity: DEFAULT_SERIES_CAPACITY,
            clear_also_resets_peaks: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingSettings {
    pub tick_ms: u64,
    pub reconnect_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            reconnect_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlotSettings {
    pub y_max: u32,
    pub step: u32,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            y_max: DEFAULT_Y_MAX,
            step: DEFAULT_Y_STEP,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            series_capacity: self.engine.series_capacity,
            clear_also_resets_peaks: self.engine.clear_also_resets_peaks,
        }
    }

    /// Zero intervals would spin the monitor loop, so they are floored at 1ms.
    pub fn timing(&self) -> MonitorTiming {
        MonitorTiming {
            tick: Duration::from_millis(self.timing.tick_ms.max(1)),
            reconnect: Duration::from_millis(self.timing.reconnect_ms.max(1)),
            settle: Duration::from_millis(self.serial.settle_ms),
        }
    }

    pub fn plot_range(&self) -> PlotRange {
        PlotRange::new(self.plot.y_max, self.plot.step)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.read_timeout_ms)
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.server.bind.parse()?)
    }
}

/// Layer `config/monitor.{toml,...}` (optional) under `LOADCELL__*` environment overrides
pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(
            config::Environment::with_prefix("LOADCELL")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
