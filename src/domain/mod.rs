// Domain layer - protocol types and measurement state
pub mod command;
pub mod device_status;
pub mod peaks;
pub mod plot;
pub mod series;
pub mod snapshot;
pub mod telemetry;
