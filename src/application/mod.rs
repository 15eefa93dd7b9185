// Application layer - link lifecycle, orchestration and the monitor loop
pub mod link_session;
pub mod monitor_service;
pub mod telemetry_engine;
pub mod transport;

#[cfg(test)]
pub mod test_support;
