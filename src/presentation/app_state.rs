// Application state for HTTP handlers
use crate::application::monitor_service::MonitorHandle;

#[derive(Clone)]
pub struct AppState {
    pub monitor: MonitorHandle,
}
