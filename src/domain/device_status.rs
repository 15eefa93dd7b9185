// Device status - reported power state and link state
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    #[default]
    Unknown,
    Awake,
    Asleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeviceStatus {
    pub power: PowerState,
    pub link: LinkState,
}

impl DeviceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_power(&mut self, awake: bool) {
        self.power = if awake {
            PowerState::Awake
        } else {
            PowerState::Asleep
        };
    }

    pub fn apply_link(&mut self, link: LinkState) {
        self.link = link;
    }

    /// Human label for a status line, e.g. "COM7 Active"
    pub fn label(&self, port_id: &str) -> String {
        match self.link {
            LinkState::Connected => format!("{} Active", port_id),
            LinkState::Connecting => format!("Checking {}...", port_id),
            LinkState::Disconnected => format!("{} Inactive", port_id),
        }
    }
}
