// In-memory transport used by the unit tests
use crate::application::transport::{SerialHandle, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct DeviceState {
    incoming: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    unplugged: bool,
    closed: usize,
}

/// Shared view of the fake device; clones observe the same state.
#[derive(Clone, Default)]
pub struct ScriptedDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl ScriptedDevice {
    pub fn push_line(&self, line: &str) {
        let mut state = self.state.lock().unwrap();
        state.incoming.push_back(format!("{}\r\n", line).into_bytes());
    }

    /// Queue one raw line exactly as given, terminator included
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state.lock().unwrap().incoming.push_back(bytes.to_vec());
    }

    pub fn unplug(&self) {
        self.state.lock().unwrap().unplugged = true;
    }

    pub fn written(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .written
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    pub fn pending_lines(&self) -> usize {
        self.state.lock().unwrap().incoming.len()
    }

    pub fn closed_count(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn handle(&self) -> Box<dyn SerialHandle> {
        Box::new(ScriptedHandle {
            device: self.clone(),
        })
    }
}

pub struct ScriptedHandle {
    device: ScriptedDevice,
}

impl SerialHandle for ScriptedHandle {
    fn has_data(&mut self) -> Result<bool, TransportError> {
        let state = self.device.state.lock().unwrap();
        if state.unplugged {
            return Err(TransportError::Disconnected("unplugged".to_string()));
        }
        Ok(!state.incoming.is_empty())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut state = self.device.state.lock().unwrap();
        if state.unplugged {
            return Err(TransportError::Disconnected("unplugged".to_string()));
        }
        Ok(state.incoming.pop_front().unwrap_or_default())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut state = self.device.state.lock().unwrap();
        if state.unplugged {
            return Err(TransportError::Disconnected("unplugged".to_string()));
        }
        state.written.push(bytes.to_vec());
        Ok(())
    }

    fn close(self: Box<Self>) {
        self.device.state.lock().unwrap().closed += 1;
    }
}

/// Transport whose `open` succeeds against one scripted device unless the port is refused.
pub struct ScriptedTransport {
    pub device: ScriptedDevice,
    refused: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
    open_delay: Duration,
}

impl ScriptedTransport {
    pub fn new(device: ScriptedDevice) -> Self {
        Self {
            device,
            refused: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            open_delay: Duration::ZERO,
        }
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn refuse(&self, port_id: &str) {
        self.refused.lock().unwrap().push(port_id.to_string());
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, port_id: &str, _baud_rate: u32) -> Result<Box<dyn SerialHandle>, TransportError> {
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        self.opened.lock().unwrap().push(port_id.to_string());

        if self.refused.lock().unwrap().iter().any(|p| p == port_id) {
            return Err(TransportError::Open {
                port: port_id.to_string(),
                reason: "access denied".to_string(),
            });
        }
        Ok(self.device.handle())
    }

    async fn list_ports(&self) -> Result<Vec<String>, TransportError> {
        Ok(vec!["COM7".to_string(), "/dev/ttyACM0".to_string()])
    }
}
