// Link session - connection lifecycle for the serial device
use crate::application::transport::{SerialHandle, Transport, TransportError};
use crate::domain::command::Command;
use crate::domain::device_status::LinkState;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("link is not connected")]
    NotConnected,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Ticket for one connect attempt. The generation ties the eventual result
/// back to the port selection that was current when the attempt started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub generation: u64,
    pub port_id: String,
    pub baud_rate: u32,
}

pub struct ConnectResult {
    pub generation: u64,
    pub port_id: String,
    pub result: Result<Box<dyn SerialHandle>, TransportError>,
}

impl fmt::Debug for ConnectResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectResult")
            .field("generation", &self.generation)
            .field("port_id", &self.port_id)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

impl ConnectAttempt {
    /// Open the port, then give the device its boot time before reporting success.
    pub async fn run(self, transport: Arc<dyn Transport>, settle: Duration) -> ConnectResult {
        let result = match transport.open(&self.port_id, self.baud_rate).await {
            Ok(handle) => {
                tokio::time::sleep(settle).await;
                Ok(handle)
            }
            Err(e) => Err(e),
        };

        ConnectResult {
            generation: self.generation,
            port_id: self.port_id,
            result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    Failed,
    /// Superseded by a port change or shutdown
    Discarded,
}

pub struct LinkSession {
    port_id: String,
    baud_rate: u32,
    state: LinkState,
    handle: Option<Box<dyn SerialHandle>>,
    generation: u64,
    last_error: Option<String>,
}

impl fmt::Debug for LinkSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkSession")
            .field("port_id", &self.port_id)
            .field("baud_rate", &self.baud_rate)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}

impl LinkSession {
    pub fn new(port_id: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_id: port_id.into(),
            baud_rate,
            state: LinkState::Disconnected,
            handle: None,
            generation: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn port_id(&self) -> &str {
        &self.port_id
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Start a connect attempt. Only valid from `Disconnected`.
    pub fn begin_connect(&mut self) -> Option<ConnectAttempt> {
        if self.state != LinkState::Disconnected {
            return None;
        }

        self.generation += 1;
        self.state = LinkState::Connecting;
        tracing::debug!("Connecting to {} (attempt {})", self.port_id, self.generation);

        Some(ConnectAttempt {
            generation: self.generation,
            port_id: self.port_id.clone(),
            baud_rate: self.baud_rate,
        })
    }

    pub fn complete_connect(&mut self, connect: ConnectResult) -> ConnectOutcome {
        if connect.generation != self.generation || self.state != LinkState::Connecting {
            tracing::debug!(
                "Discarding stale connect result for {} (attempt {}, current {})",
                connect.port_id,
                connect.generation,
                self.generation
            );
            if let Ok(handle) = connect.result {
                handle.close();
            }
            return ConnectOutcome::Discarded;
        }

        match connect.result {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = LinkState::Connected;
                self.last_error = None;
                tracing::info!("{} Active", self.port_id);
                ConnectOutcome::Connected
            }
            Err(e) => {
                self.state = LinkState::Disconnected;
                tracing::warn!("{} Inactive: {}", self.port_id, e);
                self.last_error = Some(e.to_string());
                ConnectOutcome::Failed
            }
        }
    }

    /// Read at most one buffered line. Idle links yield `None` without changing state.
    pub fn poll_line(&mut self) -> Option<Vec<u8>> {
        if self.state != LinkState::Connected {
            return None;
        }
        let handle = self.handle.as_mut()?;

        let polled = match handle.has_data() {
            Ok(true) => handle.read_line().map(Some),
            Ok(false) => Ok(None),
            Err(e) => Err(e),
        };

        match polled {
            Ok(line) => line,
            Err(e) => {
                self.drop_link(e);
                None
            }
        }
    }

    pub fn send(&mut self, command: &Command) -> Result<(), SendError> {
        let handle = match (self.state, self.handle.as_mut()) {
            (LinkState::Connected, Some(handle)) => handle,
            _ => {
                tracing::warn!(
                    "Not sending {} to {}: link is {:?}",
                    command,
                    self.port_id,
                    self.state
                );
                return Err(SendError::NotConnected);
            }
        };

        if let Err(e) = handle.write_bytes(&command.encode()) {
            self.drop_link(e.clone());
            return Err(SendError::Transport(e));
        }

        tracing::info!("Sent {}: {}", command.kind().label(), command.value());
        Ok(())
    }

    /// Switch ports. Any live or in-flight connection is abandoned immediately.
    pub fn select_port(&mut self, port_id: impl Into<String>) {
        let port_id = port_id.into();
        if port_id == self.port_id {
            return;
        }

        tracing::info!("Port changed from {} to {}", self.port_id, port_id);
        self.generation += 1;
        self.release();
        self.port_id = port_id;
        self.last_error = None;
    }

    /// Release the handle for good; in-flight attempts become stale.
    pub fn shutdown(&mut self) {
        self.generation += 1;
        self.release();
    }

    fn drop_link(&mut self, error: TransportError) {
        tracing::warn!("{} Inactive: {}", self.port_id, error);
        self.release();
        self.last_error = Some(error.to_string());
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
        self.state = LinkState::Disconnected;
    }
}
