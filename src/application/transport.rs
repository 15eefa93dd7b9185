// Transport trait for serial device access
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to open {port}: {reason}")]
    Open { port: String, reason: String },
    #[error("device disconnected: {0}")]
    Disconnected(String),
    #[error("port enumeration failed: {0}")]
    Enumeration(String),
}

/// An open link to the device. Owned exclusively by the link session.
pub trait SerialHandle: Send {
    /// True when at least one complete line is buffered. Must not block.
    fn has_data(&mut self) -> Result<bool, TransportError>;

    /// Read one line, terminator included if present
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError>;

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    fn close(self: Box<Self>) {}
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a port. Implementations may block internally but must not block the caller's executor.
    async fn open(&self, port_id: &str, baud_rate: u32) -> Result<Box<dyn SerialHandle>, TransportError>;

    /// List the port identifiers currently visible on this host
    async fn list_ports(&self) -> Result<Vec<String>, TransportError>;
}
