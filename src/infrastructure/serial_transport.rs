// Serial port transport backed by the `serialport` crate
use crate::application::transport::{SerialHandle, Transport, TransportError};
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

/// Bytes kept without seeing a newline before they are flushed as one line
const MAX_PENDING_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct SerialPortTransport {
    read_timeout: Duration,
}

impl SerialPortTransport {
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

#[async_trait]
impl Transport for SerialPortTransport {
    async fn open(&self, port_id: &str, baud_rate: u32) -> Result<Box<dyn SerialHandle>, TransportError> {
        let port_name = port_id.to_string();
        let timeout = self.read_timeout;

        // Opening can stall on some drivers; keep it off the async workers
        let opened = tokio::task::spawn_blocking(move || {
            serialport::new(&port_name, baud_rate).timeout(timeout).open()
        })
        .await
        .map_err(|e| TransportError::Open {
            port: port_id.to_string(),
            reason: e.to_string(),
        })?;

        let port = opened.map_err(|e| TransportError::Open {
            port: port_id.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Opened {} at {} baud", port_id, baud_rate);
        Ok(Box::new(SerialPortHandle::new(port_id.to_string(), port)))
    }

    async fn list_ports(&self) -> Result<Vec<String>, TransportError> {
        // Enumeration walks sysfs or the registry and can take a while
        let ports = tokio::task::spawn_blocking(serialport::available_ports)
            .await
            .map_err(|e| TransportError::Enumeration(e.to_string()))?
            .map_err(|e| TransportError::Enumeration(e.to_string()))?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}

/// Newline framing over whatever bytes have arrived so far
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Read up to `available` bytes from `source`, but only while no line is
    /// waiting and never past `MAX_PENDING_BYTES`. `None` means nothing was read.
    fn fill_from<R: Read + ?Sized>(&mut self, source: &mut R, available: usize) -> io::Result<Option<usize>> {
        if self.has_line() {
            return Ok(None);
        }
        let room = MAX_PENDING_BYTES - self.bytes.len();
        let wanted = available.min(room);
        if wanted == 0 {
            return Ok(None);
        }

        let mut chunk = vec![0u8; wanted];
        let n = source.read(&mut chunk)?;
        self.extend(&chunk[..n]);
        Ok(Some(n))
    }

    /// A line is ready once a newline arrives, or the buffer overflows without one
    fn has_line(&self) -> bool {
        self.bytes.contains(&b'\n') || self.bytes.len() >= MAX_PENDING_BYTES
    }

    fn take_line(&mut self) -> Vec<u8> {
        let end = match self.bytes.iter().position(|b| *b == b'\n') {
            Some(i) => i + 1,
            None => self.bytes.len().min(MAX_PENDING_BYTES),
        };
        self.bytes.drain(..end).collect()
    }
}

/// Reads only what the OS has already buffered, so polling never blocks.
pub struct SerialPortHandle {
    port_id: String,
    port: Box<dyn SerialPort>,
    pending: LineBuffer,
}

impl SerialPortHandle {
    fn new(port_id: String, port: Box<dyn SerialPort>) -> Self {
        Self {
            port_id,
            port,
            pending: LineBuffer::default(),
        }
    }

    fn disconnected(&self, reason: impl std::fmt::Display) -> TransportError {
        TransportError::Disconnected(format!("{}: {}", self.port_id, reason))
    }

    /// Leaves bytes in the OS buffer while a complete line is still waiting,
    /// so a device that outpaces the tick rate cannot grow `pending`.
    fn fill_pending(&mut self) -> Result<(), TransportError> {
        if self.pending.has_line() {
            return Ok(());
        }

        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| self.disconnected(e))? as usize;

        match self.pending.fill_from(&mut self.port, available) {
            Ok(Some(0)) => Err(self.disconnected("port closed")),
            Ok(_) => Ok(()),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(())
            }
            Err(e) => Err(self.disconnected(e)),
        }
    }
}

impl SerialHandle for SerialPortHandle {
    fn has_data(&mut self) -> Result<bool, TransportError> {
        self.fill_pending()?;
        Ok(self.pending.has_line())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        Ok(self.pending.take_line())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port
            .write_all(bytes)
            .and_then(|_| self.port.flush())
            .map_err(|e| self.disconnected(e))
    }

    fn close(self: Box<Self>) {
        tracing::debug!("Closing {}", self.port_id);
    }
}
