//! Transport layer for the arm controller link
//!
//! A [`Transport`] opens a link and hands back independent reader and writer
//! halves so the receive loop never contends with the send path.
//!
//! Supports:
//! - Serial/USB ports (the default)
//! - TCP for serial-over-network bridges
//! - An in-memory loopback for tests and demos

pub mod connection;
pub mod loopback;
pub mod serial;
pub mod tcp;

pub use connection::{ConnectionManager, LinkListener};
pub use loopback::{LoopbackDevice, LoopbackTransport};
pub use serial::{list_ports, SerialPortInfo, SerialTransport};
pub use tcp::TcpTransport;

use armctl_core::ConnectionError;
use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

/// Default serial baud rate of the arm firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default receive timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default bound on opening a network link
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Kind of link to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionDriver {
    /// Serial/USB port
    #[default]
    Serial,
    /// TCP socket (`host:port`)
    Tcp,
}

impl fmt::Display for ConnectionDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

/// Parameters for opening a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Link kind
    pub driver: ConnectionDriver,
    /// Port name (serial) or `host:port` (TCP)
    pub port: String,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Bound on each blocking read of the receive loop
    pub read_timeout: Duration,
    /// Bound on opening the link
    pub connect_timeout: Duration,
    /// Send `STATUS` from the receive loop at this interval
    pub status_poll_interval: Option<Duration>,
}

impl ConnectionParams {
    /// Serial link parameters with firmware defaults
    pub fn serial(port: impl Into<String>) -> Self {
        Self {
            driver: ConnectionDriver::Serial,
            port: port.into(),
            ..Self::default()
        }
    }

    /// TCP link parameters for `host:port`
    pub fn tcp(address: impl Into<String>) -> Self {
        Self {
            driver: ConnectionDriver::Tcp,
            port: address.into(),
            ..Self::default()
        }
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Enable periodic status polling
    pub fn with_status_poll(mut self, interval: Duration) -> Self {
        self.status_poll_interval = Some(interval);
        self
    }

    /// Check the parameters before opening anything
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.port.trim().is_empty() {
            return Err(ConnectionError::InvalidParameters {
                reason: "no port given".to_string(),
            });
        }
        if self.read_timeout.is_zero() {
            return Err(ConnectionError::InvalidParameters {
                reason: "read timeout must be > 0".to_string(),
            });
        }
        if self.driver == ConnectionDriver::Serial && self.baud_rate == 0 {
            return Err(ConnectionError::InvalidParameters {
                reason: "baud rate must be > 0".to_string(),
            });
        }
        if self.status_poll_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConnectionError::InvalidParameters {
                reason: "status poll interval must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            driver: ConnectionDriver::Serial,
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            status_poll_interval: None,
        }
    }
}

/// Receive half of an open link
///
/// Reads must return within the configured read timeout, reporting
/// `TimedOut`/`WouldBlock` when no data arrived. `Ok(0)` means the peer
/// closed the link.
pub type LinkReader = Box<dyn Read + Send>;

/// Send half of an open link
pub type LinkWriter = Box<dyn Write + Send>;

/// An opened link split into its halves
pub struct LinkHalves {
    /// Receive half, owned by the receive loop
    pub reader: LinkReader,
    /// Send half, behind the write-serialisation lock
    pub writer: LinkWriter,
}

/// Something that can open a link to the arm controller
pub trait Transport: Send + Sync {
    /// Open the link described by `params`
    fn open(&self, params: &ConnectionParams) -> Result<LinkHalves, ConnectionError>;
}

/// Opens serial or TCP links according to [`ConnectionParams::driver`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTransport;

impl Transport for DefaultTransport {
    fn open(&self, params: &ConnectionParams) -> Result<LinkHalves, ConnectionError> {
        match params.driver {
            ConnectionDriver::Serial => SerialTransport.open(params),
            ConnectionDriver::Tcp => TcpTransport.open(params),
        }
    }
}

/// Map an I/O error to a connect failure for `port`
pub(crate) fn connect_failed(port: &str, err: impl fmt::Display) -> ConnectionError {
    ConnectionError::ConnectFailed {
        port: port.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_defaults() {
        let params = ConnectionParams::serial("/dev/ttyACM0");
        assert_eq!(params.baud_rate, 115_200);
        assert_eq!(params.read_timeout, Duration::from_secs(1));
        assert!(params.status_poll_interval.is_none());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_port() {
        assert!(ConnectionParams::serial(" ").validate().is_err());
        let params = ConnectionParams::tcp("localhost:2000").with_read_timeout(Duration::ZERO);
        assert!(params.validate().is_err());
    }
}
