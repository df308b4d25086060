//! Byte-stream transport to the controller
//!
//! The session only needs three things from a connection: write bytes, read
//! whatever bytes arrived next, and close. Reads are not line aligned; use
//! [`LineSplitter`] to turn chunks into protocol lines.

pub mod lines;
pub mod tcp;

pub use lines::LineSplitter;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zprobe_core::Result;

/// Default telnet port of networked grblHAL boards
pub const DEFAULT_PORT: u16 = 23;

/// Bidirectional byte stream to a controller
#[async_trait]
pub trait Transport: Send {
    /// Write all of `data`
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read the next chunk of bytes.
    ///
    /// Returns `Ok(None)` once the peer closed the connection. Must be
    /// cancel safe: dropping the future before it completes loses no data.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Close the connection. Closing twice is not an error.
    async fn close(&mut self) -> Result<()>;

    /// Whether the connection is open
    fn is_connected(&self) -> bool;
}

/// Where and how to connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Hostname or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "192.168.5.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 5000,
        }
    }
}

impl ConnectionParams {
    /// `host:port`, with IPv6 literals bracketed
    pub fn connect_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
