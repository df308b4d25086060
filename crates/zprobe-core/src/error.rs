//! Error handling for zprobe
//!
//! Provides error types for every layer of a probing session:
//! - Controller errors (alarms, rejected commands, flow control violations)
//! - Connection errors (transport to the controller)
//! - Persistence errors (writing the finished heightmap)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Controller error type
///
/// Represents errors reported by, or caused by misuse of, the CNC controller
/// protocol.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// Command was rejected by controller
    #[error("Command rejected: {reason}")]
    CommandRejected {
        /// The reason the command was rejected.
        reason: String,
    },

    /// A command was released while another was still awaiting acknowledgment
    #[error("Flow control violation: {message}")]
    FlowControl {
        /// A message describing the violation.
        message: String,
    },

    /// Alarm condition detected
    #[error("Alarm: {code} - {message}")]
    Alarm {
        /// The alarm code.
        code: u16,
        /// The alarm message.
        message: String,
    },
}

/// Connection error type
///
/// Represents errors on the byte stream between this host and the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Failed to open the connection
    #[error("Failed to connect to {address}: {reason}")]
    FailedToOpen {
        /// The address that could not be reached.
        address: String,
        /// The reason the connection failed.
        reason: String,
    },

    /// Connection timeout
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Connection lost
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// TCP connection error
    #[error("TCP connection error: {reason}")]
    TcpError {
        /// The reason for the TCP error.
        reason: String,
    },
}

/// Persistence error type
///
/// Represents failures of the heightmap writer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// The output could not be written
    #[error("Failed to write {path}: {reason}")]
    WriteFailed {
        /// The destination path.
        path: String,
        /// The reason the write failed.
        reason: String,
    },

    /// The writer did not finish in time
    #[error("Persistence timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },
}

/// Main error type for zprobe
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Persistence error
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ControllerError::Alarm {
            code: 12,
            message: "E-stop".to_string(),
        };
        assert_eq!(err.to_string(), "Alarm: 12 - E-stop");

        let err = ControllerError::Alarm {
            code: 300,
            message: "Unknown alarm code: 300".to_string(),
        };
        assert_eq!(err.to_string(), "Alarm: 300 - Unknown alarm code: 300");

        let err = ConnectionError::FailedToOpen {
            address: "192.168.5.1:23".to_string(),
            reason: "refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to connect to 192.168.5.1:23: refused"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ConnectionError::ConnectionTimeout { timeout_ms: 500 }.into();
        assert!(matches!(err, Error::Connection(_)));
        assert_eq!(err.to_string(), "Connection timeout after 500ms");

        let err: Error = PersistenceError::Timeout { timeout_ms: 10 }.into();
        assert!(matches!(err, Error::Persistence(_)));

        let err: Error = ControllerError::FlowControl {
            message: "busy".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Controller(_)));
        assert_eq!(err.to_string(), "Flow control violation: busy");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "I/O error: pipe");
    }
}
