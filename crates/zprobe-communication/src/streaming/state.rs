//! Session state
//!
//! Owned and mutated only by the session orchestrator. Other components get
//! a shared reference and return decisions instead of changing it.

use crate::firmware::grblhal::HandshakeState;
use std::fmt;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Transport not yet up
    Disconnected,
    /// Bringing the controller to a known, unlocked state
    Handshaking(HandshakeState),
    /// Survey commands are being streamed
    Streaming,
    /// Session ended, results handed off
    Finished,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Handshaking(state) => write!(f, "Handshaking({})", state),
            Self::Streaming => write!(f, "Streaming"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// Phase plus the flags that gate streaming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,
    /// A recoverable alarm is being handled; acknowledgments do not advance
    pub alarm_active: bool,
    /// The recovery `$X` has been written
    pub unlock_sent: bool,
    /// Recoverable alarms since the last normal acknowledgment
    pub consecutive_recoveries: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            alarm_active: false,
            unlock_sent: false,
            consecutive_recoveries: 0,
        }
    }
}
