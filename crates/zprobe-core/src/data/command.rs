//! Tagged controller commands

use serde::{Deserialize, Serialize};
use std::fmt;

/// Realtime soft-reset byte (Ctrl-X)
pub const SOFT_RESET: u8 = 0x18;

/// What a command is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandIntent {
    /// Modal setup (units, distance mode)
    Setup,
    /// Straight rapid move
    Travel,
    /// Probe move towards the surface
    Probe,
    /// Arc move lifting the tool from one grid point to the next
    ArcHop,
    /// Arc plane selection (G17/G18/G19)
    PlaneSelect,
    /// Timed pause
    Dwell,
    /// Coordinate offset (G92)
    ZeroOffset,
    /// Alarm unlock ($X)
    Unlock,
    /// Realtime soft reset
    Reset,
}

impl fmt::Display for CommandIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Travel => "travel",
            Self::Probe => "probe",
            Self::ArcHop => "arc-hop",
            Self::PlaneSelect => "plane-select",
            Self::Dwell => "dwell",
            Self::ZeroOffset => "zero-offset",
            Self::Unlock => "unlock",
            Self::Reset => "reset",
        };
        write!(f, "{}", name)
    }
}

/// One line of controller protocol text and its intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Protocol text, without line terminator
    pub text: String,
    /// What the command does
    pub intent: CommandIntent,
}

impl Command {
    /// Create a new command
    pub fn new(intent: CommandIntent, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent,
        }
    }

    /// Realtime soft reset
    pub fn reset() -> Self {
        Self::new(CommandIntent::Reset, char::from(SOFT_RESET).to_string())
    }

    /// Alarm unlock
    pub fn unlock() -> Self {
        Self::new(CommandIntent::Unlock, "$X")
    }

    /// Make the current position the zero of `axis`
    pub fn zero_axis(axis: char) -> Self {
        Self::new(
            CommandIntent::ZeroOffset,
            format!("G92 {}0", axis.to_ascii_uppercase()),
        )
    }

    /// Whether this is a probe move
    pub fn is_probe(&self) -> bool {
        self.intent == CommandIntent::Probe
    }

    /// Bytes to put on the wire.
    ///
    /// Realtime commands go out as-is; everything else is newline terminated.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        match self.intent {
            CommandIntent::Reset => vec![SOFT_RESET],
            _ => {
                let mut bytes = Vec::with_capacity(self.text.len() + 1);
                bytes.extend_from_slice(self.text.as_bytes());
                bytes.push(b'\n');
                bytes
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.intent {
            CommandIntent::Reset => write!(f, "<soft reset 0x{:02X}>", SOFT_RESET),
            _ => write!(f, "{}", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_bytes() {
        assert_eq!(Command::reset().to_wire_bytes(), vec![0x18]);
        assert_eq!(Command::unlock().to_wire_bytes(), b"$X\n".to_vec());
    }

    #[test]
    fn test_zero_axis() {
        let cmd = Command::zero_axis('z');
        assert_eq!(cmd.text, "G92 Z0");
        assert_eq!(cmd.intent, CommandIntent::ZeroOffset);
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::reset().to_string(), "<soft reset 0x18>");
        assert_eq!(CommandIntent::ArcHop.to_string(), "arc-hop");
    }
}
