//! Power-on handshake
//!
//! A networked grblHAL board may be in any state when we connect: idle,
//! alarmed after an E-stop, or halfway through a reboot. The handshake forces
//! it into a known state before any motion is streamed:
//!
//! 1. wait for the startup banner,
//! 2. soft reset (0x18) and wait for the banner the reboot prints,
//! 3. unlock with `$X` and wait for its acknowledgment.
//!
//! Events that do not match the current state are ignored. Noise between
//! steps is normal, and a handshake that never finishes is bounded by the
//! caller's timeout rather than by a failure state here.

use super::response_parser::ControllerEvent;
use std::fmt;
use zprobe_core::Command;

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No connection yet
    Disconnected,
    /// Connected, waiting for the first banner
    AwaitFirstBanner,
    /// Soft reset emitted, not yet written out
    ResetSent,
    /// Soft reset delivered, waiting for the reboot banner
    AwaitSecondBanner,
    /// `$X` emitted, waiting for its acknowledgment
    UnlockSent,
    /// Controller unlocked; the survey may stream
    Streaming,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::AwaitFirstBanner => "AwaitFirstBanner",
            Self::ResetSent => "ResetSent",
            Self::AwaitSecondBanner => "AwaitSecondBanner",
            Self::UnlockSent => "UnlockSent",
            Self::Streaming => "Streaming",
        };
        write!(f, "{}", name)
    }
}

/// Result of feeding one event to the handshake
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandshakeStep {
    /// Command to transmit now
    pub send: Option<Command>,
    /// True on the step that reached [`HandshakeState::Streaming`]
    pub ready: bool,
}

/// Handshake state machine
#[derive(Debug)]
pub struct Handshake {
    state: HandshakeState,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    /// Create a handshake in the disconnected state
    pub fn new() -> Self {
        Self {
            state: HandshakeState::Disconnected,
        }
    }

    /// Current state
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Whether the controller is ready to stream
    pub fn is_complete(&self) -> bool {
        self.state == HandshakeState::Streaming
    }

    /// The transport is up
    pub fn connected(&mut self) {
        if self.state == HandshakeState::Disconnected {
            self.transition(HandshakeState::AwaitFirstBanner);
        }
    }

    /// The soft reset byte has been written to the transport
    pub fn reset_delivered(&mut self) {
        if self.state == HandshakeState::ResetSent {
            self.transition(HandshakeState::AwaitSecondBanner);
        }
    }

    /// Feed one classified event
    pub fn on_event(&mut self, event: &ControllerEvent) -> HandshakeStep {
        match (self.state, event) {
            (HandshakeState::AwaitFirstBanner, ControllerEvent::Banner(_)) => {
                tracing::info!("Controller banner received, sending soft reset");
                self.transition(HandshakeState::ResetSent);
                HandshakeStep {
                    send: Some(Command::reset()),
                    ready: false,
                }
            }
            (
                HandshakeState::ResetSent | HandshakeState::AwaitSecondBanner,
                ControllerEvent::Banner(_),
            ) => {
                if self.state == HandshakeState::ResetSent {
                    self.transition(HandshakeState::AwaitSecondBanner);
                }
                tracing::info!("Controller rebooted, sending unlock");
                self.transition(HandshakeState::UnlockSent);
                HandshakeStep {
                    send: Some(Command::unlock()),
                    ready: false,
                }
            }
            (HandshakeState::UnlockSent, ControllerEvent::Acknowledged) => self.unlocked(),
            (HandshakeState::UnlockSent, ev) if ev.is_unlock_notice() => self.unlocked(),
            (state, ev) => {
                tracing::trace!("Handshake in {} ignoring {}", state, ev);
                HandshakeStep::default()
            }
        }
    }

    fn unlocked(&mut self) -> HandshakeStep {
        tracing::info!("Controller unlocked");
        self.transition(HandshakeState::Streaming);
        HandshakeStep {
            send: None,
            ready: true,
        }
    }

    fn transition(&mut self, next: HandshakeState) {
        tracing::debug!("Handshake {} -> {}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zprobe_core::CommandIntent;

    fn banner() -> ControllerEvent {
        ControllerEvent::Banner("GrblHAL 1.1f ['$' or '$HELP' for help]".to_string())
    }

    #[test]
    fn test_banner_banner_ok() {
        let mut hs = Handshake::new();
        hs.connected();
        assert_eq!(hs.state(), HandshakeState::AwaitFirstBanner);

        let mut sent = Vec::new();
        for event in [banner(), banner(), ControllerEvent::Acknowledged] {
            let step = hs.on_event(&event);
            sent.extend(step.send);
        }

        assert!(hs.is_complete());
        let intents: Vec<CommandIntent> = sent.iter().map(|c| c.intent).collect();
        assert_eq!(intents, vec![CommandIntent::Reset, CommandIntent::Unlock]);
    }

    #[test]
    fn test_reset_delivery_step() {
        let mut hs = Handshake::new();
        hs.connected();
        hs.on_event(&banner());
        assert_eq!(hs.state(), HandshakeState::ResetSent);
        hs.reset_delivered();
        assert_eq!(hs.state(), HandshakeState::AwaitSecondBanner);

        let step = hs.on_event(&banner());
        assert_eq!(step.send, Some(Command::unlock()));
        assert_eq!(hs.state(), HandshakeState::UnlockSent);
    }

    #[test]
    fn test_noise_is_ignored() {
        let mut hs = Handshake::new();
        hs.connected();

        let noise = [
            ControllerEvent::Acknowledged,
            ControllerEvent::AlarmReport { code: 11 },
            ControllerEvent::StatusMessage("[MSG:'$H'|'$X' to unlock]".to_string()),
            ControllerEvent::Unrecognized("garbage".to_string()),
        ];
        for event in &noise {
            assert_eq!(hs.on_event(event), HandshakeStep::default());
        }
        assert_eq!(hs.state(), HandshakeState::AwaitFirstBanner);
    }

    #[test]
    fn test_unlock_notice_completes() {
        let mut hs = Handshake::new();
        hs.connected();
        hs.on_event(&banner());
        hs.on_event(&banner());

        let step = hs.on_event(&ControllerEvent::StatusMessage(
            "[MSG:Caution: Unlocked]".to_string(),
        ));
        assert!(step.ready);
        assert!(hs.is_complete());
    }

    #[test]
    fn test_events_before_connect_are_ignored() {
        let mut hs = Handshake::new();
        assert_eq!(hs.on_event(&banner()), HandshakeStep::default());
        assert_eq!(hs.state(), HandshakeState::Disconnected);
    }
}
