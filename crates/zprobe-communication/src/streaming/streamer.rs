//! Command streamer with one-in-flight flow control
//!
//! grblHAL's serial/telnet input buffer is small. The streamer releases one
//! command at a time and refuses to release another until the previous one
//! has been acknowledged. Pacing between releases is the caller's job (see
//! [`super::pacing::PacingTimer`]); the streamer never sleeps.

use std::collections::VecDeque;
use zprobe_core::{Command, ControllerError};

/// Outbound command queue
#[derive(Debug, Default)]
pub struct CommandStreamer {
    /// Commands not yet released
    queue: VecDeque<Command>,
    /// Released command awaiting acknowledgment
    outstanding: Option<Command>,
    /// Number of commands released so far
    sent_count: usize,
}

impl CommandStreamer {
    /// Create an empty streamer
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue with `commands`
    pub fn load(&mut self, commands: Vec<Command>) {
        self.queue = commands.into();
        self.outstanding = None;
        self.sent_count = 0;
    }

    /// Release the next command.
    ///
    /// Returns `Ok(None)` when the queue is exhausted, which completes the
    /// session.
    pub fn advance(&mut self) -> Result<Option<Command>, ControllerError> {
        if let Some(pending) = &self.outstanding {
            return Err(ControllerError::FlowControl {
                message: format!("'{}' has not been acknowledged yet", pending),
            });
        }

        let Some(command) = self.queue.pop_front() else {
            return Ok(None);
        };

        self.outstanding = Some(command.clone());
        self.sent_count += 1;
        Ok(Some(command))
    }

    /// The outstanding command was answered. Returns it, if there was one.
    pub fn acknowledge(&mut self) -> Option<Command> {
        self.outstanding.take()
    }

    /// Put `command` at the front of the queue so it goes out next
    pub fn prioritize(&mut self, command: Command) {
        tracing::debug!("Prioritizing '{}'", command);
        self.queue.push_front(command);
    }

    /// Drop everything not yet released
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Number of commands released so far
    pub fn sent_count(&self) -> usize {
        self.sent_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zprobe_core::CommandIntent;

    fn travel(text: &str) -> Command {
        Command::new(CommandIntent::Travel, text)
    }

    #[test]
    fn test_one_in_flight() {
        let mut streamer = CommandStreamer::new();
        streamer.load(vec![travel("G0 Z5"), travel("G0 X1")]);

        assert_eq!(streamer.advance().unwrap(), Some(travel("G0 Z5")));
        assert!(matches!(
            streamer.advance(),
            Err(ControllerError::FlowControl { .. })
        ));

        assert_eq!(streamer.acknowledge(), Some(travel("G0 Z5")));
        assert_eq!(streamer.advance().unwrap(), Some(travel("G0 X1")));
        streamer.acknowledge();
        assert_eq!(streamer.advance().unwrap(), None);
        assert_eq!(streamer.sent_count(), 2);
    }

    #[test]
    fn test_prioritize_goes_next() {
        let mut streamer = CommandStreamer::new();
        streamer.load(vec![travel("G0 Z15"), travel("G0 X10")]);

        streamer.prioritize(Command::zero_axis('Z'));
        assert_eq!(streamer.advance().unwrap(), Some(Command::zero_axis('Z')));
        streamer.acknowledge();
        assert_eq!(streamer.advance().unwrap(), Some(travel("G0 Z15")));
    }

    #[test]
    fn test_clear_keeps_outstanding() {
        let mut streamer = CommandStreamer::new();
        streamer.load(vec![travel("G0 Z15"), travel("G0 X10")]);
        streamer.advance().unwrap();
        streamer.clear();

        assert!(matches!(
            streamer.advance(),
            Err(ControllerError::FlowControl { .. })
        ));
        assert_eq!(streamer.acknowledge(), Some(travel("G0 Z15")));
        assert_eq!(streamer.advance().unwrap(), None);
    }
}
