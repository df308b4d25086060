//! Probe session orchestrator
//!
//! Owns the transport, the session state and the collected samples. A single
//! `select!` loop waits for either the next chunk from the controller or the
//! pacing timer; every line is classified and fully handled before the next
//! one is looked at.
//!
//! While handshaking, events drive the [`Handshake`]. Once the controller is
//! unlocked the survey program is loaded into the [`CommandStreamer`] and
//! every event goes through the [`FaultPolicy`] first.
//!
//! Whatever the outcome, the session ends the same way: the timer is
//! cancelled, the queue is dropped, the transport is closed and the samples
//! are handed to the [`HeightmapSink`] exactly once.

use super::fault_policy::{FaultDecision, FaultPolicy, DEFAULT_MAX_ALARM_RECOVERIES};
use super::pacing::{PacingTimer, ScheduledAction};
use super::state::{SessionPhase, SessionState};
use super::streamer::CommandStreamer;
use crate::communication::{LineSplitter, Transport};
use crate::firmware::grblhal::{classify, format_alarm, ControllerEvent, Handshake};
use std::fmt;
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;
use zprobe_camtools::GridPlanner;
use zprobe_core::{
    Command, CommandIntent, ControllerError, Error, GridConfig, GridCoverage, HeightmapSink,
    PersistenceError, ResultSet, Result, MAX_GRID_POINTS,
};

/// Timing and retry knobs of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Delay between an acknowledgment and the next command
    pub pacing: Duration,
    /// Delay between the end of the handshake and the first command
    pub start_delay: Duration,
    /// Delay between a recoverable alarm and the `$X` that clears it
    pub alarm_settle: Duration,
    /// Back-to-back recoverable alarms tolerated before aborting
    pub max_alarm_recoveries: u32,
    /// Upper bound on the whole handshake
    pub handshake_timeout: Duration,
    /// Upper bound on persisting the results
    pub persist_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(50),
            start_delay: Duration::from_millis(100),
            alarm_settle: Duration::from_millis(500),
            max_alarm_recoveries: DEFAULT_MAX_ALARM_RECOVERIES,
            handshake_timeout: Duration::from_secs(30),
            persist_timeout: Duration::from_secs(5),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every queued command was sent and acknowledged
    Completed,
    /// The controller raised an alarm that cannot be recovered from
    AbortedFatalAlarm {
        /// Alarm code
        code: u16,
    },
    /// The connection failed or the controller never became ready
    AbortedTransportError {
        /// What went wrong
        reason: String,
    },
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::AbortedFatalAlarm { code } => write!(f, "aborted on {}", format_alarm(*code)),
            Self::AbortedTransportError { reason } => {
                write!(f, "aborted on transport error: {}", reason)
            }
        }
    }
}

/// Summary handed back when a session ends
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Identifier used in the session's log span
    pub session_id: Uuid,
    /// How the session ended
    pub outcome: SessionOutcome,
    /// Samples in capture order
    pub results: ResultSet,
    /// Area the survey was planned for
    pub coverage: GridCoverage,
    /// Survey commands released by the streamer
    pub commands_sent: usize,
    /// Set when the results could not be persisted
    pub persistence_error: Option<String>,
}

impl SessionReport {
    /// Completed and persisted
    pub fn is_success(&self) -> bool {
        self.outcome == SessionOutcome::Completed && self.persistence_error.is_none()
    }
}

enum Wake {
    Chunk(Result<Option<Vec<u8>>>),
    Timer(ScheduledAction),
    HandshakeTimeout,
}

/// One probing survey over one connection
pub struct ProbeSession {
    id: Uuid,
    grid: GridConfig,
    options: SessionOptions,
    transport: Box<dyn Transport>,
    splitter: LineSplitter,
    handshake: Handshake,
    streamer: CommandStreamer,
    timer: PacingTimer,
    policy: FaultPolicy,
    state: SessionState,
    results: ResultSet,
}

impl ProbeSession {
    /// Create a session over an already connected transport
    pub fn new(
        grid: GridConfig,
        options: SessionOptions,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        if options.pacing.is_zero() {
            return Err(Error::other("pacing delay must be greater than zero"));
        }
        if !grid.within_point_limit() {
            return Err(Error::other(format!(
                "grid of {} points exceeds the limit of {}",
                grid.requested_points(),
                MAX_GRID_POINTS
            )));
        }
        if !transport.is_connected() {
            return Err(zprobe_core::ConnectionError::NotConnected.into());
        }

        let policy = FaultPolicy::new(grid.missed_probe_sentinel, options.max_alarm_recoveries);
        Ok(Self {
            id: Uuid::new_v4(),
            grid,
            options,
            transport,
            splitter: LineSplitter::new(),
            handshake: Handshake::new(),
            streamer: CommandStreamer::new(),
            timer: PacingTimer::new(),
            policy,
            state: SessionState::default(),
            results: ResultSet::new(),
        })
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run the survey to its end and persist whatever was collected
    pub async fn run(mut self, sink: &dyn HeightmapSink) -> SessionReport {
        let span = tracing::info_span!("session", id = %self.id);
        async move {
            tracing::info!("Starting survey of {}", self.grid.coverage());
            let outcome = self.drive().await;
            self.finish(outcome, sink).await
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self) -> SessionOutcome {
        self.handshake.connected();
        self.sync_handshake_phase();

        let deadline = tokio::time::sleep(self.options.handshake_timeout);
        tokio::pin!(deadline);

        loop {
            let handshaking = !self.handshake.is_complete();
            let wake = tokio::select! {
                chunk = self.transport.read_chunk() => Wake::Chunk(chunk),
                action = self.timer.fired() => Wake::Timer(action),
                _ = &mut deadline, if handshaking => Wake::HandshakeTimeout,
            };

            let flow = match wake {
                Wake::Chunk(chunk) => self.on_chunk(chunk).await,
                Wake::Timer(action) => self.on_timer(action).await,
                Wake::HandshakeTimeout => {
                    tracing::error!(
                        "Handshake stuck in {} after {:?}",
                        self.handshake.state(),
                        self.options.handshake_timeout
                    );
                    ControlFlow::Break(SessionOutcome::AbortedTransportError {
                        reason: "handshake timed out".to_string(),
                    })
                }
            };

            if let ControlFlow::Break(outcome) = flow {
                return outcome;
            }
        }
    }

    async fn on_chunk(&mut self, chunk: Result<Option<Vec<u8>>>) -> ControlFlow<SessionOutcome> {
        match chunk {
            Ok(Some(bytes)) => {
                for line in self.splitter.push(&bytes) {
                    if let ControlFlow::Break(outcome) = self.on_line(&line).await {
                        return ControlFlow::Break(outcome);
                    }
                }
                ControlFlow::Continue(())
            }
            Ok(None) => {
                if let Some(partial) = self.splitter.flush() {
                    tracing::debug!("Discarding partial line '{}'", partial);
                }
                tracing::error!("Connection closed by controller");
                ControlFlow::Break(SessionOutcome::AbortedTransportError {
                    reason: "connection closed by controller".to_string(),
                })
            }
            Err(e) => {
                tracing::error!("Read failed: {}", e);
                ControlFlow::Break(SessionOutcome::AbortedTransportError {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn on_line(&mut self, line: &str) -> ControlFlow<SessionOutcome> {
        tracing::debug!("<< {}", line);
        let event = classify(line);
        match self.state.phase {
            SessionPhase::Handshaking(_) => self.on_handshake_event(&event).await,
            SessionPhase::Streaming => self.on_streaming_event(&event),
            SessionPhase::Disconnected | SessionPhase::Finished => ControlFlow::Continue(()),
        }
    }

    async fn on_handshake_event(&mut self, event: &ControllerEvent) -> ControlFlow<SessionOutcome> {
        let step = self.handshake.on_event(event);
        self.sync_handshake_phase();

        if let Some(command) = step.send {
            if let ControlFlow::Break(outcome) = self.send(&command).await {
                return ControlFlow::Break(outcome);
            }
            if command.intent == CommandIntent::Reset {
                self.handshake.reset_delivered();
                self.sync_handshake_phase();
            }
        }

        if step.ready {
            self.begin_streaming();
        }
        ControlFlow::Continue(())
    }

    fn begin_streaming(&mut self) {
        let planner = GridPlanner::new(self.grid.clone());
        let program = planner.plan();
        tracing::info!(
            "Streaming {} commands for {} probe points",
            program.len(),
            planner.probe_count()
        );

        self.streamer.load(program);
        self.state.phase = SessionPhase::Streaming;
        self.timer
            .schedule(ScheduledAction::Advance, self.options.start_delay);
    }

    fn on_streaming_event(&mut self, event: &ControllerEvent) -> ControlFlow<SessionOutcome> {
        match self.policy.evaluate(event, &self.state) {
            FaultDecision::RecordProbe { sample, zero } => {
                if sample.ok {
                    tracing::info!(
                        "Probe {}: X{:.3} Y{:.3} Z{:.3}",
                        self.results.len() + 1,
                        sample.x,
                        sample.y,
                        sample.z
                    );
                } else {
                    tracing::warn!(
                        "Probe {} missed at X{:.3} Y{:.3}, recording {}",
                        self.results.len() + 1,
                        sample.x,
                        sample.y,
                        sample.z
                    );
                }
                self.results.push(sample);
                if let Some(zero) = zero {
                    self.streamer.prioritize(zero);
                }
            }
            FaultDecision::Advance => {
                if self.streamer.acknowledge().is_some() {
                    self.state.consecutive_recoveries = 0;
                    self.timer
                        .schedule(ScheduledAction::Advance, self.options.pacing);
                } else {
                    tracing::debug!("Acknowledgment with nothing outstanding");
                }
            }
            FaultDecision::Hold => {
                self.streamer.acknowledge();
                tracing::debug!("Alarm active, holding the queue");
            }
            FaultDecision::RecoverAlarm { code } => {
                tracing::warn!(
                    "{}, unlocking in {:?}",
                    format_alarm(code),
                    self.options.alarm_settle
                );
                self.state.alarm_active = true;
                self.state.unlock_sent = false;
                self.state.consecutive_recoveries += 1;
                self.timer
                    .schedule(ScheduledAction::Unlock, self.options.alarm_settle);
            }
            FaultDecision::ClearAlarm => {
                tracing::info!("Alarm cleared, resuming");
                self.state.alarm_active = false;
                self.state.unlock_sent = false;
                self.streamer.acknowledge();
                self.timer
                    .schedule(ScheduledAction::Advance, self.options.pacing);
            }
            FaultDecision::Abort { code, reason } => {
                let alarm = ControllerError::Alarm {
                    code,
                    message: reason,
                };
                tracing::error!("{}, aborting survey", alarm);
                return ControlFlow::Break(SessionOutcome::AbortedFatalAlarm { code });
            }
            FaultDecision::Ignore => {
                if event.is_unlock_notice() {
                    tracing::debug!("Controller reports unlocked");
                }
            }
        }
        ControlFlow::Continue(())
    }

    async fn on_timer(&mut self, action: ScheduledAction) -> ControlFlow<SessionOutcome> {
        match action {
            ScheduledAction::Advance => match self.streamer.advance() {
                Ok(Some(command)) => {
                    self.send(&command).await
                }
                Ok(None) => {
                    tracing::info!("All commands acknowledged");
                    ControlFlow::Break(SessionOutcome::Completed)
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    ControlFlow::Continue(())
                }
            },
            ScheduledAction::Unlock => {
                if !self.state.alarm_active {
                    return ControlFlow::Continue(());
                }
                self.state.unlock_sent = true;
                self.send(&Command::unlock()).await
            }
        }
    }

    async fn send(&mut self, command: &Command) -> ControlFlow<SessionOutcome> {
        tracing::debug!(">> {}", command);
        match self.transport.write(&command.to_wire_bytes()).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                tracing::error!("Failed to send '{}': {}", command, e);
                ControlFlow::Break(SessionOutcome::AbortedTransportError {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn sync_handshake_phase(&mut self) {
        if !self.handshake.is_complete() {
            self.state.phase = SessionPhase::Handshaking(self.handshake.state());
        }
    }

    async fn finish(&mut self, outcome: SessionOutcome, sink: &dyn HeightmapSink) -> SessionReport {
        if let Some(action) = self.timer.cancel() {
            tracing::debug!("Cancelled pending {:?}", action);
        }
        self.streamer.clear();
        if let Err(e) = self.transport.close().await {
            tracing::warn!("Error closing connection: {}", e);
        }
        self.state.phase = SessionPhase::Finished;

        match &outcome {
            SessionOutcome::Completed => tracing::info!(
                "Survey completed with {} samples ({} missed)",
                self.results.len(),
                self.results.missed_count()
            ),
            other => tracing::error!(
                "Survey {} with {} samples collected",
                other,
                self.results.len()
            ),
        }

        let coverage = self.grid.coverage();
        let persisted = tokio::time::timeout(
            self.options.persist_timeout,
            sink.persist(&self.results, &coverage),
        )
        .await
        .unwrap_or_else(|_| {
            Err(PersistenceError::Timeout {
                timeout_ms: self.options.persist_timeout.as_millis() as u64,
            }
            .into())
        });

        let persistence_error = match persisted {
            Ok(()) => None,
            Err(e) => {
                tracing::error!("Failed to persist heightmap: {}", e);
                Some(e.to_string())
            }
        };

        SessionReport {
            session_id: self.id,
            outcome,
            results: std::mem::take(&mut self.results),
            coverage,
            commands_sent: self.streamer.sent_count(),
            persistence_error,
        }
    }
}

impl fmt::Debug for ProbeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("samples", &self.results.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SessionOptions::default();
        assert_eq!(options.pacing, Duration::from_millis(50));
        assert_eq!(options.start_delay, Duration::from_millis(100));
        assert_eq!(options.max_alarm_recoveries, 3);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(SessionOutcome::Completed.to_string(), "completed");
        assert!(SessionOutcome::AbortedFatalAlarm { code: 12 }
            .to_string()
            .starts_with("aborted on ALARM:12"));
    }
}
