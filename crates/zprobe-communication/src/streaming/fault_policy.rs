//! Fault policy for the streaming phase
//!
//! Inspects each classified event before the streamer is touched and decides
//! whether the survey continues, pauses for an alarm recovery, or stops.
//!
//! | Event                          | Decision                               |
//! |--------------------------------|----------------------------------------|
//! | probe report, triggered        | record measured z, zero Z next         |
//! | probe report, not triggered    | record sentinel z                      |
//! | recoverable alarm              | unlock after settling (bounded)        |
//! | fatal or unknown alarm         | abort                                  |
//! | ok / error, no alarm           | advance                                |
//! | ok / error, alarm, no `$X` yet | hold                                   |
//! | ok, alarm, `$X` sent           | clear alarm and advance                |

use super::state::SessionState;
use crate::firmware::grblhal::{
    alarm_severity, decode_alarm, format_error, AlarmSeverity, ControllerEvent,
};
use zprobe_core::{Command, ControllerError, ProbeSample};

/// Default number of back-to-back alarm recoveries before giving up
pub const DEFAULT_MAX_ALARM_RECOVERIES: u32 = 3;

/// What the orchestrator should do with an event
#[derive(Debug, Clone, PartialEq)]
pub enum FaultDecision {
    /// Append `sample`; push `zero` to the front of the queue if present
    RecordProbe {
        /// Sample to append
        sample: ProbeSample,
        /// Command that rezeroes the measured axis
        zero: Option<Command>,
    },
    /// The outstanding command finished; release the next one after pacing
    Advance,
    /// The outstanding command finished, but an alarm is being handled
    Hold,
    /// Set the alarm flag and schedule `$X`
    RecoverAlarm {
        /// Alarm code
        code: u16,
    },
    /// The recovery `$X` was acknowledged; clear the alarm and advance
    ClearAlarm,
    /// End the session
    Abort {
        /// Alarm code that caused the abort
        code: u16,
        /// Human-readable reason
        reason: String,
    },
    /// Nothing to do
    Ignore,
}

/// Stateless decision table for streaming events
#[derive(Debug, Clone)]
pub struct FaultPolicy {
    sentinel: f64,
    max_recoveries: u32,
}

impl FaultPolicy {
    /// Create a policy recording missed probes at `sentinel`
    pub fn new(sentinel: f64, max_recoveries: u32) -> Self {
        Self {
            sentinel,
            max_recoveries,
        }
    }

    /// Decide how to react to `event` given the current session state
    pub fn evaluate(&self, event: &ControllerEvent, state: &SessionState) -> FaultDecision {
        match event {
            ControllerEvent::ProbeReport {
                x,
                y,
                z,
                triggered: true,
            } => FaultDecision::RecordProbe {
                sample: ProbeSample::measured(*x, *y, *z),
                zero: Some(Command::zero_axis('Z')),
            },
            ControllerEvent::ProbeReport {
                x,
                y,
                triggered: false,
                ..
            } => FaultDecision::RecordProbe {
                sample: ProbeSample::missed(*x, *y, self.sentinel),
                zero: None,
            },
            ControllerEvent::AlarmReport { code } => self.on_alarm(*code, state),
            ControllerEvent::Acknowledged => {
                if !state.alarm_active {
                    FaultDecision::Advance
                } else if state.unlock_sent {
                    FaultDecision::ClearAlarm
                } else {
                    FaultDecision::Hold
                }
            }
            ControllerEvent::RejectedCommand { code } => {
                let rejected = ControllerError::CommandRejected {
                    reason: code.map_or_else(|| "no error code".to_string(), format_error),
                };
                tracing::warn!("{}", rejected);
                if state.alarm_active {
                    FaultDecision::Hold
                } else {
                    FaultDecision::Advance
                }
            }
            ControllerEvent::Banner(text) => {
                tracing::warn!("Controller re-announced itself mid-survey: {}", text);
                FaultDecision::Ignore
            }
            ControllerEvent::StatusMessage(_) | ControllerEvent::Unrecognized(_) => {
                FaultDecision::Ignore
            }
        }
    }

    fn on_alarm(&self, code: u16, state: &SessionState) -> FaultDecision {
        match alarm_severity(code) {
            AlarmSeverity::Fatal => FaultDecision::Abort {
                code,
                reason: decode_alarm(code),
            },
            AlarmSeverity::Recoverable if state.consecutive_recoveries >= self.max_recoveries => {
                FaultDecision::Abort {
                    code,
                    reason: format!(
                        "{} (gave up after {} unlock attempts)",
                        decode_alarm(code),
                        state.consecutive_recoveries
                    ),
                }
            }
            AlarmSeverity::Recoverable => FaultDecision::RecoverAlarm { code },
        }
    }
}
