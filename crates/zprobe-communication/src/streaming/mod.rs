//! Survey streaming
//!
//! One-in-flight command queue, pacing timer, fault policy and the session
//! orchestrator that ties them to a transport.

pub mod fault_policy;
pub mod pacing;
pub mod session;
pub mod state;
pub mod streamer;

pub use fault_policy::{FaultDecision, FaultPolicy, DEFAULT_MAX_ALARM_RECOVERIES};
pub use pacing::{PacingTimer, ScheduledAction};
pub use session::{ProbeSession, SessionOptions, SessionOutcome, SessionReport};
pub use state::{SessionPhase, SessionState};
pub use streamer::CommandStreamer;
