//! # zprobe Communication
//!
//! Talks to a networked grblHAL controller and runs the probing survey.
//! Provides the TCP transport, grblHAL response classification and
//! handshake, and the streaming session built on top of them.

pub mod communication;
pub mod firmware;
pub mod streaming;

pub use communication::{ConnectionParams, LineSplitter, TcpTransport, Transport, DEFAULT_PORT};

pub use firmware::grblhal::{classify, ControllerEvent, Handshake, HandshakeState};

pub use streaming::{
    CommandStreamer, FaultDecision, FaultPolicy, ProbeSession, SessionOptions, SessionOutcome,
    SessionReport,
};
