//! grblHAL protocol support
//!
//! Response classification, alarm decoding and the power-on handshake.

pub mod alarm_decoder;
pub mod handshake;
pub mod response_parser;

pub use alarm_decoder::{
    alarm_severity, decode_alarm, decode_error, format_alarm, format_error, AlarmSeverity,
};
pub use handshake::{Handshake, HandshakeState, HandshakeStep};
pub use response_parser::{classify, ControllerEvent};
