//! Firmware protocol implementations
//!
//! Supported controllers:
//! - grblHAL: networked GRBL derivative with extended alarm codes

pub mod grblhal;
