//! grblHAL alarm and error codes
//!
//! Converts numeric codes to readable messages and classifies alarms by
//! whether an automated `$X` unlock may clear them.

use serde::{Deserialize, Serialize};

/// How the session reacts to an alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmSeverity {
    /// Machine position is intact; unlock and carry on
    Recoverable,
    /// Machine halted or position lost; stop the session
    Fatal,
}

/// Alarm codes an unlock can clear. Everything else is fatal.
const RECOVERABLE_ALARMS: &[u16] = &[
    2, // soft limit, position retained
    4, // probe not in expected initial state
    5, // probe did not contact within travel
];

/// Classify an alarm code. Unknown codes are fatal.
pub fn alarm_severity(code: u16) -> AlarmSeverity {
    if RECOVERABLE_ALARMS.contains(&code) {
        AlarmSeverity::Recoverable
    } else {
        AlarmSeverity::Fatal
    }
}

/// Decode an alarm code to a human-readable message
pub fn decode_alarm(code: u16) -> String {
    match code {
        1 => "Hard limit triggered. Machine position is likely lost.".to_string(),
        2 => "Soft limit: motion target exceeds machine travel. Position retained.".to_string(),
        3 => "Reset while in motion. Position is likely lost.".to_string(),
        4 => "Probe fail. Probe was not in the expected state before the cycle.".to_string(),
        5 => "Probe fail. Probe did not contact the workpiece within the programmed travel."
            .to_string(),
        6 => "Homing fail. Reset during active homing cycle.".to_string(),
        7 => "Homing fail. Safety door opened during homing.".to_string(),
        8 => "Homing fail. Could not clear limit switch on pull-off.".to_string(),
        9 => "Homing fail. Limit switch not found within search distance.".to_string(),
        10 => "Limit switch engaged at startup.".to_string(),
        11 => "Homing required.".to_string(),
        12 => "E-stop asserted.".to_string(),
        13 => "Motor fault.".to_string(),
        14 => "Homing configuration error.".to_string(),
        15 => "Self-test failed.".to_string(),
        16 => "Spindle at speed timeout.".to_string(),
        17 => "Probe protection triggered.".to_string(),
        18 => "Spindle sync error.".to_string(),
        19 => "Power supply fault.".to_string(),
        20 => "Controller error.".to_string(),
        _ => format!("Unknown alarm code: {}", code),
    }
}

/// Decode an error code to a human-readable message
pub fn decode_error(code: u16) -> String {
    match code {
        1 => "Expected command letter.".to_string(),
        2 => "Bad number format.".to_string(),
        3 => "Unrecognised '$' system command.".to_string(),
        8 => "'$' command only valid when idle.".to_string(),
        9 => "G-code locked out during alarm or jog state.".to_string(),
        15 => "Jog target exceeds machine travel.".to_string(),
        20 => "Unsupported or invalid g-code command.".to_string(),
        22 => "Feed rate has not yet been set.".to_string(),
        24 => "Two commands in the block both require axis words.".to_string(),
        26 => "Command requires axis words but none were given.".to_string(),
        32 => "Arc has no axis words in the selected plane.".to_string(),
        33 => "Motion target is invalid (impossible arc or probe target is current position)."
            .to_string(),
        34 => "Arc radius definition error.".to_string(),
        35 => "Arc offset definition is missing a word in the selected plane.".to_string(),
        70 => "Invalid plane selected for command.".to_string(),
        _ => format!("Unknown error code: {}", code),
    }
}

/// Format alarm message with code and description
pub fn format_alarm(code: u16) -> String {
    format!("ALARM:{} - {}", code, decode_alarm(code))
}

/// Format error message with code and description
pub fn format_error(code: u16) -> String {
    format!("error:{} - {}", code, decode_error(code))
}
