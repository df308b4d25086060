//! grblHAL Response Classifier
//!
//! Turns one line of controller output into a typed event. Classification is
//! a pure function of the line; lines that cannot be understood become
//! [`ControllerEvent::Unrecognized`] instead of failing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified controller output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControllerEvent {
    /// Startup banner, e.g. `GrblHAL 1.1f ['$' or '$HELP' for help]`
    Banner(String),
    /// `ok`
    Acknowledged,
    /// `error` or `error:<code>`
    RejectedCommand {
        /// Error code, when the line carried a numeric one
        code: Option<u16>,
    },
    /// `[PRB:x,y,z:flag]`
    ProbeReport {
        /// X at the probe event
        x: f64,
        /// Y at the probe event
        y: f64,
        /// Z at the probe event
        z: f64,
        /// Whether the probe contacted the surface
        triggered: bool,
    },
    /// `ALARM:<code>`
    AlarmReport {
        /// Alarm code
        code: u16,
    },
    /// Feedback messages and status reports (`[MSG:...]`, `<Idle|...>`)
    StatusMessage(String),
    /// Anything else
    Unrecognized(String),
}

impl ControllerEvent {
    /// Whether this is the feedback message printed after `$X`
    pub fn is_unlock_notice(&self) -> bool {
        match self {
            Self::StatusMessage(text) => {
                let lower = text.to_ascii_lowercase();
                lower.starts_with("[msg:") && lower.contains("unlocked")
            }
            _ => false,
        }
    }
}

impl fmt::Display for ControllerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Banner(text) => write!(f, "banner:{}", text),
            Self::Acknowledged => write!(f, "ok"),
            Self::RejectedCommand { code: Some(code) } => {
                write!(f, "{}", super::alarm_decoder::format_error(*code))
            }
            Self::RejectedCommand { code: None } => write!(f, "error"),
            Self::ProbeReport { x, y, z, triggered } => {
                write!(f, "probe:{},{},{}:{}", x, y, z, u8::from(*triggered))
            }
            Self::AlarmReport { code } => {
                write!(f, "{}", super::alarm_decoder::format_alarm(*code))
            }
            Self::StatusMessage(text) => write!(f, "status:{}", text),
            Self::Unrecognized(text) => write!(f, "unrecognized:{}", text),
        }
    }
}

/// Classify one trimmed line of controller output
pub fn classify(line: &str) -> ControllerEvent {
    let line = line.trim();
    let lower = line.to_ascii_lowercase();

    if lower == "ok" {
        return ControllerEvent::Acknowledged;
    }

    if lower.starts_with("error") {
        let code = lower
            .strip_prefix("error:")
            .and_then(|c| c.trim().parse::<u16>().ok());
        return ControllerEvent::RejectedCommand { code };
    }

    if let Some(code) = lower.strip_prefix("alarm:") {
        return match code.trim().parse::<u16>() {
            Ok(code) => ControllerEvent::AlarmReport { code },
            Err(_) => {
                tracing::warn!("Malformed alarm line: {}", line);
                ControllerEvent::Unrecognized(line.to_string())
            }
        };
    }

    if line.starts_with("[PRB:") {
        return parse_probe_report(line).unwrap_or_else(|| {
            tracing::warn!("Malformed probe report: {}", line);
            ControllerEvent::Unrecognized(line.to_string())
        });
    }

    if (line.starts_with('[') && line.ends_with(']'))
        || (line.starts_with('<') && line.ends_with('>'))
    {
        return ControllerEvent::StatusMessage(line.to_string());
    }

    if lower.starts_with("grbl") || lower.contains("grblhal") {
        return ControllerEvent::Banner(line.to_string());
    }

    ControllerEvent::Unrecognized(line.to_string())
}

/// Parse `[PRB:x,y,z(,a):flag]`
fn parse_probe_report(line: &str) -> Option<ControllerEvent> {
    let body = line.strip_prefix("[PRB:")?.strip_suffix(']')?;
    let (coords, flag) = body.rsplit_once(':')?;

    let triggered = match flag.trim() {
        "1" => true,
        "0" => false,
        _ => return None,
    };

    let values = coords
        .split(',')
        .map(|v| v.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<f64>>>()?;

    match values.as_slice() {
        [x, y, z] | [x, y, z, _] => Some(ControllerEvent::ProbeReport {
            x: *x,
            y: *y,
            z: *z,
            triggered,
        }),
        _ => None,
    }
}
