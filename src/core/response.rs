use serde::{Deserialize, Serialize};
use std::fmt;

pub const ACK_PREFIX: &str = ":ACK";
pub const NACK_PREFIX: &str = ":NACK";

/// A classified line received from the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "line", rename_all = "lowercase")]
pub enum Response {
    /// Line starting with `:ACK`, kept verbatim
    Ack(String),
    /// Line starting with `:NACK`, kept verbatim
    Nack(String),
}

impl Response {
    /// Classify an inbound line. Lines that are neither `:ACK` nor `:NACK`
    /// are not responses.
    pub fn classify(line: &str) -> Option<Self> {
        if line.starts_with(ACK_PREFIX) {
            Some(Response::Ack(line.to_string()))
        } else if line.starts_with(NACK_PREFIX) {
            Some(Response::Nack(line.to_string()))
        } else {
            None
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Response::Ack(_))
    }

    /// The full line as received
    pub fn line(&self) -> &str {
        match self {
            Response::Ack(line) | Response::Nack(line) => line,
        }
    }

    /// Text after the prefix, e.g. `1550.123` for `:ACK: 1550.123`
    pub fn payload(&self) -> &str {
        let rest = match self {
            Response::Ack(line) => line.strip_prefix(ACK_PREFIX).unwrap_or(line),
            Response::Nack(line) => line.strip_prefix(NACK_PREFIX).unwrap_or(line),
        };
        rest.strip_prefix(':').unwrap_or(rest).trim()
    }

    /// Operator-facing status line
    pub fn status_text(&self) -> String {
        let payload = self.payload();
        match (self, payload.is_empty()) {
            (Response::Ack(_), true) => "OK".to_string(),
            (Response::Ack(_), false) => format!("OK: {}", payload),
            (Response::Nack(_), true) => "Error".to_string(),
            (Response::Nack(_), false) => format!("Error: {}", payload),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_text())
    }
}
