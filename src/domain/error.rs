use std::time::Duration;
use thiserror::Error;

/// FilterCtl unified error type
#[derive(Error, Debug)]
pub enum FilterCtlError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Failed to open port {port}: {source}")]
    ConnectionFailed {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to send command: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("Read error on {port}: {source}")]
    ReadFailed {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Device not connected")]
    NotConnected,

    #[error("Already connected to {0}")]
    AlreadyConnected(String),

    #[error("Session is closed")]
    SessionClosed,

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Device rejected command: {0}")]
    Rejected(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Output error: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FilterCtlResult<T> = Result<T, FilterCtlError>;
