//! FilterCtl Library
//!
//! Serial control of dual-band (C / L) tunable optical filter controllers:
//! port discovery, a device session with a background reader, typed
//! command construction and response classification.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::domain::error::{FilterCtlError, FilterCtlResult};
pub use crate::domain::config::FilterCtlConfig;
pub use crate::core::command::{Band, Command, SweepParams};
pub use crate::core::controller::Controller;
pub use crate::core::response::Response;
pub use crate::core::session::{DeviceSession, PortOpener, SerialLink, SessionConfig, SessionEvent, SessionState};
