// Core module - Device protocol, sessions and port discovery
pub mod command;
pub mod controller;
pub mod ports;
pub mod response;
pub mod session;

pub use command::{Band, Command, SweepParams};
pub use controller::Controller;
pub use response::Response;
pub use session::{DeviceSession, SessionConfig, SessionEvent, SessionState};
