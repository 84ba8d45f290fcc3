// Session module - Device session over a serial link
pub mod link;
pub mod session;
pub mod state;

pub use link::{PortOpener, SerialLink};
pub use session::{frame, DeviceSession, EventReceiver, SessionConfig, SessionEvent, DEFAULT_READ_TIMEOUT};
pub use state::SessionState;
