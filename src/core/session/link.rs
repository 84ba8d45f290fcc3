use std::io::{self, Read, Write};
use std::time::Duration;

/// A byte stream to the device.
///
/// Reads must honour the timeout the link was opened with and report an
/// expiry as [`io::ErrorKind::TimedOut`].
pub trait SerialLink: Read + Write + Send {
    /// Independent handle to the same device, used by the reader thread
    fn try_clone_link(&self) -> io::Result<Box<dyn SerialLink>>;
}

/// Opens links by port name. Shared by the session and the port probe.
pub trait PortOpener: Send + Sync {
    fn open(&self, port: &str, baud_rate: u32, timeout: Duration) -> io::Result<Box<dyn SerialLink>>;
}

impl SerialLink for Box<dyn serialport::SerialPort> {
    fn try_clone_link(&self) -> io::Result<Box<dyn SerialLink>> {
        let clone = self.try_clone()?;
        Ok(Box::new(clone))
    }
}
