use crate::core::session::{PortOpener, SerialLink};
use std::io;
use std::time::Duration;
use tracing::debug;

/// Opens real serial ports through the `serialport` crate, 8N1 without
/// flow control as the controller firmware expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl SerialOpener {
    pub fn new() -> Self {
        Self
    }
}

impl PortOpener for SerialOpener {
    fn open(&self, port: &str, baud_rate: u32, timeout: Duration) -> io::Result<Box<dyn SerialLink>> {
        let handle = serialport::new(port, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .timeout(timeout)
            .open()?;

        debug!("Serial port {} opened at {} baud", port, baud_rate);
        Ok(Box::new(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialOpener::new().open("/dev/filterctl-does-not-exist", 115_200, Duration::from_millis(10));
        assert!(result.is_err());
    }

    #[test]
    fn test_open_non_serial_device_fails() {
        // /dev/null is not a tty, so configuring it as a serial port fails
        let result = SerialOpener::new().open("/dev/null", 115_200, Duration::from_millis(10));
        assert!(result.is_err());
    }
}
