use crate::core::response::Response;
use crate::core::session::link::{PortOpener, SerialLink};
use crate::core::session::state::{SessionState, StateCell};
use crate::domain::config::{DEFAULT_BAUD_RATE, MIN_READ_TIMEOUT_MS};
use crate::domain::error::{FilterCtlError, FilterCtlResult};
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Read timeout of the worker's blocking line read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Notification published by the session reader
#[derive(Debug)]
pub enum SessionEvent {
    /// A `:ACK` or `:NACK` line, in wire order
    Response(Response),
    /// Unexpected reader failure; always followed by `Closed`
    Fault(FilterCtlError),
    /// The reader has stopped. Sent exactly once per opened session.
    Closed,
}

pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Connection parameters of a device session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl SessionConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Values below the minimum read timeout are raised to it, since the
    /// reader polls the running flag once per timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout.max(Duration::from_millis(MIN_READ_TIMEOUT_MS));
        self
    }
}

/// Frame a command body for the wire
pub fn frame(command: &str) -> String {
    format!(":{}\n", command)
}

/// One serial connection to the filter controller.
///
/// The caller owns the write half and the running flag. A dedicated reader
/// thread owns the read half and is the only producer of [`SessionEvent`]s.
pub struct DeviceSession {
    config: SessionConfig,
    state: Arc<StateCell>,
    running: Arc<AtomicBool>,
    writer: Option<Box<dyn SerialLink>>,
    worker: Option<JoinHandle<()>>,
}

impl DeviceSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: Arc::new(StateCell::new(SessionState::Idle)),
            running: Arc::new(AtomicBool::new(false)),
            writer: None,
            worker: None,
        }
    }

    pub fn port(&self) -> &str {
        &self.config.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Open the port and start the reader thread.
    ///
    /// On failure the session ends up `Closed` without ever having been
    /// open, and no `Closed` event is produced.
    pub fn connect(&mut self, opener: &dyn PortOpener) -> FilterCtlResult<EventReceiver> {
        match self.state() {
            SessionState::Idle => {}
            SessionState::Connecting | SessionState::Open => {
                return Err(FilterCtlError::AlreadyConnected(self.config.port.clone()))
            }
            SessionState::Closed => return Err(FilterCtlError::SessionClosed),
        }

        self.state.set(SessionState::Connecting);
        debug!(
            "Opening {} at {} baud (read timeout {:?})",
            self.config.port, self.config.baud_rate, self.config.read_timeout
        );

        let (link, reader) = match self.open_halves(opener) {
            Ok(halves) => halves,
            Err(source) => {
                self.state.set(SessionState::Closed);
                warn!("Failed to open {}: {}", self.config.port, source);
                return Err(FilterCtlError::ConnectionFailed {
                    port: self.config.port.clone(),
                    source,
                });
            }
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        self.running.store(true, Ordering::SeqCst);
        self.state.set(SessionState::Open);

        let worker = ReadLoop {
            port: self.config.port.clone(),
            running: Arc::clone(&self.running),
            state: Arc::clone(&self.state),
            events: sender,
        };
        let spawned = thread::Builder::new()
            .name(format!("filterctl-rx {}", self.config.port))
            .spawn(move || worker.run(reader));

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.writer = Some(link);
                info!("Connected to {} at {} baud", self.config.port, self.config.baud_rate);
                Ok(receiver)
            }
            Err(source) => {
                self.running.store(false, Ordering::SeqCst);
                self.state.set(SessionState::Closed);
                Err(FilterCtlError::ConnectionFailed {
                    port: self.config.port.clone(),
                    source,
                })
            }
        }
    }

    fn open_halves(
        &self,
        opener: &dyn PortOpener,
    ) -> io::Result<(Box<dyn SerialLink>, Box<dyn SerialLink>)> {
        let link = opener.open(&self.config.port, self.config.baud_rate, self.config.read_timeout)?;
        let reader = link.try_clone_link()?;
        Ok((link, reader))
    }

    /// Write `:<command>\n`. A failed write leaves the session open.
    pub fn send(&mut self, command: &str) -> FilterCtlResult<()> {
        if !self.is_open() {
            return Err(FilterCtlError::NotConnected);
        }
        let writer = self.writer.as_mut().ok_or(FilterCtlError::NotConnected)?;

        let framed = frame(command);
        writer
            .write_all(framed.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| {
                error!("Failed to write to {}: {}", self.config.port, e);
                FilterCtlError::SendFailed(e)
            })?;

        debug!("Sent: {}", framed.trim_end());
        Ok(())
    }

    /// Ask the reader to stop and release the write half. Idempotent.
    ///
    /// The reader notices within one read timeout and then publishes
    /// `Closed` itself.
    pub fn disconnect(&mut self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if self.writer.take().is_some() {
            info!("Disconnecting from {}", self.config.port);
        }
        if !was_running && self.state() == SessionState::Idle {
            self.state.set(SessionState::Closed);
        }
    }

    /// Disconnect and wait for the reader thread to finish
    pub fn shutdown(mut self) {
        self.disconnect();
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Reader thread for {} panicked", self.config.port);
            }
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        // The reader exits on its own once it sees the cleared flag.
        self.disconnect();
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

struct ReadLoop {
    port: String,
    running: Arc<AtomicBool>,
    state: Arc<StateCell>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ReadLoop {
    fn run(self, reader: Box<dyn SerialLink>) {
        let mut reader = BufReader::new(reader);
        // Bytes of a line interrupted by a read timeout stay here until its
        // newline arrives.
        let mut pending = Vec::new();

        while self.running.load(Ordering::SeqCst) {
            match reader.read_until(b'\n', &mut pending) {
                Ok(0) => {
                    self.fail(io::Error::new(io::ErrorKind::UnexpectedEof, "port closed by device"));
                    break;
                }
                Ok(_) => {
                    if pending.last() == Some(&b'\n') {
                        self.dispatch(&pending);
                        pending.clear();
                    }
                }
                Err(e) if is_transient(&e) => continue,
                Err(e) => {
                    self.fail(e);
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.state.set(SessionState::Closed);
        info!("Port {} closed", self.port);
        self.emit(SessionEvent::Closed);
    }

    fn dispatch(&self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return;
        }

        debug!("Received: {}", line);
        match Response::classify(line) {
            Some(response) => self.emit(SessionEvent::Response(response)),
            None => debug!("Ignoring unsolicited line from {}", self.port),
        }
    }

    /// Report a read failure unless it was caused by our own disconnect
    fn fail(&self, source: io::Error) {
        if !self.running.load(Ordering::SeqCst) {
            debug!("Reader for {} stopped during shutdown: {}", self.port, source);
            return;
        }
        error!("Read error on {}: {}", self.port, source);
        self.emit(SessionEvent::Fault(FilterCtlError::ReadFailed {
            port: self.port.clone(),
            source,
        }));
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.events.send(event) {
            debug!("No listener for session event: {:?}", e.0);
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RefusingOpener;

    impl PortOpener for RefusingOpener {
        fn open(&self, port: &str, _: u32, _: Duration) -> io::Result<Box<dyn SerialLink>> {
            Err(io::Error::new(io::ErrorKind::NotFound, format!("{} not found", port)))
        }
    }

    #[test]
    fn test_frame() {
        assert_eq!(frame("iden?"), ":iden?\n");
        assert_eq!(frame("set-wl:C:1550.0"), ":set-wl:C:1550.0\n");
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new("COM3");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.read_timeout, Duration::from_secs(1));

        let config = config.with_baud_rate(9600).with_read_timeout(Duration::from_millis(50));
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_read_timeout_floor() {
        let config = SessionConfig::new("COM3").with_read_timeout(Duration::ZERO);
        assert_eq!(config.read_timeout, Duration::from_millis(MIN_READ_TIMEOUT_MS));
    }

    #[test]
    fn test_send_before_connect_is_rejected() {
        let mut session = DeviceSession::new(SessionConfig::new("COM3"));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(matches!(session.send("iden?"), Err(FilterCtlError::NotConnected)));
    }

    #[test]
    fn test_connect_failure_closes_session() {
        let mut session = DeviceSession::new(SessionConfig::new("/dev/ttyNOPE"));
        let result = session.connect(&RefusingOpener);

        match result {
            Err(FilterCtlError::ConnectionFailed { port, .. }) => assert_eq!(port, "/dev/ttyNOPE"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(session.connect(&RefusingOpener), Err(FilterCtlError::SessionClosed)));
    }

    #[test]
    fn test_disconnect_idle_session() {
        let mut session = DeviceSession::new(SessionConfig::new("COM3"));
        session.disconnect();
        session.disconnect();
        assert_eq!(session.state(), SessionState::Closed);
    }
}
