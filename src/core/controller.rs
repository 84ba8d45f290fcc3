use crate::core::command::Command;
use crate::core::response::Response;
use crate::core::session::{DeviceSession, EventReceiver, PortOpener, SessionConfig, SessionEvent, SessionState};
use crate::domain::error::{FilterCtlError, FilterCtlResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Routes commands to the single active device session and relays its
/// events to the operator.
pub struct Controller {
    opener: Arc<dyn PortOpener>,
    read_timeout: Duration,
    session: Option<DeviceSession>,
    events: Option<EventReceiver>,
}

impl Controller {
    pub fn new(opener: Arc<dyn PortOpener>, read_timeout: Duration) -> Self {
        Self {
            opener,
            read_timeout,
            session: None,
            events: None,
        }
    }

    /// True while a session exists, including one whose reader has stopped
    /// but whose `Closed` event has not been consumed yet
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.session.as_ref().map(DeviceSession::state)
    }

    pub fn port(&self) -> Option<&str> {
        self.session.as_ref().map(DeviceSession::port)
    }

    pub fn connect(&mut self, port: &str, baud_rate: u32) -> FilterCtlResult<()> {
        if let Some(session) = &self.session {
            return Err(FilterCtlError::AlreadyConnected(session.port().to_string()));
        }
        if port.trim().is_empty() {
            return Err(FilterCtlError::InvalidInput("No serial port selected".to_string()));
        }

        let config = SessionConfig::new(port)
            .with_baud_rate(baud_rate)
            .with_read_timeout(self.read_timeout);
        let mut session = DeviceSession::new(config);
        let events = session.connect(self.opener.as_ref())?;

        self.session = Some(session);
        self.events = Some(events);
        Ok(())
    }

    /// Request the active session to close. The session is released once
    /// its `Closed` event comes through [`Controller::next_event`].
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.disconnect();
        }
    }

    /// Connect when idle, disconnect when connected. Returns whether a
    /// session is active afterwards.
    pub fn toggle(&mut self, port: Option<&str>, baud_rate: u32) -> FilterCtlResult<bool> {
        if self.session.is_some() {
            self.disconnect();
            return Ok(false);
        }
        let port = port.ok_or_else(|| FilterCtlError::InvalidInput("No serial port selected".to_string()))?;
        self.connect(port, baud_rate)?;
        Ok(true)
    }

    pub fn send(&mut self, command: &Command) -> FilterCtlResult<()> {
        self.send_body(&command.body())
    }

    pub fn send_body(&mut self, body: &str) -> FilterCtlResult<()> {
        let session = self.session.as_mut().ok_or(FilterCtlError::NotConnected)?;
        session.send(body)
    }

    /// Wait for the next session event. Returns `None` when no session is
    /// active.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let events = self.events.as_mut()?;
        let event = events.recv().await.unwrap_or(SessionEvent::Closed);

        if matches!(event, SessionEvent::Closed) {
            self.release();
        }
        Some(event)
    }

    /// Send a command and wait for the next `:ACK` / `:NACK`.
    ///
    /// The device does not correlate responses with requests; whatever
    /// response arrives next is attributed to this command.
    pub async fn request(&mut self, command: &Command, timeout: Duration) -> FilterCtlResult<Response> {
        self.send(command)?;
        debug!("Waiting up to {:?} for response to {}", timeout, command.name());

        let wait = async {
            match self.next_event().await {
                Some(SessionEvent::Response(response)) => Ok(response),
                Some(SessionEvent::Fault(error)) => Err(error),
                Some(SessionEvent::Closed) | None => Err(FilterCtlError::NotConnected),
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| FilterCtlError::Timeout(timeout))?
    }

    /// Disconnect and drain events until the reader has stopped
    pub async fn close(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.disconnect();
        while let Some(event) = self.next_event().await {
            match event {
                SessionEvent::Closed => break,
                SessionEvent::Fault(error) => warn!("Fault while closing: {}", error),
                SessionEvent::Response(response) => debug!("Dropping late response: {}", response.line()),
            }
        }
    }

    fn release(&mut self) {
        self.events = None;
        if let Some(session) = self.session.take() {
            info!("Session on {} released", session.port());
            session.shutdown();
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("read_timeout", &self.read_timeout)
            .field("session", &self.session)
            .finish()
    }
}
