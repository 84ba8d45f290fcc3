//! In-memory serial link shared by the integration tests.
#![allow(dead_code)]

use filterctl::{PortOpener, SerialLink, SessionEvent};
use std::collections::{HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

pub const TEST_READ_TIMEOUT: Duration = Duration::from_millis(20);

enum Inbound {
    Data(Vec<u8>),
    Fault(io::ErrorKind),
}

#[derive(Default)]
struct Wire {
    inbound: VecDeque<Inbound>,
    written: Vec<u8>,
    fail_writes: bool,
}

/// Both ends of a fake serial line. Clones share the same wire.
#[derive(Clone)]
pub struct Loopback {
    wire: Arc<(Mutex<Wire>, Condvar)>,
    timeout: Duration,
}

impl Loopback {
    pub fn new() -> Self {
        Self {
            wire: Arc::new((Mutex::new(Wire::default()), Condvar::new())),
            timeout: TEST_READ_TIMEOUT,
        }
    }

    fn with_wire<T>(&self, f: impl FnOnce(&mut Wire) -> T) -> T {
        let (lock, signal) = &*self.wire;
        let result = f(&mut lock.lock().unwrap());
        signal.notify_all();
        result
    }

    /// Device writes raw bytes
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.with_wire(|wire| wire.inbound.push_back(Inbound::Data(bytes.to_vec())));
    }

    /// Device writes a line terminated with `\n`
    pub fn push_line(&self, line: &str) {
        self.push_bytes(format!("{}\n", line).as_bytes());
    }

    /// Next read fails with `kind`
    pub fn push_fault(&self, kind: io::ErrorKind) {
        self.with_wire(|wire| wire.inbound.push_back(Inbound::Fault(kind)));
    }

    pub fn fail_writes(&self) {
        self.with_wire(|wire| wire.fail_writes = true);
    }

    pub fn written(&self) -> Vec<u8> {
        self.with_wire(|wire| wire.written.clone())
    }

    pub fn written_text(&self) -> String {
        String::from_utf8(self.written()).unwrap()
    }
}

impl Read for Loopback {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (lock, signal) = &*self.wire;
        let guard = lock.lock().unwrap();
        let (mut wire, _) = signal
            .wait_timeout_while(guard, self.timeout, |wire| wire.inbound.is_empty())
            .unwrap();

        match wire.inbound.pop_front() {
            None => Err(io::ErrorKind::TimedOut.into()),
            Some(Inbound::Fault(kind)) => Err(io::Error::new(kind, "injected fault")),
            Some(Inbound::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    wire.inbound.push_front(Inbound::Data(data[n..].to_vec()));
                }
                Ok(n)
            }
        }
    }
}

impl Write for Loopback {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_wire(|wire| {
            if wire.fail_writes {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "write refused"))
            } else {
                wire.written.extend_from_slice(buf);
                Ok(buf.len())
            }
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialLink for Loopback {
    fn try_clone_link(&self) -> io::Result<Box<dyn SerialLink>> {
        Ok(Box::new(self.clone()))
    }
}

/// Opens the shared loopback for every port except the refused ones
pub struct LoopbackOpener {
    pub link: Loopback,
    refused: HashSet<String>,
    opened: Mutex<Vec<(String, u32)>>,
}

impl LoopbackOpener {
    pub fn new() -> Self {
        Self {
            link: Loopback::new(),
            refused: HashSet::new(),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn refusing(ports: &[&str]) -> Self {
        Self {
            refused: ports.iter().map(|p| p.to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn opened(&self) -> Vec<(String, u32)> {
        self.opened.lock().unwrap().clone()
    }
}

impl PortOpener for LoopbackOpener {
    fn open(&self, port: &str, baud_rate: u32, timeout: Duration) -> io::Result<Box<dyn SerialLink>> {
        if self.refused.contains(port) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "port busy"));
        }
        self.opened.lock().unwrap().push((port.to_string(), baud_rate));

        let mut link = self.link.clone();
        link.timeout = timeout;
        Ok(Box::new(link))
    }
}

/// Wait for the next event from a session, failing the test after `limit`
pub fn recv_within(events: &mut UnboundedReceiver<SessionEvent>, limit: Duration) -> Option<SessionEvent> {
    let deadline = Instant::now() + limit;
    loop {
        match events.try_recv() {
            Ok(event) => return Some(event),
            Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) if Instant::now() >= deadline => return None,
            Err(TryRecvError::Empty) => std::thread::sleep(Duration::from_millis(2)),
        }
    }
}

/// Collect events until `Closed` (inclusive) or the channel ends
pub fn drain_until_closed(events: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Some(event) = recv_within(events, Duration::from_secs(2)) {
        let closed = matches!(event, SessionEvent::Closed);
        seen.push(event);
        if closed {
            break;
        }
    }
    seen
}
