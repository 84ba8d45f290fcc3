use crate::core::session::PortOpener;
use crate::domain::config::DEFAULT_BAUD_RATE;
use crate::domain::error::{FilterCtlError, FilterCtlResult};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

const PROBE_TIMEOUT: Duration = Duration::from_millis(50);
const WINDOWS_PORT_COUNT: u32 = 256;

/// Host platform family, which decides how candidate ports are named
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    pub fn detect() -> FilterCtlResult<Self> {
        if cfg!(windows) {
            Ok(Platform::Windows)
        } else if cfg!(target_os = "linux") {
            Ok(Platform::Linux)
        } else if cfg!(target_os = "macos") {
            Ok(Platform::MacOs)
        } else {
            Err(FilterCtlError::UnsupportedPlatform(std::env::consts::OS.to_string()))
        }
    }

    /// Every name that might be a serial port, openable or not
    pub fn candidates(self) -> Vec<String> {
        match self {
            Platform::Windows => (1..=WINDOWS_PORT_COUNT).map(|i| format!("COM{}", i)).collect(),
            Platform::Linux => scan_dir(Path::new("/dev"), is_linux_tty),
            Platform::MacOs => scan_dir(Path::new("/dev"), is_macos_tty),
        }
    }
}

/// `/dev/tty[A-Za-z]*` - skips `/dev/tty` itself and the numbered consoles
pub fn is_linux_tty(name: &str) -> bool {
    name.strip_prefix("tty")
        .and_then(|rest| rest.chars().next())
        .map_or(false, |c| c.is_ascii_alphabetic())
}

/// `/dev/tty.*`
pub fn is_macos_tty(name: &str) -> bool {
    name.starts_with("tty.")
}

fn scan_dir(dir: &Path, matches: fn(&str) -> bool) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut ports: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            matches(name).then(|| dir.join(name).to_string_lossy().into_owned())
        })
        .collect();
    ports.sort();
    ports
}

/// Keep the candidates that can be opened. Each one is opened and closed
/// immediately; ports held by another session will be reported missing.
pub fn probe_ports<I>(opener: &dyn PortOpener, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    candidates
        .into_iter()
        .filter(|port| match opener.open(port, DEFAULT_BAUD_RATE, PROBE_TIMEOUT) {
            Ok(link) => {
                drop(link);
                true
            }
            Err(e) => {
                trace!("Skipping {}: {}", port, e);
                false
            }
        })
        .collect()
}

/// List the serial ports on this host that can currently be opened
pub fn list_ports(opener: &dyn PortOpener) -> FilterCtlResult<Vec<String>> {
    let platform = Platform::detect()?;
    let candidates = platform.candidates();
    debug!("Probing {} candidate ports on {:?}", candidates.len(), platform);

    let ports = probe_ports(opener, candidates);
    debug!("{} ports available", ports.len());
    Ok(ports)
}
