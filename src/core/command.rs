use crate::domain::error::{FilterCtlError, FilterCtlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Wavelengths accepted for `set-wl` and sweep bounds, in nm
pub const WAVELENGTH_RANGE_NM: RangeInclusive<f64> = 1000.0..=2000.0;
/// Sweep increment, in nm
pub const SWEEP_STEP_RANGE_NM: RangeInclusive<f64> = 0.001..=100.0;
/// Dwell time per sweep step, in ms
pub const SWEEP_INTERVAL_RANGE_MS: RangeInclusive<u32> = 10..=60_000;

/// Filter channel addressed by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    C,
    L,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::C => write!(f, "C"),
            Band::L => write!(f, "L"),
        }
    }
}

impl FromStr for Band {
    type Err = FilterCtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "C" | "c" => Ok(Band::C),
            "L" | "l" => Ok(Band::L),
            other => Err(FilterCtlError::InvalidInput(format!(
                "Unknown band '{}', expected C or L",
                other
            ))),
        }
    }
}

/// Parameters of a continuous wavelength sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepParams {
    pub band: Band,
    pub min_nm: f64,
    pub max_nm: f64,
    pub step_nm: f64,
    pub interval_ms: u32,
}

impl SweepParams {
    /// Checks run on the values as rendered on the wire
    pub fn validate(&self) -> FilterCtlResult<()> {
        let min_nm = round_nm(self.min_nm);
        let max_nm = round_nm(self.max_nm);
        let step_nm = round_nm(self.step_nm);
        check_wavelength("sweep start", min_nm)?;
        check_wavelength("sweep end", max_nm)?;
        if max_nm <= min_nm {
            return Err(FilterCtlError::InvalidInput(format!(
                "Sweep end {} nm must be greater than start {} nm",
                format_nm(self.max_nm),
                format_nm(self.min_nm)
            )));
        }
        if !SWEEP_STEP_RANGE_NM.contains(&step_nm) {
            return Err(FilterCtlError::InvalidInput(format!(
                "Sweep step {} nm outside {}..={} nm",
                self.step_nm,
                SWEEP_STEP_RANGE_NM.start(),
                SWEEP_STEP_RANGE_NM.end()
            )));
        }
        if !SWEEP_INTERVAL_RANGE_MS.contains(&self.interval_ms) {
            return Err(FilterCtlError::InvalidInput(format!(
                "Sweep interval {} ms outside {}..={} ms",
                self.interval_ms,
                SWEEP_INTERVAL_RANGE_MS.start(),
                SWEEP_INTERVAL_RANGE_MS.end()
            )));
        }
        Ok(())
    }
}

/// A command understood by the filter controller firmware.
///
/// Commands only exist to produce the body string handed to a session; the
/// transport never looks inside them.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `iden?` - model, serial number and firmware of both channels
    Identify,
    /// `get-wl?<band>`
    GetWavelength(Band),
    /// `set-wl:<band>:<nm>` - also stops a running sweep on that band
    SetWavelength { band: Band, nm: f64 },
    /// `sweep:<band>:<min>:<max>:<step>:<interval_ms>`
    Sweep(SweepParams),
    /// `get-interval?<band>` - tunable range as `(min,max)`
    GetInterval(Band),
    /// `powerup`
    PowerUp,
    /// `get-power`
    GetPower,
    /// Any other body, sent verbatim
    Raw(String),
}

impl Command {
    pub fn set_wavelength(band: Band, nm: f64) -> FilterCtlResult<Self> {
        check_wavelength("wavelength", nm)?;
        Ok(Command::SetWavelength { band, nm })
    }

    pub fn sweep(params: SweepParams) -> FilterCtlResult<Self> {
        params.validate()?;
        Ok(Command::Sweep(params))
    }

    pub fn raw(body: impl Into<String>) -> FilterCtlResult<Self> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(FilterCtlError::InvalidInput("Empty command".to_string()));
        }
        if body.contains(['\n', '\r']) {
            return Err(FilterCtlError::InvalidInput(
                "Command must not contain line breaks".to_string(),
            ));
        }
        Ok(Command::Raw(body))
    }

    /// Short name used in logs and output
    pub fn name(&self) -> &'static str {
        match self {
            Command::Identify => "iden",
            Command::GetWavelength(_) => "get-wl",
            Command::SetWavelength { .. } => "set-wl",
            Command::Sweep(_) => "sweep",
            Command::GetInterval(_) => "get-interval",
            Command::PowerUp => "powerup",
            Command::GetPower => "get-power",
            Command::Raw(_) => "raw",
        }
    }

    /// Wire body, without the `:` prefix and line terminator
    pub fn body(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Identify => write!(f, "iden?"),
            Command::GetWavelength(band) => write!(f, "get-wl?{}", band),
            Command::SetWavelength { band, nm } => write!(f, "set-wl:{}:{}", band, format_nm(*nm)),
            Command::Sweep(p) => write!(
                f,
                "sweep:{}:{}:{}:{}:{}",
                p.band,
                format_nm(p.min_nm),
                format_nm(p.max_nm),
                format_nm(p.step_nm),
                p.interval_ms
            ),
            Command::GetInterval(band) => write!(f, "get-interval?{}", band),
            Command::PowerUp => write!(f, "powerup"),
            Command::GetPower => write!(f, "get-power"),
            Command::Raw(body) => write!(f, "{}", body),
        }
    }
}

impl FromStr for Command {
    type Err = FilterCtlError;

    /// Parse a body as typed at the console. Known commands are validated,
    /// anything else is passed through as [`Command::Raw`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim();

        if body == "iden?" {
            return Ok(Command::Identify);
        }
        if body == "powerup" {
            return Ok(Command::PowerUp);
        }
        if body == "get-power" {
            return Ok(Command::GetPower);
        }
        if let Some(band) = body.strip_prefix("get-wl?") {
            return Ok(Command::GetWavelength(band.parse()?));
        }
        if let Some(band) = body.strip_prefix("get-interval?") {
            return Ok(Command::GetInterval(band.parse()?));
        }
        if let Some(args) = body.strip_prefix("set-wl:") {
            let fields: Vec<&str> = args.split(':').collect();
            if let [band, nm] = fields.as_slice() {
                return Command::set_wavelength(band.parse()?, parse_number("wavelength", nm)?);
            }
            return Err(FilterCtlError::InvalidInput(
                "Expected set-wl:<band>:<nm>".to_string(),
            ));
        }
        if let Some(args) = body.strip_prefix("sweep:") {
            let fields: Vec<&str> = args.split(':').collect();
            if let [band, min, max, step, interval] = fields.as_slice() {
                return Command::sweep(SweepParams {
                    band: band.parse()?,
                    min_nm: parse_number("sweep start", min)?,
                    max_nm: parse_number("sweep end", max)?,
                    step_nm: parse_number("sweep step", step)?,
                    interval_ms: interval.trim().parse().map_err(|_| {
                        FilterCtlError::InvalidInput(format!("Invalid sweep interval '{}'", interval))
                    })?,
                });
            }
            return Err(FilterCtlError::InvalidInput(
                "Expected sweep:<band>:<min>:<max>:<step>:<interval_ms>".to_string(),
            ));
        }

        Command::raw(body)
    }
}

fn check_wavelength(what: &str, nm: f64) -> FilterCtlResult<()> {
    if WAVELENGTH_RANGE_NM.contains(&nm) {
        Ok(())
    } else {
        Err(FilterCtlError::InvalidInput(format!(
            "{} {} nm outside {}..={} nm",
            what,
            nm,
            WAVELENGTH_RANGE_NM.start(),
            WAVELENGTH_RANGE_NM.end()
        )))
    }
}

fn parse_number(what: &str, text: &str) -> FilterCtlResult<f64> {
    text.trim()
        .parse()
        .map_err(|_| FilterCtlError::InvalidInput(format!("Invalid {} '{}'", what, text)))
}

/// Round to the 0.001 nm resolution used on the wire
pub fn round_nm(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Render a wavelength with at most three decimals, keeping at least one.
pub fn format_nm(value: f64) -> String {
    let mut text = format!("{:.3}", round_nm(value));
    while text.ends_with('0') && !text.ends_with(".0") {
        text.pop();
    }
    text
}
