use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments for FilterCtl
#[derive(Parser, Debug)]
#[command(
    name = "filterctl",
    version = env!("CARGO_PKG_VERSION"),
    about = "Control tool for dual-band tunable optical filters over a serial link",
    long_about = "Sends commands to a C/L band tunable optical filter controller over a serial port and reports the :ACK / :NACK responses."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports that can be opened
    Ports,
    /// Request device identification (iden?)
    Iden(ConnectionArgs),
    /// Query the current wavelength of a band (get-wl?)
    GetWl {
        /// Filter band
        #[arg(value_enum, ignore_case = true)]
        band: BandArg,
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Tune a band to a wavelength in nm (set-wl)
    SetWl {
        /// Filter band
        #[arg(value_enum, ignore_case = true)]
        band: BandArg,
        /// Target wavelength in nm
        wavelength: f64,
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Start a continuous wavelength sweep (sweep)
    Sweep {
        /// Filter band
        #[arg(value_enum, ignore_case = true)]
        band: BandArg,
        /// Start wavelength in nm
        #[arg(long, default_value = "1530.0")]
        min: f64,
        /// End wavelength in nm
        #[arg(long, default_value = "1565.0")]
        max: f64,
        /// Increment in nm
        #[arg(long, default_value = "0.5")]
        step: f64,
        /// Dwell time per step in ms
        #[arg(long, default_value = "500")]
        interval: u32,
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Query the tunable range of a band (get-interval?)
    GetInterval {
        /// Filter band
        #[arg(value_enum, ignore_case = true)]
        band: BandArg,
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Power up both filter channels (powerup)
    PowerUp(ConnectionArgs),
    /// Query the power mode of both channels (get-power)
    GetPower(ConnectionArgs),
    /// Send an arbitrary command body, e.g. "get-wl?C"
    Send {
        /// Command body without the leading ':'
        body: String,
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Interactive console: one command body per line
    Console(ConnectionArgs),
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Serial connection arguments
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Serial port path (defaults to the configured port)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate (defaults to the configured rate, 115200)
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Response timeout in milliseconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<PathBuf>,
    },
    /// Create default configuration
    Init {
        /// Directory to create the project configuration in
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Write the global configuration instead
        #[arg(short, long)]
        global: bool,
    },
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Filter band argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandArg {
    C,
    L,
}

impl From<BandArg> for crate::core::command::Band {
    fn from(band: BandArg) -> Self {
        match band {
            BandArg::C => Self::C,
            BandArg::L => Self::L,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
