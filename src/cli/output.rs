use crate::cli::args::OutputFormat;
use crate::core::response::Response;
use crate::domain::config::FilterCtlConfig;
use serde_json::json;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_ports(&self, ports: &[String]) -> Result<(), OutputError>;
    fn write_response(&self, command: &str, response: &Response) -> Result<(), OutputError>;
    fn write_config(&self, config: &FilterCtlConfig) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::FilterCtlError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_ports(&self, ports: &[String]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    println!("No serial ports available");
                } else {
                    println!("Available serial ports:");
                    for port in ports {
                        println!("  {}", port);
                    }
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&json!({ "ports": ports }))?);
            }
            OutputFormat::Table => {
                let rows: Vec<PortTableRow> = ports
                    .iter()
                    .map(|port| PortTableRow { port: port.clone() })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }
        Ok(())
    }

    fn write_response(&self, command: &str, response: &Response) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => println!("{}", render_response_text(response)),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(&response_json(command, response))?);
            }
            OutputFormat::Table => {
                let row = ResponseTableRow::new(command, response);
                println!("{}", Table::new(vec![row]));
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &FilterCtlConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("FilterCtl Configuration:");
                println!("  Log level: {}", config.global.log_level);
                println!("  Response timeout: {}ms", config.global.response_timeout_ms);
                println!("  Port: {}", config.device.port.as_deref().unwrap_or("(not set)"));
                println!("  Baud rate: {}", config.device.baud_rate);
                println!("  Read timeout: {}ms", config.device.read_timeout_ms);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            OutputFormat::Table => {
                println!("{}", Table::new(config_rows(config)));
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

fn render_response_text(response: &Response) -> String {
    response.status_text()
}

fn response_json(command: &str, response: &Response) -> serde_json::Value {
    json!({
        "command": command,
        "status": if response.is_ack() { "ack" } else { "nack" },
        "payload": response.payload(),
        "line": response.line(),
    })
}

/// Table row for port listing
#[derive(Tabled)]
struct PortTableRow {
    port: String,
}

/// Table row for a command response
#[derive(Tabled)]
struct ResponseTableRow {
    command: String,
    status: String,
    payload: String,
}

impl ResponseTableRow {
    fn new(command: &str, response: &Response) -> Self {
        Self {
            command: command.to_string(),
            status: if response.is_ack() { "ACK" } else { "NACK" }.to_string(),
            payload: response.payload().to_string(),
        }
    }
}

/// Table row for configuration settings
#[derive(Tabled)]
struct ConfigTableRow {
    setting: String,
    value: String,
}

fn config_rows(config: &FilterCtlConfig) -> Vec<ConfigTableRow> {
    let row = |setting: &str, value: String| ConfigTableRow {
        setting: setting.to_string(),
        value,
    };
    vec![
        row("global.log_level", config.global.log_level.clone()),
        row("global.response_timeout_ms", config.global.response_timeout_ms.to_string()),
        row("device.port", config.device.port.clone().unwrap_or_default()),
        row("device.baud_rate", config.device.baud_rate.to_string()),
        row("device.read_timeout_ms", config.device.read_timeout_ms.to_string()),
    ]
}
