use crate::cli::args::{Args, Command, ConfigCommand, ConnectionArgs};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::command::{Band, Command as DeviceCommand, SweepParams};
use crate::core::controller::Controller;
use crate::core::ports::list_ports;
use crate::core::session::SessionEvent;
use crate::domain::config::FilterCtlConfig;
use crate::domain::error::{FilterCtlError, FilterCtlResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::SerialOpener;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// Resolved connection target for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub port: String,
    pub baud_rate: u32,
    pub response_timeout: Duration,
}

/// Execute CLI command
pub async fn execute_command(args: Args) -> FilterCtlResult<()> {
    let writer = ConsoleWriter::new(args.output);

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path)?
    } else {
        config_manager.load_config()?
    };

    // Initialize logging
    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose)?;
    }

    match args.command {
        Command::Ports => {
            let ports = list_ports(&SerialOpener::new())?;
            writer.write_ports(&ports)?;
            Ok(())
        }
        Command::Iden(connection) => {
            run_request(DeviceCommand::Identify, &connection, &config, &writer).await
        }
        Command::GetWl { band, connection } => {
            run_request(DeviceCommand::GetWavelength(band.into()), &connection, &config, &writer).await
        }
        Command::SetWl { band, wavelength, connection } => {
            let command = DeviceCommand::set_wavelength(band.into(), wavelength)?;
            run_request(command, &connection, &config, &writer).await
        }
        Command::Sweep { band, min, max, step, interval, connection } => {
            let command = DeviceCommand::sweep(SweepParams {
                band: Band::from(band),
                min_nm: min,
                max_nm: max,
                step_nm: step,
                interval_ms: interval,
            })?;
            run_request(command, &connection, &config, &writer).await
        }
        Command::GetInterval { band, connection } => {
            run_request(DeviceCommand::GetInterval(band.into()), &connection, &config, &writer).await
        }
        Command::PowerUp(connection) => {
            run_request(DeviceCommand::PowerUp, &connection, &config, &writer).await
        }
        Command::GetPower(connection) => {
            run_request(DeviceCommand::GetPower, &connection, &config, &writer).await
        }
        Command::Send { body, connection } => {
            run_request(DeviceCommand::raw(body)?, &connection, &config, &writer).await
        }
        Command::Console(connection) => run_console(&connection, &config, &writer).await,
        Command::Config(config_args) => {
            execute_config_command(config_args.command, &writer, &config, &config_manager)
        }
        Command::Version => {
            writer.write_message(&format!("filterctl {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Merge command-line connection flags over the configured defaults
pub fn resolve_target(args: &ConnectionArgs, config: &FilterCtlConfig) -> FilterCtlResult<Target> {
    let port = args
        .port
        .clone()
        .or_else(|| config.device.port.clone())
        .ok_or_else(|| {
            FilterCtlError::InvalidInput(
                "No serial port given; pass --port or set device.port in the configuration".to_string(),
            )
        })?;

    Ok(Target {
        port,
        baud_rate: args.baud.unwrap_or(config.device.baud_rate),
        response_timeout: args
            .timeout
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.global.response_timeout()),
    })
}

fn connect(target: &Target, config: &FilterCtlConfig) -> FilterCtlResult<Controller> {
    let mut controller = Controller::new(Arc::new(SerialOpener::new()), config.device.read_timeout());
    controller.connect(&target.port, target.baud_rate)?;
    Ok(controller)
}

/// Connect, issue one command, report its response and disconnect
async fn run_request(
    command: DeviceCommand,
    connection: &ConnectionArgs,
    config: &FilterCtlConfig,
    writer: &ConsoleWriter,
) -> FilterCtlResult<()> {
    let target = resolve_target(connection, config)?;
    let mut controller = connect(&target, config)?;

    let body = command.body();
    info!("Sending {} to {}", body, target.port);
    let result = controller.request(&command, target.response_timeout).await;
    controller.close().await;

    let response = result?;
    writer.write_response(&body, &response)?;
    if response.is_ack() {
        Ok(())
    } else {
        Err(FilterCtlError::Rejected(response.payload().to_string()))
    }
}

/// Interactive session: stdin lines become commands, responses are printed
/// as they arrive
async fn run_console(
    connection: &ConnectionArgs,
    config: &FilterCtlConfig,
    writer: &ConsoleWriter,
) -> FilterCtlResult<()> {
    let target = resolve_target(connection, config)?;
    let mut controller = connect(&target, config)?;
    writer.write_message(&format!(
        "Connected to {} at {} baud. Enter command bodies (e.g. iden?), 'quit' to exit.",
        target.port, target.baud_rate
    ))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_sent = String::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(text) = line? else { break };
                let input = text.trim();
                if input.is_empty() {
                    continue;
                }
                if matches!(input, "quit" | "exit") {
                    break;
                }
                match input.parse::<DeviceCommand>().and_then(|command| {
                    controller.send(&command)?;
                    Ok(command)
                }) {
                    Ok(command) => last_sent = command.body(),
                    Err(e) => writer.write_error(&e.to_string())?,
                }
            }
            event = controller.next_event() => match event {
                Some(SessionEvent::Response(response)) => writer.write_response(&last_sent, &response)?,
                Some(SessionEvent::Fault(error)) => writer.write_error(&error.to_string())?,
                Some(SessionEvent::Closed) | None => {
                    writer.write_message("Port closed")?;
                    return Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        }
    }

    controller.close().await;
    writer.write_message("Disconnected")?;
    Ok(())
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &FilterCtlConfig,
    config_manager: &ConfigManager,
) -> FilterCtlResult<()> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            let result = match &file {
                Some(path) => config_manager.load_config_from_path(path),
                None => config_manager.load_config(),
            };
            match result {
                Ok(_) => {
                    let what = file
                        .map(|p| format!("Configuration file '{}'", p.display()))
                        .unwrap_or_else(|| "Current configuration".to_string());
                    writer.write_message(&format!("{} is valid", what))?;
                    Ok(())
                }
                Err(e) => {
                    writer.write_error(&format!("Configuration validation failed: {}", e))?;
                    Err(e)
                }
            }
        }
        ConfigCommand::Init { dir, global } => {
            if global {
                let global_path = config_manager.get_global_config_path_ref();
                config_manager.save_config_to_path(global_path, &FilterCtlConfig::default())?;
                writer.write_message(&format!(
                    "Global configuration initialized at '{}'",
                    global_path.display()
                ))?;
            } else {
                let base = match dir {
                    Some(dir) => dir,
                    None => std::env::current_dir().map_err(|e| FilterCtlError::Config {
                        message: format!("Failed to get current directory: {}", e),
                    })?,
                };
                let written = config_manager.init_project_config(&base)?;
                writer.write_message(&format!(
                    "Project configuration initialized at '{}'",
                    written.display()
                ))?;
            }
            Ok(())
        }
    }
}
