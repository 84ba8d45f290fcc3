// FilterCtl - Tunable Optical Filter Control Tool
use clap::Parser;
use filterctl::cli::{execute_command, Args};
use filterctl::FilterCtlError;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match execute_command(args).await {
        Ok(()) => {}
        // The response has already been printed
        Err(FilterCtlError::Rejected(_)) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
