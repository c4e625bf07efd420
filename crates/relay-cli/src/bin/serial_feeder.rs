//! `serial-feeder` – forwards serial-monitor lines to a running relay.
//!
//! Reads newline-delimited records from `--input` (a serial device such as
//! `/dev/ttyACM0`, or any file) or from stdin, and sends each one as a
//! `from_serial_monitor` event. The relay URL comes from `--url` or from the
//! same config file and `--prod` switch the relay uses.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tokio::io::BufReader;
use tracing::{error, info};

use relay_cli::config::{self, ServerMode};
use relay_cli::telemetry;
use relay_server::SerialFeeder;
use relay_types::RelayError;

/// Forward serial-monitor output to the relay as `from_serial_monitor` events.
#[derive(Debug, Parser)]
#[command(name = "serial-feeder", version)]
struct Cli {
    /// Target the production relay address
    #[arg(long)]
    prod: bool,

    /// Config file [default: ~/.pong-relay/config.toml]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Relay WebSocket URL; overrides the configured address
    #[arg(long)]
    url: Option<String>,

    /// Serial device or file to read [default: stdin]
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = telemetry::init_tracing("serial-feeder");

    let url = match cli.url {
        Some(url) => url,
        None => {
            let cfg = config::load_or_default(cli.config.as_deref());
            let mut settings = cfg.server_settings(ServerMode::from_prod_flag(cli.prod));
            config::apply_env_overrides(&mut settings);
            settings.ws_url()
        }
    };

    let feeder = SerialFeeder::new(url);
    let result = match &cli.input {
        Some(path) => match tokio::fs::File::open(path).await {
            Ok(file) => {
                info!(input = %path.display(), url = %feeder.url(), "feeding serial input");
                feeder.run(BufReader::new(file)).await
            }
            Err(e) => Err(RelayError::Io(e)),
        },
        None => {
            info!(input = "stdin", url = %feeder.url(), "feeding serial input");
            feeder.run(BufReader::new(tokio::io::stdin())).await
        }
    };

    match result {
        Ok(sent) => {
            info!(sent, "feeder finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "feeder stopped");
            eprintln!("{}: {e}", "Error".red().bold());
            ExitCode::FAILURE
        }
    }
}
