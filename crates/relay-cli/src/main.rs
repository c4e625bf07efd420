//! `pong-relay` – relay server entry point
//!
//! 1. Parses `--prod` / `--config`.
//! 2. Loads `~/.pong-relay/config.toml` (or the given file), falling back to
//!    defaults, and resolves the `local` or `prod` listen address.
//! 3. Serves the static pages and the WebSocket relay until Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing::{error, info, warn};

use relay_bus::Hub;
use relay_cli::config::{self, ServerMode};
use relay_cli::telemetry;
use relay_server::RelayServer;

/// Real-time relay between the Pong page and the serial monitor.
#[derive(Debug, Parser)]
#[command(name = "pong-relay", version)]
struct Cli {
    /// Switch to production mode
    #[arg(long)]
    prod: bool,

    /// Config file [default: ~/.pong-relay/config.toml]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Tracing comes up before the runtime; see telemetry::build_provider.
    let _guard = telemetry::init_tracing("pong-relay");

    print_banner();

    let cfg = config::load_or_default(cli.config.as_deref());
    let mode = ServerMode::from_prod_flag(cli.prod);
    let mut settings = cfg.server_settings(mode);
    config::apply_env_overrides(&mut settings);

    let routes = cfg.route_table();
    info!(%mode, addr = %settings.addr(), routes = routes.len(), "starting relay");

    let hub = Arc::new(Hub::new(routes));
    let server = RelayServer::new(hub)
        .with_host(settings.host.as_str())
        .with_port(settings.port)
        .with_session_queue(cfg.session_queue);

    println!(
        "  {} mode, serving on {}\n",
        mode.to_string().bold(),
        format!("http://{}", settings.addr()).cyan()
    );

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        tokio::select! {
            result = server.run() => result,
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                println!();
                println!("{}", "  Ctrl-C received, shutting down.".yellow());
                Ok(())
            }
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "relay stopped");
            eprintln!("{}: {e}", "Error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   ___  ___  _  _  ___   ___ ___ _      ___   __"#.bold().cyan());
    println!("{}", r#"  | _ \/ _ \| \| |/ __| | _ \ __| |    /_\ \ / /"#.bold().cyan());
    println!("{}", r#"  |  _/ (_) | .` | (_ | |   / _|| |__ / _ \ V / "#.bold().cyan());
    println!("{}", r#"  |_|  \___/|_|\_|\___| |_|_\___|____/_/ \_\_|  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "pong-relay".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!();
}
