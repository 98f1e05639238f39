// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dispatchd — the dispatch control plane daemon.
//!
//! Background process that owns the warm pool, the request/event paths, and
//! the sweeper/reaper maintenance loops. HTTP framing is out of scope
//! (§1); an external HTTP layer embeds [`dispatch_daemon::Operations`].

use dispatch_daemon::{DispatchdConfig, Dispatchd};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("dispatchd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("dispatchd {}", env!("CARGO_PKG_VERSION"));
                println!("Dispatch control plane daemon");
                println!();
                println!("USAGE:");
                println!("    dispatchd");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: dispatchd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    setup_logging();

    let config = DispatchdConfig::from_env();
    info!(state_dir = %config.state_dir.display(), "starting dispatchd");

    let dispatchd = match Dispatchd::bootstrap(config).await {
        Ok(d) => d,
        Err(e) => {
            error!(error = %e, "failed to start dispatchd");
            return Err(Box::new(e) as Box<dyn std::error::Error>);
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("dispatchd ready");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    dispatchd.shutdown().await;
    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}
