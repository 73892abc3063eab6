//! duplexify - Merge duplex-scanned PDF pages dropped into a watched directory.
//!
//! Runs until interrupted with Ctrl-C or SIGTERM.

mod cli;

use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::Cli;
use duplexify::error::DuplexifyError;
use duplexify::{Service, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init(logging::level_for(cli.verbose, cli.quiet));

    if let Err(err) = run(cli).await {
        error!(error = %err, "Exiting");
        process::exit(err.exit_code());
    }
}

/// Main application logic.
async fn run(cli: Cli) -> Result<(), DuplexifyError> {
    let mut config = cli.to_config()?;
    config.prepare_directories()?;
    config.log_overrides();

    info!("{} v{}", duplexify::NAME, duplexify::VERSION);

    let token = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(token.clone()));

    Service::from_config(config).run(token).await
}

/// Cancel `token` on the first Ctrl-C or SIGTERM.
async fn shutdown_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
                    _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
                    _ = token.cancelled() => return,
                }
            }
            Err(err) => {
                warn!(error = %err, "Cannot listen for SIGTERM");
                wait_for_ctrl_c(&token).await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c(&token).await;

    token.cancel();
}

async fn wait_for_ctrl_c(token: &CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(err) => warn!(error = %err, "Cannot listen for Ctrl-C"),
        },
        _ = token.cancelled() => {}
    }
}
