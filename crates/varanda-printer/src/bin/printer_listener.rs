//! # Printer Listener
//!
//! Long-running process next to the printer: drains `fila_impressao` until
//! Ctrl-C.
//!
//! ## Usage
//! ```bash
//! # .env
//! VARANDA_DB_PATH=C:\varanda\varanda.db
//! PRINTER_INTERFACE=tcp://192.168.0.50:9100
//! PRINTER_TYPE=EPSON
//!
//! cargo run -p varanda-printer --bin printer-listener
//! ```

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use varanda_db::{Database, DbConfig};
use varanda_printer::{FallbackChain, JobSettings, ListenerConfig, PrintListener};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match ListenerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid printer configuration");
            return ExitCode::FAILURE;
        }
    };

    let db = match Database::new(DbConfig::new(&config.db_path)).await {
        Ok(db) => db,
        Err(e) => {
            error!(path = %config.db_path.display(), error = %e, "Cannot open database");
            return ExitCode::FAILURE;
        }
    };

    let chain = FallbackChain::for_interface(&config.interface, config.attempt_timeout);
    info!(
        db = %config.db_path.display(),
        interface = ?config.interface,
        printer_type = ?config.printer_type,
        "Varanda printer listener"
    );

    let (listener, handle) = PrintListener::new(db.print_queue(), chain, JobSettings::from(&config));
    let task = tokio::spawn(listener.run());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl-C");
    }
    handle.shutdown().await;
    if let Err(e) = task.await {
        error!(error = %e, "Listener task panicked");
    }

    db.close().await;
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,varanda_printer=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
