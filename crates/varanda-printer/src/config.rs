//! # Listener Configuration
//!
//! Read from the environment (a `.env` next to the binary is loaded first by
//! the binaries).
//!
//! | Variable             | Default       | Meaning                              |
//! |----------------------|---------------|--------------------------------------|
//! | `VARANDA_DB_PATH`    | `varanda.db`  | SQLite file holding `fila_impressao` |
//! | `PRINTER_INTERFACE`  | `printer`     | `tcp://host:port`, device path, name |
//! | `PRINTER_TYPE`       | `EPSON`       | `EPSON` or `STAR`                    |
//! | `PRINTER_COPIES`     | `2`           | Copies of every ticket               |
//! | `PRINTER_WIDTH`      | `48`          | Columns (32 for 58 mm paper)         |
//! | `PRINTER_POLL_MS`    | `1000`        | Queue polling interval               |
//! | `PRINTER_TIMEOUT_MS` | unset         | Per-attempt limit; unset or 0 = none |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigError;
use crate::escpos::PrinterType;
use crate::strategy::PrinterInterface;

pub const DEFAULT_INTERFACE: &str = "printer";
pub const DEFAULT_COPIES: u32 = 2;
pub const DEFAULT_WIDTH: usize = 48;
pub const DEFAULT_POLL_MS: u64 = 1000;

/// Printer listener settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    pub db_path: PathBuf,
    pub interface: PrinterInterface,
    pub printer_type: PrinterType,
    pub copies: u32,
    pub width: usize,
    pub poll_interval: Duration,
    pub attempt_timeout: Option<Duration>,
    /// Jobs fetched per poll; they are still printed one at a time.
    pub batch_size: u32,
}

impl ListenerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = get(varanda_db::pool::DB_PATH_ENV)
            .unwrap_or_else(|| varanda_db::pool::DEFAULT_DB_PATH.to_string());
        let interface =
            PrinterInterface::parse(&get("PRINTER_INTERFACE").unwrap_or_else(|| DEFAULT_INTERFACE.to_string()))?;
        let printer_type = match get("PRINTER_TYPE") {
            Some(raw) => raw.parse()?,
            None => PrinterType::default(),
        };

        let copies: u32 = parse_var(&get, "PRINTER_COPIES", DEFAULT_COPIES)?;
        if copies == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PRINTER_COPIES",
                value: "0".to_string(),
                reason: "at least one copy".to_string(),
            });
        }
        let width: usize = parse_var(&get, "PRINTER_WIDTH", DEFAULT_WIDTH)?;
        let poll_ms: u64 = parse_var(&get, "PRINTER_POLL_MS", DEFAULT_POLL_MS)?;
        let timeout_ms: u64 = parse_var(&get, "PRINTER_TIMEOUT_MS", 0)?;

        let config = ListenerConfig {
            db_path: PathBuf::from(db_path),
            interface,
            printer_type,
            copies,
            width,
            poll_interval: Duration::from_millis(poll_ms.max(100)),
            attempt_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            batch_size: 10,
        };
        debug!(?config, "Listener configuration loaded");
        Ok(config)
    }
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
