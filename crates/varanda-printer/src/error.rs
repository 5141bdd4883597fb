//! # Printer Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ConfigError          bad PRINTER_* environment, raised at startup      │
//! │                                                                         │
//! │  PrintError           one strategy failed                               │
//! │    Connection / Io / Timeout / Command / Unsupported                    │
//! │       │                                                                 │
//! │       ▼  collected by FallbackChain                                     │
//! │  PrintError::AllStrategiesFailed(Vec<(strategy, cause)>)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  print job marked 'erro' with the rendered message                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type for printer operations.
pub type PrintResult<T> = Result<T, PrintError>;

/// Printer failures.
#[derive(Debug, Error)]
pub enum PrintError {
    /// Could not reach a network printer.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Writing to the printer or a spool file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The attempt exceeded its time limit.
    #[error("Timeout after {0} ms")]
    Timeout(u64),

    /// An OS print command ran but reported failure.
    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    /// The strategy does not apply on this platform or interface.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// The chain had no strategy to try.
    #[error("No print strategy configured")]
    EmptyChain,

    /// Every strategy in the chain failed.
    #[error("All print strategies failed: {}", summarize(.0))]
    AllStrategiesFailed(Vec<(String, PrintError)>),
}

fn summarize(causes: &[(String, PrintError)]) -> String {
    causes
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Invalid listener configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid PRINTER_TYPE '{0}' (expected EPSON or STAR)")]
    InvalidPrinterType(String),

    #[error("Invalid {var} '{value}': {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid printer interface '{0}'")]
    InvalidInterface(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_lists_every_cause() {
        let err = PrintError::AllStrategiesFailed(vec![
            ("rede".to_string(), PrintError::Timeout(3000)),
            ("powershell".to_string(), PrintError::Unsupported("windows only".to_string())),
        ]);
        let message = err.to_string();
        assert!(message.contains("rede: Timeout after 3000 ms"));
        assert!(message.contains("powershell: Not supported: windows only"));
    }
}
