//! # varanda-printer: Print Queue Listener for Varanda POS
//!
//! Turns rows of `fila_impressao` into paper.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  varanda-db            fila_impressao (status 'pendente')               │
//! │       │                                                                 │
//! │       ▼  poll                                                           │
//! │  listener              one job at a time, PRINTER_COPIES copies         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  varanda-core::ticket  JSON ticket or raw text → fixed-width text       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  escpos                init, code page 1252, text, cut                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  strategy              FallbackChain                                    │
//! │                        ├── rede (tcp://host:9100)                       │
//! │                        ├── dispositivo (/dev/usb/lp0, COM1, LPT1)       │
//! │                        └── powershell → print.exe → notepad (Windows)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - `PRINTER_*` environment settings
//! - [`escpos`] - ESC/POS builder and Windows-1252 encoding
//! - [`strategy`] - Printer interfaces and the fallback chain
//! - [`listener`] - Queue polling loop
//! - [`error`] - Print and config errors

pub mod config;
pub mod error;
pub mod escpos;
pub mod listener;
pub mod strategy;

pub use config::ListenerConfig;
pub use error::{ConfigError, PrintError, PrintResult};
pub use escpos::{EscPosBuilder, PrinterType};
pub use listener::{JobSettings, ListenerHandle, PollSummary, PrintListener};
pub use strategy::{FallbackChain, PrintStrategy, PrinterInterface};
