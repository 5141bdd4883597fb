//! # Print Strategies
//!
//! Each way of reaching the printer is a [`PrintStrategy`]. A
//! [`FallbackChain`] tries them in order and stops at the first success.
//!
//! ## Chains per Interface
//! ```text
//! PRINTER_INTERFACE          chain
//! ─────────────────────────  ──────────────────────────────────────────────
//! tcp://10.0.0.50:9100   ──► NetworkStrategy (raw ESC/POS)
//! /dev/usb/lp0, COM3     ──► DeviceFileStrategy (raw ESC/POS)
//! printer:Cozinha, Bar   ──► PowerShellStrategy (Out-Printer)
//!                              └► PrintExeStrategy (print /D:)
//!                                   └► NotepadStrategy (notepad /p)
//! ```
//!
//! Raw strategies send the ESC/POS bytes; OS strategies spool the plain text
//! through a Windows-1252 temp file and are Windows-only.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, PrintError, PrintResult};
use crate::escpos::encode_cp1252;

/// Default raw printing port.
pub const DEFAULT_PORT: u16 = 9100;

// =============================================================================
// Interface
// =============================================================================

/// Where the printer lives, parsed from `PRINTER_INTERFACE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterInterface {
    /// `tcp://host[:port]`
    Network { host: String, port: u16 },
    /// A device path written to directly.
    Device(PathBuf),
    /// An OS printer name (`printer:Name` or the bare name).
    Named(String),
}

impl PrinterInterface {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::InvalidInterface(raw.to_string()));
        }

        if let Some(rest) = raw.strip_prefix("tcp://") {
            let (host, port) = match rest.rsplit_once(':') {
                Some((host, port)) => {
                    let port = port
                        .parse::<u16>()
                        .map_err(|_| ConfigError::InvalidInterface(raw.to_string()))?;
                    (host, port)
                }
                None => (rest, DEFAULT_PORT),
            };
            if host.is_empty() {
                return Err(ConfigError::InvalidInterface(raw.to_string()));
            }
            return Ok(PrinterInterface::Network {
                host: host.to_string(),
                port,
            });
        }

        if let Some(name) = raw.strip_prefix("printer:") {
            return Ok(PrinterInterface::Named(name.to_string()));
        }

        let upper = raw.to_ascii_uppercase();
        let is_port = ["COM", "LPT"]
            .iter()
            .any(|p| {
                upper.len() > p.len()
                    && upper.starts_with(p)
                    && upper[p.len()..].chars().all(|c| c.is_ascii_digit())
            });
        if raw.starts_with('/') || raw.starts_with(r"\\") || is_port {
            return Ok(PrinterInterface::Device(PathBuf::from(raw)));
        }

        Ok(PrinterInterface::Named(raw.to_string()))
    }
}

// =============================================================================
// Strategy Trait
// =============================================================================

/// One way of delivering a job to the printer.
#[async_trait]
pub trait PrintStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// `bytes` is the ESC/POS job, `text` the same ticket as plain text.
    async fn attempt(&self, bytes: &[u8], text: &str) -> PrintResult<()>;
}

/// Raw ESC/POS over TCP.
#[derive(Debug, Clone)]
pub struct NetworkStrategy {
    addr: String,
    timeout: Duration,
}

impl NetworkStrategy {
    pub fn new(host: &str, port: u16) -> Self {
        NetworkStrategy {
            addr: format!("{host}:{port}"),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PrintStrategy for NetworkStrategy {
    fn name(&self) -> &str {
        "rede"
    }

    async fn attempt(&self, bytes: &[u8], _text: &str) -> PrintResult<()> {
        debug!(addr = %self.addr, bytes = bytes.len(), "Connecting to printer");

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| PrintError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))?;

        stream.write_all(bytes).await?;
        stream.flush().await?;
        stream.shutdown().await?;
        Ok(())
    }
}

/// Raw ESC/POS written to a device path (USB/serial/parallel).
#[derive(Debug, Clone)]
pub struct DeviceFileStrategy {
    path: PathBuf,
}

impl DeviceFileStrategy {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DeviceFileStrategy { path: path.into() }
    }
}

#[async_trait]
impl PrintStrategy for DeviceFileStrategy {
    fn name(&self) -> &str {
        "dispositivo"
    }

    async fn attempt(&self, bytes: &[u8], _text: &str) -> PrintResult<()> {
        let mut device = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await?;
        device.write_all(bytes).await?;
        device.flush().await?;
        Ok(())
    }
}

// =============================================================================
// OS Print Commands
// =============================================================================

static SPOOL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Temp file holding the job text; removed on drop.
struct SpoolFile {
    path: PathBuf,
}

impl SpoolFile {
    async fn create(text: &str) -> PrintResult<Self> {
        let seq = SPOOL_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "varanda-print-{}-{}.txt",
            std::process::id(),
            seq
        ));
        // Windows print tools read the ANSI code page.
        let body = encode_cp1252(&text.replace('\n', "\r\n"));
        tokio::fs::write(&path, body).await?;
        Ok(SpoolFile { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SpoolFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "Spool file not removed");
        }
    }
}

fn require_windows(strategy: &str) -> PrintResult<()> {
    if cfg!(windows) {
        Ok(())
    } else {
        Err(PrintError::Unsupported(format!("{strategy} requer Windows")))
    }
}

async fn run(program: &str, args: &[&str]) -> PrintResult<()> {
    debug!(program, ?args, "Running print command");
    let output = Command::new(program).args(args).output().await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(PrintError::Command {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Single quotes doubled for a PowerShell literal.
fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `Get-Content file | Out-Printer -Name <printer>`
#[derive(Debug, Clone)]
pub struct PowerShellStrategy {
    printer: String,
}

impl PowerShellStrategy {
    pub fn new(printer: impl Into<String>) -> Self {
        PowerShellStrategy {
            printer: printer.into(),
        }
    }
}

#[async_trait]
impl PrintStrategy for PowerShellStrategy {
    fn name(&self) -> &str {
        "powershell"
    }

    async fn attempt(&self, _bytes: &[u8], text: &str) -> PrintResult<()> {
        require_windows(self.name())?;
        let spool = SpoolFile::create(text).await?;
        let script = format!(
            "Get-Content -Encoding Default -LiteralPath {} | Out-Printer -Name {}",
            ps_quote(&spool.path().to_string_lossy()),
            ps_quote(&self.printer)
        );
        run("powershell", &["-NoProfile", "-NonInteractive", "-Command", &script]).await
    }
}

/// `print /D:<printer> file`
#[derive(Debug, Clone)]
pub struct PrintExeStrategy {
    printer: String,
}

impl PrintExeStrategy {
    pub fn new(printer: impl Into<String>) -> Self {
        PrintExeStrategy {
            printer: printer.into(),
        }
    }
}

#[async_trait]
impl PrintStrategy for PrintExeStrategy {
    fn name(&self) -> &str {
        "print.exe"
    }

    async fn attempt(&self, _bytes: &[u8], text: &str) -> PrintResult<()> {
        require_windows(self.name())?;
        let spool = SpoolFile::create(text).await?;
        let device = format!("/D:{}", self.printer);
        let file = spool.path().to_string_lossy().into_owned();
        run("print", &[&device, &file]).await
    }
}

/// `notepad /p file` on the default printer. Last resort.
#[derive(Debug, Clone, Default)]
pub struct NotepadStrategy;

#[async_trait]
impl PrintStrategy for NotepadStrategy {
    fn name(&self) -> &str {
        "notepad"
    }

    async fn attempt(&self, _bytes: &[u8], text: &str) -> PrintResult<()> {
        require_windows(self.name())?;
        let spool = SpoolFile::create(text).await?;
        let file = spool.path().to_string_lossy().into_owned();
        run("notepad", &["/p", &file]).await
    }
}

// =============================================================================
// Fallback Chain
// =============================================================================

/// Ordered strategies; the first success wins.
#[derive(Default)]
pub struct FallbackChain {
    strategies: Vec<Box<dyn PrintStrategy>>,
    attempt_timeout: Option<Duration>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard chain for an interface.
    pub fn for_interface(interface: &PrinterInterface, attempt_timeout: Option<Duration>) -> Self {
        let chain = match interface {
            PrinterInterface::Network { host, port } => {
                let mut network = NetworkStrategy::new(host, *port);
                if let Some(t) = attempt_timeout {
                    network = network.with_timeout(t);
                }
                FallbackChain::new().with(network)
            }
            PrinterInterface::Device(path) => FallbackChain::new().with(DeviceFileStrategy::new(path)),
            PrinterInterface::Named(name) => FallbackChain::new()
                .with(PowerShellStrategy::new(name))
                .with(PrintExeStrategy::new(name))
                .with(NotepadStrategy),
        };
        chain.with_timeout(attempt_timeout)
    }

    pub fn with(mut self, strategy: impl PrintStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Tries each strategy in order; returns the name of the one that worked.
    pub async fn print(&self, bytes: &[u8], text: &str) -> PrintResult<&str> {
        if self.strategies.is_empty() {
            return Err(PrintError::EmptyChain);
        }

        let mut causes = Vec::new();
        for strategy in &self.strategies {
            let result = match self.attempt_timeout {
                Some(limit) => tokio::time::timeout(limit, strategy.attempt(bytes, text))
                    .await
                    .unwrap_or(Err(PrintError::Timeout(limit.as_millis() as u64))),
                None => strategy.attempt(bytes, text).await,
            };

            match result {
                Ok(()) => {
                    if !causes.is_empty() {
                        info!(strategy = strategy.name(), failed = causes.len(), "Printed via fallback");
                    }
                    return Ok(strategy.name());
                }
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "Print strategy failed");
                    causes.push((strategy.name().to_string(), err));
                }
            }
        }

        Err(PrintError::AllStrategiesFailed(causes))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    struct Failing(&'static str);

    #[async_trait]
    impl PrintStrategy for Failing {
        fn name(&self) -> &str {
            self.0
        }

        async fn attempt(&self, _bytes: &[u8], _text: &str) -> PrintResult<()> {
            Err(PrintError::Connection("offline".to_string()))
        }
    }

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl PrintStrategy for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn attempt(&self, _bytes: &[u8], text: &str) -> PrintResult<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Hanging;

    #[async_trait]
    impl PrintStrategy for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn attempt(&self, _bytes: &[u8], _text: &str) -> PrintResult<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[test]
    fn test_parse_interface() {
        assert_eq!(
            PrinterInterface::parse("tcp://192.168.0.50:9100").unwrap(),
            PrinterInterface::Network {
                host: "192.168.0.50".to_string(),
                port: 9100
            }
        );
        assert_eq!(
            PrinterInterface::parse("tcp://cozinha.local").unwrap(),
            PrinterInterface::Network {
                host: "cozinha.local".to_string(),
                port: DEFAULT_PORT
            }
        );
        assert_eq!(
            PrinterInterface::parse("/dev/usb/lp0").unwrap(),
            PrinterInterface::Device(PathBuf::from("/dev/usb/lp0"))
        );
        assert_eq!(
            PrinterInterface::parse("COM3").unwrap(),
            PrinterInterface::Device(PathBuf::from("COM3"))
        );
        assert_eq!(
            PrinterInterface::parse("printer:EPSON TM-T20").unwrap(),
            PrinterInterface::Named("EPSON TM-T20".to_string())
        );
        assert_eq!(
            PrinterInterface::parse("printer").unwrap(),
            PrinterInterface::Named("printer".to_string())
        );
        assert!(PrinterInterface::parse("tcp://host:porta").is_err());
        assert!(PrinterInterface::parse("  ").is_err());
    }

    #[test]
    fn test_named_chain_order() {
        let chain = FallbackChain::for_interface(&PrinterInterface::Named("Bar".to_string()), None);
        assert_eq!(chain.names(), vec!["powershell", "print.exe", "notepad"]);
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let recording = Recording::default();
        let after = Recording::default();
        let chain = FallbackChain::new()
            .with(Failing("primeira"))
            .with(recording.clone())
            .with(after.clone());

        let used = chain.print(b"\x1b@", "PEDIDO").await.unwrap();
        assert_eq!(used, "recording");
        assert_eq!(*recording.0.lock().unwrap(), vec!["PEDIDO".to_string()]);
        assert!(after.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_failures_are_reported() {
        let chain = FallbackChain::new().with(Failing("a")).with(Failing("b"));
        let err = chain.print(b"", "").await.unwrap_err();
        match err {
            PrintError::AllStrategiesFailed(causes) => {
                let names: Vec<_> = causes.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let empty = FallbackChain::new().print(b"", "").await.unwrap_err();
        assert!(matches!(empty, PrintError::EmptyChain));
    }

    #[tokio::test]
    async fn test_hung_strategy_times_out_and_falls_through() {
        let recording = Recording::default();
        let chain = FallbackChain::new()
            .with(Hanging)
            .with(recording.clone())
            .with_timeout(Some(Duration::from_millis(50)));

        assert_eq!(chain.print(b"", "x").await.unwrap(), "recording");
    }

    #[tokio::test]
    async fn test_network_strategy_sends_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        NetworkStrategy::new("127.0.0.1", port)
            .attempt(b"\x1b@P\xe3o\n", "Pão")
            .await
            .unwrap();

        assert_eq!(server.await.unwrap(), b"\x1b@P\xe3o\n".to_vec());
    }

    #[tokio::test]
    async fn test_os_strategies_need_windows() {
        if cfg!(windows) {
            return;
        }
        let err = NotepadStrategy.attempt(b"", "x").await.unwrap_err();
        assert!(matches!(err, PrintError::Unsupported(_)));
    }
}
