//! # Test Print
//!
//! Sends one sample kitchen ticket through the fallback chain and reports
//! which strategy worked.
//!
//! ```bash
//! cargo run -p varanda-printer --bin test-print -- "EPSON TM-T20"
//! cargo run -p varanda-printer --bin test-print -- tcp://192.168.0.50:9100 --copies 2
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use varanda_core::ticket::{PrintTicket, TicketItem};
use varanda_printer::escpos::ticket_bytes;
use varanda_printer::{FallbackChain, PrinterInterface, PrinterType};

#[derive(Parser, Debug)]
#[command(name = "test-print", about = "Print a sample ticket")]
struct Args {
    /// Printer name, device path or tcp://host:port
    printer: String,

    /// EPSON or STAR
    #[arg(short = 't', long, default_value = "EPSON")]
    printer_type: PrinterType,

    /// Columns per line
    #[arg(short, long, default_value_t = 48)]
    width: usize,

    #[arg(short, long, default_value_t = 1)]
    copies: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let interface = PrinterInterface::parse(&args.printer).context("printer argument")?;
    let chain = FallbackChain::for_interface(&interface, None);
    info!(printer = %args.printer, strategies = ?chain.names(), "Test print");

    let text = sample_ticket().render(args.width);
    let bytes = ticket_bytes(args.printer_type, args.width, &text);

    for copy in 1..=args.copies {
        let strategy = chain
            .print(&bytes, &text)
            .await
            .with_context(|| format!("copy {copy}"))?;
        info!(copy, strategy, "Printed");
    }
    Ok(())
}

fn sample_ticket() -> PrintTicket {
    PrintTicket {
        nome: Some("Teste de impressão".to_string()),
        horario: None,
        mesa: Some("0".to_string()),
        itens: vec![
            TicketItem {
                nome: "Pão de queijo".to_string(),
                quantidade: 2.0,
                preco: Some(6.5),
                total: Some(13.0),
                observacao: None,
            },
            TicketItem {
                nome: "Feijão tropeiro".to_string(),
                quantidade: 1.0,
                preco: None,
                total: None,
                observacao: Some("sem cebola".to_string()),
            },
        ],
    }
}
