//! # ESC/POS Builder
//!
//! Fluent byte builder for thermal printers. Text is encoded to Windows-1252
//! as it is written, so accented Portuguese ("Feijão", "Pão") prints without
//! mojibake; command bytes go in untouched.
//!
//! Epson and Star share most of the text path but differ in command syntax:
//!
//! | Command      | EPSON          | STAR           |
//! |--------------|----------------|----------------|
//! | code page    | `ESC t 16`     | `ESC GS t 32`  |
//! | align        | `ESC a n`      | `ESC GS a n`   |
//! | bold on/off  | `ESC E 1/0`    | `ESC E`/`ESC F`|
//! | double size  | `GS ! 0x11`    | `ESC i 1 1`    |
//! | feed + cut   | `GS V 66 n`    | `ESC d 3`      |

use std::str::FromStr;

use encoding_rs::WINDOWS_1252;

use crate::error::ConfigError;

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

/// Printer command dialect (`PRINTER_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrinterType {
    #[default]
    Epson,
    Star,
}

impl FromStr for PrinterType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EPSON" => Ok(PrinterType::Epson),
            "STAR" => Ok(PrinterType::Star),
            _ => Err(ConfigError::InvalidPrinterType(s.to_string())),
        }
    }
}

/// Text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn code(self) -> u8 {
        match self {
            Align::Left => 0,
            Align::Center => 1,
            Align::Right => 2,
        }
    }
}

/// Windows-1252 bytes of `s`; unmappable characters become `?`.
pub fn encode_cp1252(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        let mut tmp = [0u8; 4];
        let (bytes, _, had_errors) = WINDOWS_1252.encode(ch.encode_utf8(&mut tmp));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

/// ESC/POS command builder.
///
/// ## Example
/// ```ignore
/// let mut b = EscPosBuilder::new(PrinterType::Epson, 48);
/// b.align(Align::Center).bold(true).line("PEDIDO").bold(false);
/// b.align(Align::Left).text_block(&ticket.render(48));
/// b.cut();
/// printer.print(&b.build()).await?;
/// ```
pub struct EscPosBuilder {
    buf: Vec<u8>,
    kind: PrinterType,
    width: usize,
}

impl EscPosBuilder {
    /// Starts with printer init and the Windows-1252 code page.
    ///
    /// Widths: 32 columns on 58 mm paper, 48 on 80 mm.
    pub fn new(kind: PrinterType, width: usize) -> Self {
        let mut buf = Vec::with_capacity(2048);
        buf.extend_from_slice(&[ESC, 0x40]);
        match kind {
            PrinterType::Epson => buf.extend_from_slice(&[ESC, 0x74, 16]),
            PrinterType::Star => buf.extend_from_slice(&[ESC, GS, 0x74, 32]),
        }
        EscPosBuilder { buf, kind, width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    // === Text ===

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(&encode_cp1252(s));
        self
    }

    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Multi-line text as rendered by the ticket formatter.
    pub fn text_block(&mut self, block: &str) -> &mut Self {
        for l in block.lines() {
            self.line(l);
        }
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    pub fn separator(&mut self) -> &mut Self {
        let sep = "-".repeat(self.width);
        self.line(&sep)
    }

    // === Style ===

    pub fn align(&mut self, align: Align) -> &mut Self {
        match self.kind {
            PrinterType::Epson => self.buf.extend_from_slice(&[ESC, 0x61, align.code()]),
            PrinterType::Star => self.buf.extend_from_slice(&[ESC, GS, 0x61, align.code()]),
        }
        self
    }

    pub fn bold(&mut self, on: bool) -> &mut Self {
        match (self.kind, on) {
            (PrinterType::Epson, _) => self.buf.extend_from_slice(&[ESC, 0x45, on as u8]),
            (PrinterType::Star, true) => self.buf.extend_from_slice(&[ESC, 0x45]),
            (PrinterType::Star, false) => self.buf.extend_from_slice(&[ESC, 0x46]),
        }
        self
    }

    pub fn double_size(&mut self, on: bool) -> &mut Self {
        let n = on as u8;
        match self.kind {
            PrinterType::Epson => self.buf.extend_from_slice(&[GS, 0x21, n * 0x11]),
            PrinterType::Star => self.buf.extend_from_slice(&[ESC, 0x69, n, n]),
        }
        self
    }

    // === Paper ===

    /// Feeds past the cutter and cuts.
    pub fn cut(&mut self) -> &mut Self {
        match self.kind {
            PrinterType::Epson => self.buf.extend_from_slice(&[GS, 0x56, 0x42, 3]),
            PrinterType::Star => self.buf.extend_from_slice(&[ESC, 0x64, 3]),
        }
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// Full job bytes for one rendered ticket.
pub fn ticket_bytes(kind: PrinterType, width: usize, rendered: &str) -> Vec<u8> {
    let mut b = EscPosBuilder::new(kind, width);
    b.align(Align::Left).text_block(rendered).newline().cut();
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accents_use_cp1252() {
        assert_eq!(encode_cp1252("Pão"), vec![b'P', 0xE3, b'o']);
        assert_eq!(encode_cp1252("Feijão à moda"), b"Feij\xe3o \xe0 moda".to_vec());
        assert_eq!(encode_cp1252("R$ 10,99"), b"R$ 10,99".to_vec());
        // Not representable in 1252
        assert_eq!(encode_cp1252("🍺"), b"?".to_vec());
    }

    #[test]
    fn test_epson_and_star_dialects() {
        let mut epson = EscPosBuilder::new(PrinterType::Epson, 32);
        epson.bold(true).cut();
        let epson = epson.build();
        assert!(epson.starts_with(&[ESC, 0x40, ESC, 0x74, 16]));
        assert!(epson.ends_with(&[ESC, 0x45, 1, GS, 0x56, 0x42, 3]));

        let mut star = EscPosBuilder::new(PrinterType::Star, 32);
        star.bold(true).cut();
        let star = star.build();
        assert!(star.starts_with(&[ESC, 0x40, ESC, GS, 0x74, 32]));
        assert!(star.ends_with(&[ESC, 0x45, ESC, 0x64, 3]));
    }

    #[test]
    fn test_printer_type_parse() {
        assert_eq!("epson".parse::<PrinterType>().unwrap(), PrinterType::Epson);
        assert_eq!(" STAR ".parse::<PrinterType>().unwrap(), PrinterType::Star);
        assert!("zebra".parse::<PrinterType>().is_err());
    }

    #[test]
    fn test_ticket_bytes_keep_lines() {
        let bytes = ticket_bytes(PrinterType::Epson, 32, "PEDIDO\n1x Pão");
        let text: Vec<u8> = b"PEDIDO\n1x P\xe3o\n".to_vec();
        assert!(bytes.windows(text.len()).any(|w| w == text.as_slice()));
    }
}
