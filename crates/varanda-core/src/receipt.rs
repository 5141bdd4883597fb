//! # Receipt Formatting
//!
//! Renders a [`Sale`] into fixed-width text for thermal printers.
//!
//! ## Layout (32 columns)
//! ```text
//! ┌────────────────────────────────┐
//! │            VARANDA             │
//! │        19/10/2026 21:40        │
//! │--------------------------------│
//! │2x Heineken 600ml               │
//! │  2 x R$ 10,00         R$ 20,00 │
//! │1x Porção de fritas             │
//! │  1 x R$ 5,00           R$ 5,00 │
//! │--------------------------------│
//! │Subtotal:              R$ 25,00 │
//! │TOTAL:                 R$ 25,00 │
//! │--------------------------------│
//! │PAGAMENTO                       │
//! │Dinheiro               R$ 30,00 │
//! │Troco:                  R$ 5,00 │
//! └────────────────────────────────┘
//! ```

use chrono::{DateTime, FixedOffset, Utc};

use crate::money::Money;
use crate::types::Sale;

/// Printable columns of the roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperWidth {
    /// 58 mm paper.
    #[default]
    Narrow,
    /// 80 mm paper.
    Wide,
}

impl PaperWidth {
    pub const fn columns(&self) -> usize {
        match self {
            PaperWidth::Narrow => 32,
            PaperWidth::Wide => 48,
        }
    }

    /// Maps a configured column count to the closest supported width.
    pub fn from_columns(columns: usize) -> Self {
        if columns >= 48 {
            PaperWidth::Wide
        } else {
            PaperWidth::Narrow
        }
    }
}

/// Business lines printed at the top of every receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptHeader {
    pub business_name: String,
    pub lines: Vec<String>,
    /// Local offset for printed timestamps (Brasília is -180).
    pub utc_offset_minutes: i32,
}

impl Default for ReceiptHeader {
    fn default() -> Self {
        ReceiptHeader {
            business_name: "VARANDA".to_string(),
            lines: Vec::new(),
            utc_offset_minutes: crate::DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

// =============================================================================
// Text helpers (shared with report and ticket)
// =============================================================================

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub(crate) fn center(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let pad = (width - char_len(&text)) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// `left` flush left, `right` flush right, at least one space between.
pub(crate) fn columns(left: &str, right: &str, width: usize) -> String {
    let right_len = char_len(right);
    let room = width.saturating_sub(right_len + 1);
    let left = truncate(left, room);
    let gap = width.saturating_sub(char_len(&left) + right_len).max(1);
    format!("{}{}{}", left, " ".repeat(gap), right)
}

pub(crate) fn divider(width: usize) -> String {
    "-".repeat(width)
}

pub(crate) fn local_time(at: DateTime<Utc>, offset_minutes: i32) -> String {
    const FORMAT: &str = "%d/%m/%Y %H:%M";
    match FixedOffset::east_opt(offset_minutes * 60) {
        Some(offset) => at.with_timezone(&offset).format(FORMAT).to_string(),
        None => at.format(FORMAT).to_string(),
    }
}

// =============================================================================
// Formatter
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptFormatter {
    width: PaperWidth,
}

impl ReceiptFormatter {
    pub fn new(width: PaperWidth) -> Self {
        ReceiptFormatter { width }
    }

    pub fn width(&self) -> usize {
        self.width.columns()
    }

    /// Renders a sale receipt. Lines are `\n` separated, no trailing feed.
    pub fn format_sale(&self, sale: &Sale, header: &ReceiptHeader) -> String {
        let w = self.width();
        let mut out: Vec<String> = Vec::new();

        out.push(center(&header.business_name, w));
        for line in &header.lines {
            out.push(center(line, w));
        }
        out.push(center(&local_time(sale.created_at, header.utc_offset_minutes), w));
        if let Some(name) = sale.customer_name.as_deref().filter(|n| !n.trim().is_empty()) {
            out.push(center(&format!("Cliente: {}", name), w));
        }
        out.push(divider(w));

        for item in &sale.items {
            out.push(truncate(
                &format!("{}x {}", item.quantity, item.product_name),
                w,
            ));
            out.push(columns(
                &format!("  {} x {}", item.quantity, item.unit_price()),
                &item.total_price().to_string(),
                w,
            ));
            if let (Some(original), Some(discount)) =
                (item.original_price_cents, item.discount_value_cents)
            {
                if discount > 0 {
                    out.push(truncate(
                        &format!(
                            "  de {}, desc. {}",
                            Money::from_cents(original),
                            Money::from_cents(discount)
                        ),
                        w,
                    ));
                }
            }
        }
        out.push(divider(w));

        // The stored subtotal is net of line discounts; print it gross so
        // that subtotal - desconto + taxa = total.
        let line_discounts: Money = sale
            .items
            .iter()
            .map(|i| Money::from_cents(i.discount_value_cents.unwrap_or(0).max(0)))
            .sum();
        let discount = match sale.total_discount_cents {
            Some(_) => sale.display_discount(),
            None => sale.display_discount() + line_discounts,
        };
        out.push(columns("Subtotal:", &(sale.subtotal() + line_discounts).to_string(), w));
        if discount.is_positive() {
            out.push(columns("Desconto:", &format!("-{}", discount), w));
        }
        if sale.tax().is_positive() {
            out.push(columns("Taxa de serviço:", &sale.tax().to_string(), w));
        }
        out.push(columns("TOTAL:", &sale.total().to_string(), w));

        if !sale.payments.is_empty() {
            out.push(divider(w));
            out.push("PAGAMENTO".to_string());
            for payment in &sale.payments {
                out.push(columns(payment.method.label(), &payment.amount().to_string(), w));
            }
            let change = sale.change();
            if change.is_positive() {
                out.push(columns("Troco:", &change.to_string(), w));
            }
        }

        out.push(divider(w));
        out.push(center("Obrigado pela preferência!", w));
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Payment, PaymentMethod, ProductType, SaleItem};
    use chrono::TimeZone;

    fn item(name: &str, qty: i64, unit: i64, original: Option<i64>) -> SaleItem {
        SaleItem {
            product_type: ProductType::ExternalProduct,
            product_id: name.to_lowercase(),
            product_name: name.to_string(),
            quantity: qty,
            unit_price_cents: unit,
            total_price_cents: unit * qty,
            original_price_cents: original,
            discount_value_cents: original.map(|o| (o - unit) * qty),
        }
    }

    fn sale() -> Sale {
        let at = Utc.with_ymd_and_hms(2026, 10, 20, 0, 40, 0).unwrap();
        Sale {
            id: "s1".into(),
            owner_id: "o".into(),
            cash_register_id: "r".into(),
            order_id: Some("ord".into()),
            customer_name: Some("Mesa 4".into()),
            items: vec![
                item("Heineken 600ml", 2, 1000, Some(1200)),
                item("Porção de fritas", 1, 500, None),
            ],
            payments: vec![Payment::new(PaymentMethod::Cash, Money::from_cents(3000))],
            subtotal_cents: 2500,
            tax_cents: 0,
            total_discount_cents: Some(400),
            total_cents: 2500,
            total_cost_cents: 1200,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_every_line_fits_the_roll() {
        for width in [PaperWidth::Narrow, PaperWidth::Wide] {
            let text = ReceiptFormatter::new(width).format_sale(&sale(), &ReceiptHeader::default());
            for line in text.lines() {
                assert!(char_len(line) <= width.columns(), "too wide: {line:?}");
            }
        }
    }

    #[test]
    fn test_receipt_contents() {
        let text = ReceiptFormatter::new(PaperWidth::Narrow)
            .format_sale(&sale(), &ReceiptHeader::default());
        assert!(text.contains("19/10/2026 21:40"));
        assert!(text.contains("2x Heineken 600ml"));
        assert!(text.contains("  de R$ 12,00, desc. R$ 4,00"));
        assert!(text.lines().any(|l| l.starts_with("Subtotal:") && l.ends_with("R$ 29,00")));
        assert!(text.lines().any(|l| l.starts_with("TOTAL:") && l.ends_with("R$ 25,00")));
        assert!(text.lines().any(|l| l.starts_with("Desconto:") && l.ends_with("-R$ 4,00")));
        assert!(text.lines().any(|l| l.starts_with("Troco:") && l.ends_with("R$ 5,00")));
    }

    #[test]
    fn test_totals_add_up_with_line_and_manual_discounts() {
        let mut sale = sale();
        // R$ 4,00 off the beers plus R$ 1,00 off the bill
        sale.total_discount_cents = Some(500);
        sale.total_cents = 2400;
        sale.payments = vec![Payment::new(PaymentMethod::Pix, Money::from_cents(2400))];

        let text = ReceiptFormatter::new(PaperWidth::Wide).format_sale(&sale, &ReceiptHeader::default());
        assert!(text.lines().any(|l| l.starts_with("Subtotal:") && l.ends_with("R$ 29,00")));
        assert!(text.lines().any(|l| l.starts_with("Desconto:") && l.ends_with("-R$ 5,00")));
        assert!(text.lines().any(|l| l.starts_with("TOTAL:") && l.ends_with("R$ 24,00")));

        sale.total_discount_cents = None;
        let legacy = ReceiptFormatter::new(PaperWidth::Wide).format_sale(&sale, &ReceiptHeader::default());
        assert!(legacy.lines().any(|l| l.starts_with("Subtotal:") && l.ends_with("R$ 29,00")));
        assert!(legacy.lines().any(|l| l.starts_with("Desconto:") && l.ends_with("-R$ 5,00")));
    }

    #[test]
    fn test_columns_right_aligns() {
        assert_eq!(columns("Subtotal:", "R$ 1,00", 20), "Subtotal:    R$ 1,00");
        assert_eq!(char_len(&columns(&"x".repeat(40), "R$ 1,00", 20)), 20);
    }

    #[test]
    fn test_center() {
        assert_eq!(center("ab", 6), "  ab");
    }
}
