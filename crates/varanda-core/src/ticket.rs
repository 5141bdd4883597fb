//! # Print Tickets
//!
//! Kitchen/bar tickets travel through the print queue as a JSON payload:
//!
//! ```json
//! { "nome": "Ana", "horario": "21:40", "mesa": 4,
//!   "itens": [ { "nome": "X-Burger", "quantidade": 2, "preco": 25.0, "total": 50.0 } ] }
//! ```
//!
//! Older producers used English keys (`product_name`, `quantity`,
//! `unitPrice`/`unit_price`, `totalPrice`/`total_price`); both are accepted,
//! and when an item carries several spellings the Portuguese one wins.
//! Numbers may arrive as strings (`"2"`, `"25,00"`).
//! Anything that is not a JSON object is printed as plain text.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::money::Money;
use crate::receipt::{center, columns, divider, truncate};
use crate::types::{Order, OrderItem};
use crate::units::format_decimal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct TicketItem {
    pub nome: String,
    pub quantidade: f64,
    /// Unit price in reais.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preco: Option<f64>,
    /// Line total in reais.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
}

/// First non-null value among `keys`, in order.
fn first<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `2`, `"2"`, `"25.00"` and `"25,00"` are all numbers.
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

impl From<Map<String, Value>> for TicketItem {
    fn from(fields: Map<String, Value>) -> Self {
        TicketItem {
            nome: first(&fields, &["nome", "product_name"])
                .map(text)
                .unwrap_or_default(),
            quantidade: first(&fields, &["quantidade", "quantity"])
                .and_then(number)
                .unwrap_or(1.0),
            preco: first(&fields, &["preco", "unitPrice", "unit_price"]).and_then(number),
            total: first(&fields, &["total", "totalPrice", "total_price"]).and_then(number),
            observacao: first(&fields, &["observacao", "notes"]).map(text),
        }
    }
}

/// Accepts `4`, `"4"` or null for fields the UI sends loosely typed.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintTicket {
    #[serde(
        alias = "customer_name",
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub nome: Option<String>,
    #[serde(
        alias = "time",
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub horario: Option<String>,
    #[serde(
        alias = "table_number",
        alias = "table",
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub mesa: Option<String>,
    #[serde(alias = "items", default)]
    pub itens: Vec<TicketItem>,
}

/// Decoded print-queue content.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketPayload {
    Ticket(PrintTicket),
    Text(String),
}

impl TicketPayload {
    /// Parses queue content: JSON ticket, JSON string, or raw text.
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();
        if trimmed.starts_with('{') {
            if let Ok(ticket) = serde_json::from_str::<PrintTicket>(trimmed) {
                return TicketPayload::Ticket(ticket);
            }
        } else if trimmed.starts_with('"') {
            if let Ok(text) = serde_json::from_str::<String>(trimmed) {
                return TicketPayload::Text(text);
            }
        }
        TicketPayload::Text(content.to_string())
    }

    /// Text to print at `width` columns.
    pub fn render(&self, width: usize) -> String {
        match self {
            TicketPayload::Ticket(ticket) => ticket.render(width),
            TicketPayload::Text(text) => text.clone(),
        }
    }
}

impl PrintTicket {
    /// Builds the kitchen ticket for a freshly created order.
    pub fn from_order(
        order: &Order,
        items: &[OrderItem],
        at: DateTime<Utc>,
        utc_offset_minutes: i32,
    ) -> Self {
        let horario = match FixedOffset::east_opt(utc_offset_minutes * 60) {
            Some(offset) => at.with_timezone(&offset).format("%H:%M").to_string(),
            None => at.format("%H:%M").to_string(),
        };
        PrintTicket {
            nome: order.customer_name.clone(),
            horario: Some(horario),
            mesa: order.table_number.clone(),
            itens: items
                .iter()
                .map(|item| TicketItem {
                    nome: item.product_name.clone(),
                    quantidade: item.quantity as f64,
                    preco: Some(item.unit_price_cents as f64 / 100.0),
                    total: Some(item.total_price_cents as f64 / 100.0),
                    observacao: item.notes.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Σ line totals; lines without a total use preço × quantidade.
    pub fn total(&self) -> Option<Money> {
        let mut any = false;
        let mut sum = Money::zero();
        for item in &self.itens {
            let line = match (item.total, item.preco) {
                (Some(total), _) => Money::from_reais_f64(total),
                (None, Some(preco)) => Money::from_reais_f64(preco * item.quantidade),
                (None, None) => continue,
            };
            any = true;
            sum += line;
        }
        any.then_some(sum)
    }

    pub fn render(&self, width: usize) -> String {
        let mut out: Vec<String> = Vec::new();
        out.push(center("PEDIDO", width));
        if let Some(mesa) = self.mesa.as_deref().filter(|m| !m.is_empty()) {
            out.push(center(&format!("MESA {}", mesa), width));
        }
        if let Some(nome) = self.nome.as_deref().filter(|n| !n.is_empty()) {
            out.push(truncate(&format!("Cliente: {}", nome), width));
        }
        if let Some(horario) = self.horario.as_deref() {
            out.push(truncate(&format!("Horário: {}", horario), width));
        }
        out.push(divider(width));

        for item in &self.itens {
            let label = format!("{}x {}", format_decimal(item.quantidade), item.nome);
            match item.total.or(item.preco.map(|p| p * item.quantidade)) {
                Some(total) => {
                    out.push(columns(&label, &Money::from_reais_f64(total).to_string(), width))
                }
                None => out.push(truncate(&label, width)),
            }
            if let Some(obs) = item.observacao.as_deref().filter(|o| !o.is_empty()) {
                out.push(truncate(&format!("  obs: {}", obs), width));
            }
        }

        if let Some(total) = self.total() {
            out.push(divider(width));
            out.push(columns("TOTAL:", &total.to_string(), width));
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_portuguese_payload() {
        let content = r#"{"nome":"Ana","horario":"21:40","mesa":4,
            "itens":[{"nome":"X-Burger","quantidade":2,"preco":25.0,"total":50.0}]}"#;
        let TicketPayload::Ticket(ticket) = TicketPayload::parse(content) else {
            panic!("expected structured ticket");
        };
        assert_eq!(ticket.mesa.as_deref(), Some("4"));
        assert_eq!(ticket.itens[0].quantidade, 2.0);
        assert_eq!(ticket.total().unwrap().cents(), 5000);
    }

    #[test]
    fn test_parse_english_aliases() {
        let content = r#"{"nome":"Bar","itens":[
            {"product_name":"Heineken","quantity":3,"unitPrice":12.5},
            {"product_name":"Água","quantity":1,"total_price":4}]}"#;
        let TicketPayload::Ticket(ticket) = TicketPayload::parse(content) else {
            panic!("expected structured ticket");
        };
        assert_eq!(ticket.itens[0].nome, "Heineken");
        assert_eq!(ticket.itens[0].preco, Some(12.5));
        assert_eq!(ticket.total().unwrap().cents(), 4150);
    }

    #[test]
    fn test_numbers_sent_as_strings() {
        let content = r#"{"mesa":"2","itens":[
            {"nome":"Caipirinha","quantidade":"2","preco":"25.00"},
            {"nome":"Pastel","quantidade":"1","total":"8,50"}]}"#;
        let TicketPayload::Ticket(ticket) = TicketPayload::parse(content) else {
            panic!("expected structured ticket");
        };
        assert_eq!(ticket.itens[0].quantidade, 2.0);
        assert_eq!(ticket.itens[0].preco, Some(25.0));
        assert_eq!(ticket.itens[1].total, Some(8.5));
        assert_eq!(ticket.total().unwrap().cents(), 5850);
    }

    #[test]
    fn test_portuguese_key_wins_over_alias() {
        let content = r#"{"itens":[
            {"nome":"Feijoada","product_name":"Feijoada completa","quantity":1,"quantidade":3,
             "notes":"capricha","observacao":"sem torresmo"}]}"#;
        let TicketPayload::Ticket(ticket) = TicketPayload::parse(content) else {
            panic!("expected structured ticket");
        };
        let item = &ticket.itens[0];
        assert_eq!(item.nome, "Feijoada");
        assert_eq!(item.quantidade, 3.0);
        assert_eq!(item.observacao.as_deref(), Some("sem torresmo"));
    }

    #[test]
    fn test_missing_or_garbled_quantity_means_one() {
        let content = r#"{"itens":[{"nome":"Café"},{"nome":"Pão","quantidade":"muitos"}]}"#;
        let TicketPayload::Ticket(ticket) = TicketPayload::parse(content) else {
            panic!("expected structured ticket");
        };
        assert_eq!(ticket.itens[0].quantidade, 1.0);
        assert_eq!(ticket.itens[1].quantidade, 1.0);
        assert!(ticket.total().is_none());
    }

    #[test]
    fn test_order_ticket_reads_back() {
        let ticket = PrintTicket {
            nome: Some("Ana".into()),
            horario: Some("21:40".into()),
            mesa: None,
            itens: vec![TicketItem {
                nome: "X-Burger".into(),
                quantidade: 2.0,
                preco: Some(25.0),
                total: Some(50.0),
                observacao: None,
            }],
        };
        let json = ticket.to_json().unwrap();
        assert_eq!(TicketPayload::parse(&json), TicketPayload::Ticket(ticket));
    }

    #[test]
    fn test_plain_text_and_json_string() {
        assert_eq!(
            TicketPayload::parse("Teste de impressão"),
            TicketPayload::Text("Teste de impressão".to_string())
        );
        assert_eq!(
            TicketPayload::parse("\"linha 1\\nlinha 2\""),
            TicketPayload::Text("linha 1\nlinha 2".to_string())
        );
        // malformed JSON is printed as-is
        assert!(matches!(TicketPayload::parse("{nope"), TicketPayload::Text(_)));
    }

    #[test]
    fn test_render_fits_width() {
        let ticket = PrintTicket {
            nome: Some("Mesa do fundo com nome bem comprido".into()),
            horario: Some("21:40".into()),
            mesa: Some("12".into()),
            itens: vec![TicketItem {
                nome: "Porção de batata frita com cheddar e bacon".into(),
                quantidade: 1.0,
                preco: Some(38.9),
                total: None,
                observacao: Some("sem cebola".into()),
            }],
        };
        let text = ticket.render(32);
        assert!(text.contains("MESA 12"));
        assert!(text.contains("obs: sem cebola"));
        for line in text.lines() {
            assert!(line.chars().count() <= 32, "{line:?}");
        }
        assert!(text.lines().any(|l| l.starts_with("TOTAL:") && l.ends_with("R$ 38,90")));
    }
}
