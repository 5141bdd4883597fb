//! # Cash Register Report
//!
//! Plain-text close report, sized for a WhatsApp message or a 48-column
//! printout, and the `wa.me` hand-off link.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use url::Url;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::receipt::{columns, divider, local_time, truncate};
use crate::types::{CashRegister, Expense, ExpenseType, PaymentMethod, Sale};

/// Everything booked against one register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegisterReport {
    pub register: CashRegister,
    pub sales: Vec<Sale>,
    pub expenses: Vec<Expense>,
}

impl RegisterReport {
    pub fn total_sales(&self) -> Money {
        self.sales.iter().map(Sale::total).sum()
    }

    pub fn total_cost(&self) -> Money {
        self.sales.iter().map(Sale::total_cost).sum()
    }

    pub fn total_expenses(&self) -> Money {
        self.expenses.iter().map(Expense::amount).sum()
    }

    /// Received amount per payment method, change already deducted from cash.
    pub fn payment_breakdown(&self) -> Vec<(PaymentMethod, Money)> {
        let mut totals: Vec<(PaymentMethod, Money)> = Vec::new();
        for sale in &self.sales {
            for payment in &sale.payments {
                match totals.iter_mut().find(|(m, _)| *m == payment.method) {
                    Some((_, sum)) => *sum += payment.amount(),
                    None => totals.push((payment.method, payment.amount())),
                }
            }
            let change = sale.change();
            if change.is_positive() {
                match totals.iter_mut().find(|(m, _)| *m == PaymentMethod::Cash) {
                    Some((_, sum)) => *sum -= change,
                    None => totals.push((PaymentMethod::Cash, -change)),
                }
            }
        }
        totals
    }

    /// Cash that should be in the drawer: opening float + net cash received
    /// − expenses of type `Other` (paid out of the drawer).
    ///
    /// Loss expenses are not cash outflows and do not reduce it.
    pub fn expected_cash(&self) -> Money {
        let cash_in = self
            .payment_breakdown()
            .into_iter()
            .filter(|(m, _)| *m == PaymentMethod::Cash)
            .map(|(_, amount)| amount)
            .sum::<Money>();
        let paid_out: Money = self
            .expenses
            .iter()
            .filter(|e| e.expense_type == ExpenseType::Other)
            .map(Expense::amount)
            .sum();
        self.register.opening_amount() + cash_in - paid_out
    }

    /// Counted minus expected, once the register is closed.
    pub fn cash_difference(&self) -> Option<Money> {
        self.register
            .closing_amount()
            .map(|counted| counted - self.expected_cash())
    }
}

/// Renders the close report.
pub fn format_register_report(report: &RegisterReport, utc_offset_minutes: i32) -> String {
    const W: usize = 48;
    let register = &report.register;
    let mut out: Vec<String> = Vec::new();

    out.push("*RELATÓRIO DE CAIXA*".to_string());
    out.push(format!(
        "Abertura: {}",
        local_time(register.opened_at, utc_offset_minutes)
    ));
    if let Some(closed_at) = register.closed_at {
        out.push(format!(
            "Fechamento: {}",
            local_time(closed_at, utc_offset_minutes)
        ));
    }
    out.push(divider(W));

    out.push(columns("Valor de abertura:", &register.opening_amount().to_string(), W));
    match register.closing_amount() {
        Some(closing) => out.push(columns("Valor de fechamento:", &closing.to_string(), W)),
        None => out.push(columns("Valor de fechamento:", "(caixa aberto)", W)),
    }
    out.push(columns("Total de vendas:", &report.total_sales().to_string(), W));
    out.push(columns("Total de despesas:", &report.total_expenses().to_string(), W));
    out.push(columns("Custo dos produtos:", &report.total_cost().to_string(), W));
    out.push(columns(
        "Lucro:",
        &(report.total_sales() - report.total_cost() - report.total_expenses()).to_string(),
        W,
    ));
    out.push(columns("Dinheiro esperado:", &report.expected_cash().to_string(), W));
    if let Some(diff) = report.cash_difference() {
        out.push(columns("Diferença:", &diff.to_string(), W));
    }

    let breakdown = report.payment_breakdown();
    if !breakdown.is_empty() {
        out.push(String::new());
        out.push("*FORMAS DE PAGAMENTO*".to_string());
        for (method, amount) in breakdown {
            out.push(columns(method.label(), &amount.to_string(), W));
        }
    }

    out.push(String::new());
    out.push(format!("*VENDAS* ({})", report.sales.len()));
    if report.sales.is_empty() {
        out.push("Nenhuma venda registrada".to_string());
    }
    for sale in &report.sales {
        let who = sale
            .customer_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Venda direta");
        let time = local_time(sale.created_at, utc_offset_minutes);
        let hour = time.split(' ').nth(1).unwrap_or(&time).to_string();
        out.push(columns(
            &format!("{} {}", hour, truncate(who, 24)),
            &sale.total().to_string(),
            W,
        ));
    }

    out.push(String::new());
    out.push(format!("*DESPESAS* ({})", report.expenses.len()));
    if report.expenses.is_empty() {
        out.push("Nenhuma despesa registrada".to_string());
    } else {
        out.push(columns("Tipo | Descrição", "Valor", W));
        for expense in &report.expenses {
            let description = expense.description.as_deref().unwrap_or("-");
            out.push(columns(
                &format!("{} | {}", expense.expense_type.label(), description),
                &expense.amount().to_string(),
                W,
            ));
        }
    }

    out.join("\n")
}

/// Builds `https://wa.me/<digits>?text=<encoded>`.
///
/// ## Example
/// ```rust
/// use varanda_core::report::whatsapp_link;
///
/// let link = whatsapp_link("+55 (11) 99999-8888", "Caixa fechado").unwrap();
/// assert!(link.starts_with("https://wa.me/5511999998888?text="));
/// ```
pub fn whatsapp_link(phone: &str, text: &str) -> CoreResult<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(ValidationError::Required {
            field: "telefone".to_string(),
        }
        .into());
    }
    let mut url = Url::parse(&format!("https://wa.me/{}", digits)).map_err(|e| {
        CoreError::Validation(ValidationError::InvalidFormat {
            field: "telefone".to_string(),
            reason: e.to_string(),
        })
    })?;
    url.query_pairs_mut().append_pair("text", text);
    Ok(url.to_string())
}
