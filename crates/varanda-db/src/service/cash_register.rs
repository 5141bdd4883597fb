//! # Cash Register Service
//!
//! Open/close lifecycle of the register ("caixa") and the closing report.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   (none) ──open(amount)──► OPEN ──close(counted)──► CLOSED (final)     │
//! │                              │                                          │
//! │                              ├── orders, sales, expenses allowed        │
//! │                              └── running totals updated by them         │
//! │                                                                         │
//! │   At most one OPEN register per owner:                                  │
//! │     1. checked inside the transaction (friendly error)                  │
//! │     2. enforced by idx_cash_registers_one_open (races)                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counted closing amount is stored as entered. The report puts it next
//! to the expected cash so the operator reconciles by hand.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::repository::{cash_register as registers, expense as expenses, sale as sales};
use varanda_core::report::{format_register_report, whatsapp_link, RegisterReport};
use varanda_core::validation::validate_amount_cents;
use varanda_core::{CashRegister, CoreError, Money, Session};

/// Register lifecycle operations.
#[derive(Debug, Clone)]
pub struct CashRegisterService {
    pool: SqlitePool,
}

impl CashRegisterService {
    pub fn new(pool: SqlitePool) -> Self {
        CashRegisterService { pool }
    }

    /// Opens a register for the session's owner.
    ///
    /// ## Errors
    /// - `RegisterAlreadyOpen` if the owner already has one open
    /// - Validation error for a negative amount
    pub async fn open(&self, session: &Session, opening_amount: Money) -> ServiceResult<CashRegister> {
        validate_amount_cents("valor de abertura", opening_amount.cents())?;

        let owner_id = session.effective_owner_id();
        let mut tx = self.pool.begin().await?;

        if registers::find_open(&mut tx, owner_id).await?.is_some() {
            return Err(CoreError::RegisterAlreadyOpen.into());
        }

        let register = CashRegister {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            opened_by: session.user_id().to_string(),
            opening_amount_cents: opening_amount.cents(),
            closing_amount_cents: None,
            total_sales_cents: 0,
            total_cost_cents: 0,
            total_expenses_cents: 0,
            total_orders: 0,
            is_open: true,
            opened_at: Utc::now(),
            closed_at: None,
        };

        match registers::insert(&mut tx, &register).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("cash_registers.owner_id") => {
                return Err(CoreError::RegisterAlreadyOpen.into());
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await?;

        info!(
            id = %register.id,
            owner_id = %owner_id,
            opened_by = %register.opened_by,
            opening_amount = %opening_amount,
            "Cash register opened"
        );
        Ok(register)
    }

    /// Closes a register with the operator's counted amount.
    pub async fn close(
        &self,
        session: &Session,
        register_id: &str,
        closing_amount: Money,
    ) -> ServiceResult<CashRegister> {
        validate_amount_cents("valor de fechamento", closing_amount.cents())?;

        let mut tx = self.pool.begin().await?;

        let register = registers::get(&mut tx, register_id)
            .await?
            .filter(|r| r.owner_id == session.effective_owner_id())
            .ok_or_else(|| CoreError::RegisterNotFound(register_id.to_string()))?;

        if !register.is_open {
            return Err(CoreError::RegisterAlreadyClosed(register_id.to_string()).into());
        }

        let closed_at = Utc::now();
        if !registers::close(&mut tx, register_id, closing_amount.cents(), closed_at).await? {
            return Err(CoreError::RegisterAlreadyClosed(register_id.to_string()).into());
        }

        tx.commit().await?;

        info!(
            id = %register_id,
            closing_amount = %closing_amount,
            total_sales = %register.total_sales(),
            "Cash register closed"
        );

        Ok(CashRegister {
            closing_amount_cents: Some(closing_amount.cents()),
            is_open: false,
            closed_at: Some(closed_at),
            ..register
        })
    }

    /// The owner's open register, if any.
    pub async fn current(&self, session: &Session) -> ServiceResult<Option<CashRegister>> {
        let mut conn = self.pool.acquire().await?;
        Ok(registers::find_open(&mut conn, session.effective_owner_id()).await?)
    }

    /// The owner's open register, or `RegisterClosed` so the UI prompts to open one.
    pub async fn require_open(&self, session: &Session) -> ServiceResult<CashRegister> {
        let mut conn = self.pool.acquire().await?;
        super::open_register(&mut conn, session).await
    }

    /// Recent registers, newest first.
    pub async fn list(&self, session: &Session, limit: u32) -> ServiceResult<Vec<CashRegister>> {
        let mut conn = self.pool.acquire().await?;
        Ok(registers::list(&mut conn, session.effective_owner_id(), limit).await?)
    }

    /// Register with every sale and expense booked against it.
    pub async fn report(&self, session: &Session, register_id: &str) -> ServiceResult<RegisterReport> {
        let mut conn = self.pool.acquire().await?;

        let register = registers::get(&mut conn, register_id)
            .await?
            .filter(|r| r.owner_id == session.effective_owner_id())
            .ok_or_else(|| CoreError::RegisterNotFound(register_id.to_string()))?;

        let sales = sales::list_by_register(&mut conn, register_id).await?;
        let expenses = expenses::list_by_register(&mut conn, register_id).await?;

        debug!(
            id = %register_id,
            sales = sales.len(),
            expenses = expenses.len(),
            "Built register report"
        );

        Ok(RegisterReport {
            register,
            sales,
            expenses,
        })
    }

    /// Plain-text report for printing or WhatsApp.
    pub async fn report_text(
        &self,
        session: &Session,
        register_id: &str,
        utc_offset_minutes: i32,
    ) -> ServiceResult<String> {
        let report = self.report(session, register_id).await?;
        Ok(format_register_report(&report, utc_offset_minutes))
    }

    /// `https://wa.me/<phone>?text=<report>` for a manual hand-off.
    pub async fn whatsapp_link(
        &self,
        session: &Session,
        register_id: &str,
        phone: &str,
        utc_offset_minutes: i32,
    ) -> ServiceResult<String> {
        let text = self.report_text(session, register_id, utc_offset_minutes).await?;
        Ok(whatsapp_link(phone, &text)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use varanda_core::{CostBasis, ExpenseType, NewExpense};

    #[tokio::test]
    async fn test_open_sets_zeroed_totals() {
        let db = testing::test_db().await;
        let register = testing::open_register(&db, 5000).await;

        assert!(register.is_open);
        assert_eq!(register.opening_amount_cents, 5000);
        assert_eq!(register.total_sales_cents, 0);
        assert_eq!(register.total_orders, 0);
        assert_eq!(register.opened_by, testing::OWNER);

        let current = db.cash_registers().current(&testing::owner()).await.unwrap();
        assert_eq!(current.map(|r| r.id), Some(register.id));
    }

    #[tokio::test]
    async fn test_second_open_is_rejected() {
        let db = testing::test_db().await;
        testing::open_register(&db, 5000).await;

        // The employee resolves to the same owner.
        let err = db
            .cash_registers()
            .open(&testing::employee(), Money::from_cents(1000))
            .await
            .unwrap_err();
        assert!(matches!(err.core(), Some(CoreError::RegisterAlreadyOpen)));

        let registers = db.cash_registers().list(&testing::owner(), 10).await.unwrap();
        assert_eq!(registers.iter().filter(|r| r.is_open).count(), 1);
    }

    #[tokio::test]
    async fn test_unique_index_blocks_a_racing_insert() {
        let db = testing::test_db().await;
        let first = testing::open_register(&db, 5000).await;

        // Bypass the service check, as a concurrent opener would.
        let racing = CashRegister {
            id: "racing".to_string(),
            ..first
        };
        let mut conn = db.pool().acquire().await.unwrap();
        let err = registers::insert(&mut conn, &racing).await.unwrap_err();
        assert!(err.is_unique_violation_on("cash_registers.owner_id"));
    }

    #[tokio::test]
    async fn test_close_records_amount_and_frees_the_owner() {
        let db = testing::test_db().await;
        let session = testing::owner();
        let register = testing::open_register(&db, 5000).await;

        let closed = db
            .cash_registers()
            .close(&session, &register.id, Money::from_cents(4200))
            .await
            .unwrap();
        assert!(!closed.is_open);
        assert_eq!(closed.closing_amount_cents, Some(4200));
        assert!(closed.closed_at.is_some());

        let err = db
            .cash_registers()
            .close(&session, &register.id, Money::from_cents(4200))
            .await
            .unwrap_err();
        assert!(matches!(err.core(), Some(CoreError::RegisterAlreadyClosed(_))));

        assert!(db.cash_registers().current(&session).await.unwrap().is_none());
        let err = db.cash_registers().require_open(&session).await.unwrap_err();
        assert!(matches!(err.core(), Some(CoreError::RegisterClosed)));

        // A new session can start.
        testing::open_register(&db, 1000).await;
    }

    #[tokio::test]
    async fn test_close_unknown_register() {
        let db = testing::test_db().await;
        let err = db
            .cash_registers()
            .close(&testing::owner(), "missing", Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err.core(), Some(CoreError::RegisterNotFound(_))));
    }

    #[tokio::test]
    async fn test_report_and_whatsapp_link() {
        let db = testing::test_db().await;
        let session = testing::owner();
        let register = testing::open_register(&db, 5000).await;

        db.expenses()
            .create_expense(
                &session,
                NewExpense {
                    expense_type: ExpenseType::Other,
                    amount_cents: Some(1500),
                    quantity: None,
                    product_type: None,
                    product_id: None,
                    ingredient_id: None,
                    cost_basis: CostBasis::default(),
                    description: Some("Gelo".to_string()),
                },
            )
            .await
            .unwrap();

        let report = db.cash_registers().report(&session, &register.id).await.unwrap();
        assert_eq!(report.expenses.len(), 1);
        assert_eq!(report.total_expenses().cents(), 1500);
        assert_eq!(report.expected_cash().cents(), 3500);

        let link = db
            .cash_registers()
            .whatsapp_link(&session, &register.id, "+55 (11) 99999-0000", -180)
            .await
            .unwrap();
        assert!(link.starts_with("https://wa.me/5511999990000?text="));
    }
}
