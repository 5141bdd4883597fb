//! # Service Tax Repository
//!
//! Configurable percentage surcharges ("taxa de serviço", "couvert"). The
//! `active` flag only decides which taxes start selected at checkout.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult, ServiceResult};
use varanda_core::validation::{validate_name, validate_rate_bps};
use varanda_core::ServiceTax;

const COLUMNS: &str = "id, owner_id, name, rate_bps, active, created_at";

pub(crate) async fn list(conn: &mut SqliteConnection, owner_id: &str) -> DbResult<Vec<ServiceTax>> {
    let taxes = sqlx::query_as::<_, ServiceTax>(&format!(
        "SELECT {COLUMNS} FROM service_taxes WHERE owner_id = ?1 ORDER BY created_at, rowid"
    ))
    .bind(owner_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(taxes)
}

/// Repository for service taxes.
#[derive(Debug, Clone)]
pub struct ServiceTaxRepository {
    pool: SqlitePool,
}

impl ServiceTaxRepository {
    /// Creates a new ServiceTaxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ServiceTaxRepository { pool }
    }

    /// Creates an active tax. `rate_bps` is basis points: 1000 = 10%.
    pub async fn create(&self, owner_id: &str, name: &str, rate_bps: i64) -> ServiceResult<ServiceTax> {
        validate_name("nome", name)?;
        validate_rate_bps(rate_bps)?;

        let tax = ServiceTax {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.trim().to_string(),
            rate_bps,
            active: true,
            created_at: Utc::now(),
        };

        info!(id = %tax.id, name = %tax.name, rate_bps, "Creating service tax");

        sqlx::query(
            r#"
            INSERT INTO service_taxes (id, owner_id, name, rate_bps, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&tax.id)
        .bind(&tax.owner_id)
        .bind(&tax.name)
        .bind(tax.rate_bps)
        .bind(tax.active)
        .bind(tax.created_at)
        .execute(&self.pool)
        .await?;

        Ok(tax)
    }

    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<ServiceTax>> {
        let mut conn = self.pool.acquire().await?;
        list(&mut conn, owner_id).await
    }

    /// Taxes that start selected when the checkout opens.
    pub async fn list_active(&self, owner_id: &str) -> DbResult<Vec<ServiceTax>> {
        let taxes = sqlx::query_as::<_, ServiceTax>(&format!(
            "SELECT {COLUMNS} FROM service_taxes WHERE owner_id = ?1 AND active = 1 \
             ORDER BY created_at, rowid"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(taxes)
    }

    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        info!(id = %id, active, "Toggling service tax");

        let result = sqlx::query("UPDATE service_taxes SET active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Taxa de serviço", id));
        }
        Ok(())
    }
}
