//! # Database Error Types
//!
//! Error types for database operations and the services built on them.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError ← DbError | CoreError | stock shortfall to confirm       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UI shows the message as a toast (Portuguese)                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use varanda_core::ledger::StockIssue;
use varanda_core::CoreError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} não encontrado: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - A second open register for the same owner
    /// - A second sale for the same order
    #[error("Registro duplicado: {field}")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("Referência inválida: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative amount, unknown status).
    #[error("Valor inválido: {message}")]
    CheckViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Falha na conexão com o banco: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Falha na migração: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Falha na consulta: {0}")]
    QueryFailed(String),

    /// A stored JSON column could not be read or written.
    #[error("Dados corrompidos em {column}: {message}")]
    Corrupt { column: String, message: String },

    /// Pool exhausted (all connections in use).
    #[error("Banco de dados ocupado, tente novamente")]
    PoolExhausted,

    /// Internal database error.
    #[error("Erro interno do banco: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn corrupt(column: impl Into<String>, err: serde_json::Error) -> Self {
        DbError::Corrupt {
            column: column.into(),
            message: err.to_string(),
        }
    }

    /// True when a UNIQUE index on `needle` (e.g. `cash_registers.owner_id`) fired.
    pub fn is_unique_violation_on(&self, needle: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field } if field.contains(needle))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Registro", "desconhecido"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if let Some(field) = msg.split("UNIQUE constraint failed: ").nth(1) {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool fechado".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Service Error
// =============================================================================

/// Errors surfaced by the transactional services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Business rule or precondition failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Stock would go short. Nothing was written; retry with
    /// `allow_insufficient_stock` once the operator confirms.
    #[error("Estoque insuficiente: {}", summarize(.0))]
    InsufficientStock(Vec<StockIssue>),
}

fn summarize(issues: &[StockIssue]) -> String {
    issues
        .iter()
        .map(StockIssue::message)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Db(err.into())
    }
}

impl From<varanda_core::ValidationError> for ServiceError {
    fn from(err: varanda_core::ValidationError) -> Self {
        ServiceError::Core(err.into())
    }
}

impl ServiceError {
    /// The stock issues awaiting operator confirmation, if that is the failure.
    pub fn stock_issues(&self) -> Option<&[StockIssue]> {
        match self {
            ServiceError::InsufficientStock(issues) => Some(issues),
            _ => None,
        }
    }

    pub fn core(&self) -> Option<&CoreError> {
        match self {
            ServiceError::Core(err) => Some(err),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use varanda_core::ledger::StockIssueKind;

    #[test]
    fn test_insufficient_stock_message_lists_every_issue() {
        let issue = |name: &str| StockIssue {
            kind: StockIssueKind::Insufficient,
            product_name: name.to_string(),
            item_name: name.to_string(),
            available: 1.0,
            requested: 2.0,
        };
        let err = ServiceError::InsufficientStock(vec![issue("Heineken"), issue("Coca")]);
        let msg = err.to_string();
        assert!(msg.starts_with("Estoque insuficiente: Heineken"));
        assert!(msg.contains("; Coca"));
        assert_eq!(err.stock_issues().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: ServiceError = CoreError::RegisterClosed.into();
        assert_eq!(err.to_string(), CoreError::RegisterClosed.to_string());
    }

    #[test]
    fn test_unique_violation_probe() {
        let err = DbError::UniqueViolation {
            field: "cash_registers.owner_id".to_string(),
        };
        assert!(err.is_unique_violation_on("cash_registers.owner_id"));
        assert!(!err.is_unique_violation_on("sales.order_id"));
    }
}
