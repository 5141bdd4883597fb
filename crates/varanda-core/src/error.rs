//! # Error Types
//!
//! Domain-specific error types for varanda-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  varanda-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule / precondition failures          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  varanda-db errors (separate crate)                                    │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - CoreError | DbError | stock shortfall          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → toast in the UI    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages are shown verbatim to the operator, so they are written in
//! Portuguese. No error codes reach the UI beyond the message text.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// No authenticated actor is attached to the call.
    #[error("Usuário não autenticado")]
    NotAuthenticated,

    /// An order, sale or expense was attempted without an open register.
    ///
    /// ## User Workflow
    /// ```text
    /// Nova comanda
    ///      │
    ///      ▼
    /// require_open(session) ── none ──► RegisterClosed
    ///      │                                  │
    ///      ▼                                  ▼
    /// write order                    UI: "abra o caixa"
    /// ```
    #[error("Caixa fechado: abra um caixa antes de continuar")]
    RegisterClosed,

    /// The owner already has an open register.
    #[error("Já existe um caixa aberto")]
    RegisterAlreadyOpen,

    /// Cash register cannot be found.
    #[error("Caixa não encontrado: {0}")]
    RegisterNotFound(String),

    /// Register is already closed (closed registers are immutable).
    #[error("Caixa {0} já está fechado")]
    RegisterAlreadyClosed(String),

    /// Order cannot be found.
    #[error("Comanda não encontrada: {0}")]
    OrderNotFound(String),

    /// Order was already converted into a sale.
    #[error("Comanda {0} já está fechada")]
    OrderAlreadyClosed(String),

    /// Order item cannot be found on the order.
    #[error("Item não encontrado na comanda: {0}")]
    OrderItemNotFound(String),

    /// Sale cannot be found.
    #[error("Venda não encontrada: {0}")]
    SaleNotFound(String),

    /// Expense cannot be found.
    #[error("Despesa não encontrada: {0}")]
    ExpenseNotFound(String),

    /// Catalog entry (food, external product, ingredient) cannot be found.
    #[error("Produto não encontrado: {0}")]
    ProductNotFound(String),

    /// Not enough stock for a manual removal.
    #[error("Estoque insuficiente para {name}: disponível {available}, solicitado {requested}")]
    InsufficientStock {
        name: String,
        available: f64,
        requested: f64,
    },

    /// Units belong to different dimensions (mass vs volume vs unit count).
    #[error("Não é possível converter de {from} para {to}")]
    IncompatibleUnits { from: String, to: String },

    /// Payments do not cover the sale total.
    #[error("Pagamento insuficiente: total {total}, pago {paid}")]
    InsufficientPayment { total: String, paid: String },

    /// Manual discount is larger than the amount being charged.
    #[error("Desconto de {discount} maior que o total de {total}")]
    DiscountExceedsTotal { discount: String, total: String },

    /// Order has no items.
    #[error("A comanda precisa de pelo menos um item")]
    EmptyOrder,

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write; the operation is aborted with no partial write.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} é obrigatório")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} deve ter no máximo {max} caracteres")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} deve estar entre {min} e {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} deve ser maior que zero")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} não pode ser negativo")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, unknown unit).
    #[error("{field} com formato inválido: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
