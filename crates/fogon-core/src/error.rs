//! # Error Types
//!
//! Domain-specific error types for fogon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fogon-core errors (this file)                                          │
//! │  ├── CoreError        - Ledger and costing guard failures               │
//! │  ├── ValidationError  - Input validation failures                       │
//! │  └── ErrorDetail      - Serializable shape handed to callers            │
//! │                                                                         │
//! │  fogon-db errors (separate crate)                                       │
//! │  └── DbError          - Database failures + wrapped CoreError           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ErrorDetail → caller     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guard Failures Carry Their Shortfall
//! Funds and stock guards report both sides of the comparison so the
//! presentation layer can say "only 3.0000 kg of rice left" instead of
//! "operation failed".

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::{Money, Quantity};

// =============================================================================
// Core Error
// =============================================================================

/// Ledger and costing errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Unit of measure not found: {0}")]
    UnitNotFound(String),

    #[error("Cash register not found: {0}")]
    RegisterNotFound(String),

    /// Another register is still open.
    ///
    /// ## When This Occurs
    /// ```text
    /// open_register(today)
    ///      │
    ///      ▼
    /// yesterday's register never closed
    ///      │
    ///      ▼
    /// RegisterAlreadyOpen { open_register_id: "<yesterday>" }
    /// ```
    #[error("Cash register {open_register_id} is already open")]
    RegisterAlreadyOpen { open_register_id: String },

    /// Write against a register that has been closed out.
    #[error("Cash register {register_id} is closed")]
    RegisterClosed { register_id: String },

    /// Spending more than the register currently holds.
    #[error(
        "Insufficient funds in register {register_id}: available {available}, requested {requested}"
    )]
    InsufficientFunds {
        register_id: String,
        available: Money,
        requested: Money,
    },

    /// Consuming more of a product than its live lots hold.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product: String,
        available: Quantity,
        requested: Quantity,
    },

    /// Sale or manual expense with no register open.
    #[error("No cash register is open")]
    NoOpenRegister,

    /// An internal guard was bypassed (over-depletion, negative amount).
    ///
    /// Never user-recoverable; it means a caller skipped a pre-check.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::ProductNotFound(_)
            | CoreError::UnitNotFound(_)
            | CoreError::RegisterNotFound(_) => ErrorCode::NotFound,
            CoreError::RegisterAlreadyOpen { .. } => ErrorCode::Conflict,
            CoreError::RegisterClosed { .. } => ErrorCode::ClosedRegister,
            CoreError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::NoOpenRegister => ErrorCode::NoOpenRegister,
            CoreError::InvariantViolation(_) => ErrorCode::InvariantViolation,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Structured form of this error for the external layer.
    pub fn detail(&self) -> ErrorDetail {
        let shortfall = match self {
            CoreError::InsufficientFunds {
                available,
                requested,
                ..
            } => Some(Shortfall {
                available: available.to_string(),
                requested: requested.to_string(),
            }),
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => Some(Shortfall {
                available: available.to_string(),
                requested: requested.to_string(),
            }),
            _ => None,
        };

        ErrorDetail {
            code: self.code(),
            message: self.to_string(),
            shortfall,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any guard runs or any row is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, unparsable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Dish used where an ingredient is expected or vice versa.
    #[error("{product} is not {expected}")]
    WrongProductKind { product: String, expected: String },

    /// Purchase unit measures something other than the product's base unit.
    #[error("unit {unit} measures {unit_base}, but {product} is stocked in {product_base}")]
    UnitMismatch {
        unit: String,
        unit_base: String,
        product: String,
        product_base: String,
    },
}

// =============================================================================
// Error Detail
// =============================================================================

/// Error codes handed to the external layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    Conflict,
    ClosedRegister,
    InsufficientFunds,
    InsufficientStock,
    NoOpenRegister,
    InvariantViolation,
    NotFound,
    ValidationError,
    DatabaseError,
}

/// Both sides of a failed funds or stock comparison, formatted on the
/// fixed-point grid ("150.00", "3.0000").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Shortfall {
    pub available: String,
    pub requested: String,
}

/// Serializable error shape.
///
/// ## JSON
/// ```json
/// {
///   "code": "INSUFFICIENT_FUNDS",
///   "message": "Insufficient funds in register ...: available 100.00, requested 150.00",
///   "shortfall": { "available": "100.00", "requested": "150.00" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Shortfall>,
}

impl ErrorDetail {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ErrorDetail {
            code,
            message: message.into(),
            shortfall: None,
        }
    }
}

impl From<ValidationError> for ErrorDetail {
    fn from(err: ValidationError) -> Self {
        ErrorDetail::new(ErrorCode::ValidationError, err.to_string())
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product: "Rice".to_string(),
            available: Quantity::from_units(3),
            requested: Quantity::from_units(5),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Rice: available 3.0000, requested 5.0000"
        );

        let err = CoreError::RegisterClosed {
            register_id: "r-1".to_string(),
        };
        assert_eq!(err.to_string(), "Cash register r-1 is closed");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_codes_follow_taxonomy() {
        assert_eq!(
            CoreError::RegisterAlreadyOpen {
                open_register_id: "r".into()
            }
            .code(),
            ErrorCode::Conflict
        );
        assert_eq!(CoreError::NoOpenRegister.code(), ErrorCode::NoOpenRegister);
        assert_eq!(
            CoreError::InvariantViolation("x".into()).code(),
            ErrorCode::InvariantViolation
        );
        assert_eq!(
            CoreError::UnitNotFound("u".into()).code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn test_detail_carries_shortfall() {
        let err = CoreError::InsufficientFunds {
            register_id: "r-1".to_string(),
            available: Money::from_units(100),
            requested: Money::from_units(150),
        };
        let detail = err.detail();
        assert_eq!(detail.code, ErrorCode::InsufficientFunds);
        assert_eq!(
            detail.shortfall,
            Some(Shortfall {
                available: "100.00".to_string(),
                requested: "150.00".to_string(),
            })
        );

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_FUNDS");
        assert_eq!(json["shortfall"]["requested"], "150.00");
    }

    #[test]
    fn test_detail_omits_shortfall_when_absent() {
        let json = serde_json::to_value(CoreError::NoOpenRegister.detail()).unwrap();
        assert_eq!(json["code"], "NO_OPEN_REGISTER");
        assert!(json.get("shortfall").is_none());
    }
}
