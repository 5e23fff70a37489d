//! # Validation Module
//!
//! Input checks that run before any guard or any write.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: THIS MODULE                                                   │
//! │  ├── ids parse as UUIDs, names not blank, amounts/quantities positive  │
//! │  └── line counts within MAX_OPERATION_LINES                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine guards (fogon-db)                                      │
//! │  ├── register open, funds available, stock available                   │
//! │  └── product kind and unit compatibility                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── CHECK 0 <= current_quantity <= initial_quantity                   │
//! │  ├── one open register (partial UNIQUE index)                          │
//! │  └── transactions immutable (triggers)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fogon_core::money::Quantity;
//! use fogon_core::validation::{validate_name, validate_positive_quantity};
//!
//! validate_name("name", "Arroz con pollo").unwrap();
//! assert!(validate_positive_quantity("quantity", Quantity::zero()).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::{Money, Quantity};
use crate::MAX_OPERATION_LINES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest product or unit name accepted.
pub const MAX_NAME_LEN: usize = 120;

/// Longest transaction or purchase description accepted.
pub const MAX_DESCRIPTION_LEN: usize = 255;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, unit of measure).
///
/// ## Rules
/// - Must not be blank
/// - At most [`MAX_NAME_LEN`] characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a free-text description. Blank is allowed.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

/// Validates an entity id.
///
/// ```rust
/// use fogon_core::validation::validate_id;
///
/// assert!(validate_id("dish_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_id("dish_id", "paella").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

pub fn validate_positive_quantity(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Opening floats and counted cash may be zero but never negative.
pub fn validate_non_negative_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in one purchase, production or sale.
///
/// ## Rules
/// - At least one line
/// - At most [`MAX_OPERATION_LINES`]
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines == 0 || lines > MAX_OPERATION_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_OPERATION_LINES as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
