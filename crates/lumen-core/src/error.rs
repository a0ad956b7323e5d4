//! # Error Types
//!
//! Domain-specific error types for lumen-core.
//!
//! ## Error Hierarchy
//! ```text
//! lumen-core (this file)
//! ├── CoreError        - business rule violations
//! └── ValidationError  - input validation failures
//!
//! lumen-db (separate crate)
//! └── DbError          - database operation failures, wraps CoreError
//!                        when the transaction engine rejects a request
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derive macros, never manual impls
//! 2. Include context in messages (product name, requested quantity, ...)
//! 3. Errors are enum variants, never bare strings
//! 4. Each variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the transaction engine.
///
/// These are always terminal for the request that raised them: the enclosing
/// database transaction is rolled back in full and the message is surfaced
/// to the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced product does not exist (or was soft-deleted).
    #[error("Product with id {0} not found")]
    ProductNotFound(String),

    /// Product exists but is flagged inactive and cannot be transacted.
    #[error("Product {name} is inactive")]
    ProductInactive { name: String },

    /// Referenced supplier does not exist.
    #[error("Supplier with id {0} not found")]
    SupplierNotFound(String),

    /// Supplier exists but is flagged inactive and cannot receive purchases.
    #[error("Supplier {name} is inactive")]
    SupplierInactive { name: String },

    /// Requested quantity exceeds the current stock level.
    ///
    /// Raised either by the up-front validation read or by the conditional
    /// decrement when a concurrent sale drained the stock in between.
    #[error("Insufficient stock for product {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// A sale or purchase was submitted with no line items.
    #[error("{kind} must have at least one item")]
    EmptyTransaction { kind: &'static str },

    /// Discount exceeds subtotal plus tax, which would make the final
    /// amount negative. Rejected rather than clamped.
    #[error("Discount {discount_cents} exceeds transaction total {total_with_tax_cents}")]
    DiscountExceedsTotal {
        discount_cents: i64,
        total_with_tax_cents: i64,
    },

    /// Group membership replacement was given an empty product list.
    #[error("Product group must have at least one product")]
    EmptyGroup,

    /// Invoice number generation ran out of candidates.
    ///
    /// With the monotonic fallback this only happens if the fallback
    /// candidate itself collides, i.e. effectively never.
    #[error("Could not generate a unique invoice number after {attempts} attempts")]
    InvoiceExhausted { attempts: u32 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised at the boundary, before business logic runs, so the engine's
/// inputs are always well-formed.
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. malformed SKU or UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g. duplicate SKU or category name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

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
            name: "Coca-Cola 330ml".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product Coca-Cola 330ml: available 3, requested 5"
        );

        let err = CoreError::EmptyTransaction { kind: "Sale" };
        assert_eq!(err.to_string(), "Sale must have at least one item");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
