//! # lumen-core: Pure Business Logic for Lumen POS
//!
//! This crate is the heart of Lumen POS. It contains all business logic as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Lumen POS Architecture                         │
//! │                                                                     │
//! │  Serving layer (HTTP handlers, CLI, ...)                            │
//! │       │                                                             │
//! │  ┌────▼────────────────────────────────────────────────────────┐   │
//! │  │              ★ lumen-core (THIS CRATE) ★                    │   │
//! │  │                                                             │   │
//! │  │   types      money      invoice       validation            │   │
//! │  │   Product    Money      InvoicePrefix rules/checks          │   │
//! │  │   Sale...    cents math candidates                          │   │
//! │  │                                                             │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │   │
//! │  └────┬────────────────────────────────────────────────────────┘   │
//! │       │                                                             │
//! │  ┌────▼────────────────────────────────────────────────────────┐   │
//! │  │          lumen-db (SQLite layer + transaction engine)       │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Purchase, ProductGroup, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`invoice`] - Invoice number candidates and the capped retry sequence
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic, side-effect free (the invoice
//!    candidate RNG is the one exception)
//! 2. **No I/O**: database, network and file system access are forbidden here
//! 3. **Integer Money**: all monetary values are cents (i64), never floats
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

pub mod error;
pub mod invoice;
pub mod money;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{InvoicePrefix, InvoiceSequence};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single sale or purchase.
///
/// Prevents runaway requests and keeps transaction sizes reasonable.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Prevents accidental over-ordering (e.g. typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Random candidates tried before falling back to the monotonic counter
/// when generating an invoice number.
pub const MAX_INVOICE_ATTEMPTS: u32 = 8;

/// Maximum amount accepted for a single price, discount or tax, in cents
/// ($10M). With quantity and item-count caps this keeps every subtotal
/// far from i64 overflow.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;
