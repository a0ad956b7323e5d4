//! # Repository Module
//!
//! Database repository implementations for Lumen POS, one per aggregate.
//!
//! ## Repository Pattern
//! ```text
//! handler ──► db.sales().create(new_sale)
//!                  │
//!                  ▼
//!             SaleRepository ── one transaction: validate, price,
//!                  │            invoice number, header + lines,
//!                  │            conditional stock decrement
//!                  ▼
//!             SQLite
//! ```
//! SQL is isolated here; business rules live in lumen-core and are invoked
//! by the repositories before and during each unit of work.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - catalog CRUD, search, stock reads
//! - [`category::CategoryRepository`] - category CRUD with delete guard
//! - [`supplier::SupplierRepository`] - supplier CRUD with delete guard
//! - [`sale::SaleRepository`] - sale transaction engine + read side
//! - [`purchase::PurchaseRepository`] - purchase engine + read side
//! - [`group::ProductGroupRepository`] - group CRUD, atomic membership replace
//! - [`report::ReportRepository`] - dashboard and sales aggregates

pub mod category;
pub mod group;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;
pub mod supplier;

/// Generates a new entity ID (UUID v4 string).
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
