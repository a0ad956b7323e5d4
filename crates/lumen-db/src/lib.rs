//! # lumen-db: Database Layer for Lumen POS
//!
//! SQLite persistence for the Lumen POS system, using sqlx for async
//! operations, plus the sale/purchase **transaction engine**.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Lumen POS Data Flow                           │
//! │                                                                     │
//! │  serving layer (request handlers)                                   │
//! │       │                                                             │
//! │  ┌────▼────────────────────────────────────────────────────────┐   │
//! │  │                   lumen-db (THIS CRATE)                     │   │
//! │  │                                                             │   │
//! │  │   Database/DbConfig     repositories        migrations      │   │
//! │  │   (pool.rs)             product  sale       (embedded)      │   │
//! │  │   SqlitePool            supplier purchase   001_init.sql    │   │
//! │  │   WAL, FK on            category group                      │   │
//! │  │                         report                              │   │
//! │  └────┬────────────────────────────────────────────────────────┘   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (or :memory: in tests)                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The transaction engine
//!
//! [`repository::sale::SaleRepository::create`] and
//! [`repository::purchase::PurchaseRepository::create`] each run the whole
//! validate → price → generate-invoice → persist → mutate-stock sequence
//! inside one database transaction. Any failure rolls the unit of work back
//! in full; there is no partial-success state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lumen_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/lumen.db")).await?;
//!
//! let record = db.sales().create(new_sale).await?;
//! println!("{}", record.sale.invoice_number);
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::group::ProductGroupRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::supplier::SupplierRepository;
