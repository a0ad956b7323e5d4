//! # Domain Types
//!
//! Core domain types used throughout Lumen POS.
//!
//! ## Type Hierarchy
//! ```text
//! Catalog                       Transactions
//! ┌───────────┐                 ┌───────────┐   ┌───────────────┐
//! │  Product  │◄── referenced ──│   Sale    │──►│   SaleItem    │
//! │  Category │     by lines    │ Purchase  │──►│ PurchaseItem  │
//! │  Supplier │                 └───────────┘   └───────────────┘
//! └───────────┘                 header owns its lines (cascade);
//! ┌────────────────┐            lines snapshot the unit price and
//! │  ProductGroup  │            are immutable once created
//! └────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 string - immutable, used for database relations
//! - a business key where one exists (product `sku`, sale/purchase
//!   `invoice_number`) - human-readable, unique

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Payment Enums
// =============================================================================

/// How a sale was paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment (the default).
    #[default]
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Bank transfer.
    Transfer,
}

/// Settlement state of a purchase towards a supplier.
///
/// A free-form status in practice: the allow-list is enforced here at the
/// type level rather than by a state machine.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Not yet paid (the default for new purchases).
    #[default]
    Pending,
    /// Paid in full.
    Paid,
    /// Partially paid.
    Partial,
}

// =============================================================================
// Catalog Entities
// =============================================================================

/// A product available for sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,

    /// Display name shown on screens and invoices.
    pub name: String,

    /// Optional long-form description.
    pub description: Option<String>,

    /// Category reference (nullable; categories are optional).
    pub category_id: Option<String>,

    /// Selling price in cents.
    pub unit_price_cents: i64,

    /// Cost price in cents (for margin reporting).
    pub cost_price_cents: i64,

    /// Current stock level. Never negative: guarded by the engine's
    /// conditional decrement and a database CHECK constraint.
    pub stock_quantity: i64,

    /// Reorder threshold for the low-stock report.
    pub min_stock_level: i64,

    /// Unit of measure ("pcs", "kg", ...).
    pub unit: String,

    /// Whether the product can be transacted (soft delete flag).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Checks whether `quantity` units can be sold from current stock.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }

    /// Whether stock has fallen to or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }
}

/// A product category. Name is unique.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A supplier that purchases are sourced from.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Soft delete flag; inactive suppliers cannot receive purchases.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale transaction (header).
///
/// `final_amount_cents` is always the deterministic function
/// `total_amount - discount + tax`; it is stored for query convenience but
/// never set independently of its inputs.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    /// Generated business key, `INV-YYYYMMDD-NNNN`, unique.
    pub invoice_number: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// Sum of line totals, in cents.
    pub total_amount_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    /// total - discount + tax, in cents.
    pub final_amount_cents: i64,
    pub payment_method: PaymentMethod,
    /// Acting user, supplied by the identity layer.
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the final amount as Money.
    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_cents(self.final_amount_cents)
    }
}

/// A line item in a sale. Lines are append-only: corrections happen by
/// creating new transactions, never by editing history.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Quantity sold, always positive.
    pub quantity: i64,
    /// Unit price in cents at time of sale, decoupled from the product's
    /// current price (snapshot pattern).
    pub unit_price_cents: i64,
    /// quantity × unit_price, in cents.
    pub total_price_cents: i64,
}

impl SaleItem {
    /// Returns the line total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

/// A sale line enriched with product name and SKU for display, as returned
/// by the read side and by the engine on success.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItemDetail {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    pub product_name: String,
    pub sku: String,
}

/// A sale header together with its enriched lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
}

// =============================================================================
// Purchase
// =============================================================================

/// A completed purchase transaction (header). Mirror of [`Sale`] with a
/// supplier reference and a payment status instead of customer fields.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    /// Generated business key, `PUR-YYYYMMDD-NNNN`, unique.
    pub invoice_number: String,
    pub supplier_id: String,
    pub total_amount_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub final_amount_cents: i64,
    pub payment_status: PaymentStatus,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A line item in a purchase. Append-only, like sale lines.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
}

/// A purchase line enriched with product name and SKU.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseItemDetail {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    pub product_name: String,
    pub sku: String,
}

/// A purchase header together with its enriched lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseItemDetail>,
}

// =============================================================================
// Product Group
// =============================================================================

/// A named bundle of products used as a convenience multi-add in the sale
/// UI. Not itself a priced entity.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One (product, quantity) membership row of a group.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGroupItem {
    pub id: String,
    pub group_id: String,
    pub product_id: String,
    pub quantity: i64,
}

/// A membership row enriched with product details for display.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGroupItemDetail {
    pub id: String,
    pub group_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub product_name: String,
    pub sku: String,
    pub unit_price_cents: i64,
    pub stock_quantity: i64,
}

/// A group header together with its enriched membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGroupRecord {
    #[serde(flatten)]
    pub group: ProductGroup,
    pub products: Vec<ProductGroupItemDetail>,
}

/// A group row with its membership count, for list views.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGroupSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub product_count: i64,
}

// =============================================================================
// Pagination
// =============================================================================

/// Page slice of a list query plus the bookkeeping the caller needs to
/// render pagination controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    /// Builds a page, deriving the page count from total and limit.
    pub fn new(items: Vec<T>, page: u32, limit: u32, total: i64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            (total + limit as i64 - 1) / limit as i64
        };
        Page {
            items,
            page,
            limit,
            total,
            pages,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64, min: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            sku: "COKE-330".to_string(),
            name: "Coca-Cola 330ml".to_string(),
            description: None,
            category_id: None,
            unit_price_cents: 299,
            cost_price_cents: 180,
            stock_quantity: stock,
            min_stock_level: min,
            unit: "pcs".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_has_stock() {
        let p = product(3, 10);
        assert!(p.has_stock(3));
        assert!(!p.has_stock(5));
    }

    #[test]
    fn test_low_stock() {
        assert!(product(3, 10).is_low_stock());
        assert!(!product(50, 10).is_low_stock());
    }

    #[test]
    fn test_payment_defaults() {
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }

    #[test]
    fn test_page_count_rounds_up() {
        let page = Page::new(vec![1, 2, 3], 1, 10, 23);
        assert_eq!(page.pages, 3);

        let exact = Page::<i32>::new(vec![], 1, 10, 20);
        assert_eq!(exact.pages, 2);
    }
}
