//! # Sale Repository
//!
//! The sale-path transaction engine plus the sales read side.
//!
//! ## Engine Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  SaleRepository::create(NewSale)                                    │
//! │                                                                     │
//! │  BEGIN TRANSACTION                                                  │
//! │    1. reject empty item list                                        │
//! │    2. per item, in input order:                                     │
//! │         load product → must exist, be active, have stock            │
//! │         subtotal += quantity × unit_price                           │
//! │    3. final = subtotal − discount + tax  (negative → reject)        │
//! │    4. draw invoice number, re-draw on collision (capped)            │
//! │    5. insert header, then per line:                                 │
//! │         insert line row                                             │
//! │         UPDATE products SET stock = stock − qty                     │
//! │           WHERE id = ? AND stock >= qty   ← atomic decrement;       │
//! │         0 rows affected → insufficient stock                        │
//! │  COMMIT (any error above rolls everything back)                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The conditional decrement re-checks stock at write time, so two sales
//! racing over the last units cannot both commit: whichever UPDATE runs
//! second finds the stock gone and aborts its whole transaction.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use lumen_core::invoice::{InvoicePrefix, InvoiceSequence};
use lumen_core::validation::{
    validate_adjustment_cents, validate_item_count, validate_price_cents, validate_quantity,
};
use lumen_core::{CoreError, Money, Page, PaymentMethod, Product, Sale, SaleItemDetail, SaleRecord};

// =============================================================================
// Request Types
// =============================================================================

/// One line of a sale request: which product, how many, at what price.
///
/// The unit price comes from the caller (it may differ from the catalog
/// price, e.g. a negotiated discount) and is snapshotted on the line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// A strictly-typed sale request, validated before the engine touches the
/// database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Ordered line items; processed in input order.
    pub items: Vec<NewSaleItem>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Acting user, supplied by the identity layer.
    pub user_id: String,
}

/// Filters for the paginated sales list.
#[derive(Debug, Clone)]
pub struct SaleFilter {
    pub page: u32,
    pub limit: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for SaleFilter {
    fn default() -> Self {
        SaleFilter {
            page: 1,
            limit: 10,
            start_date: None,
            end_date: None,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Creates a sale: the whole unit of work described in the module docs.
    ///
    /// ## Returns
    /// The persisted header plus its lines enriched with product name and
    /// SKU, ready for display.
    ///
    /// ## Errors
    /// `DbError::Domain` for every business rejection (empty items, unknown
    /// or inactive product, insufficient stock, discount exceeding total);
    /// the transaction is rolled back in full on any error.
    pub async fn create(&self, input: NewSale) -> DbResult<SaleRecord> {
        // Boundary validation, before any row is touched.
        if input.items.is_empty() {
            return Err(CoreError::EmptyTransaction { kind: "Sale" }.into());
        }
        validate_item_count(input.items.len()).map_err(CoreError::from)?;
        validate_adjustment_cents("discount", input.discount_cents).map_err(CoreError::from)?;
        validate_adjustment_cents("tax", input.tax_cents).map_err(CoreError::from)?;
        for item in &input.items {
            validate_quantity(item.quantity).map_err(CoreError::from)?;
            validate_price_cents(item.unit_price_cents).map_err(CoreError::from)?;
        }

        // Early returns below this point drop `tx`, which rolls back.
        let mut tx = self.pool.begin().await?;

        // Pass 1: validate every line against catalog state and price it.
        let mut subtotal = Money::zero();
        let mut resolved: Vec<(&NewSaleItem, Product)> = Vec::with_capacity(input.items.len());

        for item in &input.items {
            let product =
                sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
                    .bind(&item.product_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

            if !product.is_active {
                return Err(CoreError::ProductInactive { name: product.name }.into());
            }

            if !product.has_stock(item.quantity) {
                return Err(CoreError::InsufficientStock {
                    name: product.name,
                    available: product.stock_quantity,
                    requested: item.quantity,
                }
                .into());
            }

            subtotal += Money::from_cents(item.unit_price_cents).multiply_quantity(item.quantity);
            resolved.push((item, product));
        }

        let discount = Money::from_cents(input.discount_cents);
        let tax = Money::from_cents(input.tax_cents);
        let final_amount = subtotal - discount + tax;

        if final_amount.is_negative() {
            return Err(CoreError::DiscountExceedsTotal {
                discount_cents: discount.cents(),
                total_with_tax_cents: (subtotal + tax).cents(),
            }
            .into());
        }

        let invoice_number =
            reserve_invoice_number(&mut tx, InvoicePrefix::Sale, "sales").await?;

        // Pass 2: persist header, lines, and stock mutations.
        let sale_id = generate_id();
        let now = Utc::now();

        debug!(sale_id = %sale_id, invoice_number = %invoice_number, "Inserting sale header");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, customer_name, customer_email, customer_phone,
                total_amount_cents, discount_cents, tax_cents, final_amount_cents,
                payment_method, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale_id)
        .bind(&invoice_number)
        .bind(&input.customer_name)
        .bind(&input.customer_email)
        .bind(&input.customer_phone)
        .bind(subtotal.cents())
        .bind(discount.cents())
        .bind(tax.cents())
        .bind(final_amount.cents())
        .bind(input.payment_method)
        .bind(&input.user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut items_out = Vec::with_capacity(resolved.len());

        for (item, product) in resolved {
            let line_id = generate_id();
            let line_total = Money::from_cents(item.unit_price_cents)
                .multiply_quantity(item.quantity);

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, quantity, unit_price_cents, total_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&line_id)
            .bind(&sale_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(line_total.cents())
            .execute(&mut *tx)
            .await?;

            // Atomic conditional decrement: re-checks stock at write time,
            // closing the race between the pass-1 read and this write.
            let result = sqlx::query(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - ?1, updated_at = ?2
                WHERE id = ?3 AND stock_quantity >= ?1
                "#,
            )
            .bind(item.quantity)
            .bind(now)
            .bind(&item.product_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CoreError::InsufficientStock {
                    name: product.name,
                    available: product.stock_quantity,
                    requested: item.quantity,
                }
                .into());
            }

            items_out.push(SaleItemDetail {
                id: line_id,
                sale_id: sale_id.clone(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                total_price_cents: line_total.cents(),
                product_name: product.name,
                sku: product.sku,
            });
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            invoice_number = %invoice_number,
            final_amount = %final_amount,
            items = items_out.len(),
            "Sale created"
        );

        Ok(SaleRecord {
            sale: Sale {
                id: sale_id,
                invoice_number,
                customer_name: input.customer_name,
                customer_email: input.customer_email,
                customer_phone: input.customer_phone,
                total_amount_cents: subtotal.cents(),
                discount_cents: discount.cents(),
                tax_cents: tax.cents(),
                final_amount_cents: final_amount.cents(),
                payment_method: input.payment_method,
                user_id: input.user_id,
                created_at: now,
            },
            items: items_out,
        })
    }

    /// Gets a sale with its enriched lines.
    pub async fn get(&self, id: &str) -> DbResult<Option<SaleRecord>> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(sale) = sale else {
            return Ok(None);
        };

        let items = self.get_items(&sale.id).await?;
        Ok(Some(SaleRecord { sale, items }))
    }

    /// Gets the enriched lines of a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItemDetail>> {
        let items = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT
                si.id, si.sale_id, si.product_id,
                si.quantity, si.unit_price_cents, si.total_price_cents,
                p.name AS product_name, p.sku
            FROM sale_items si
            JOIN products p ON si.product_id = p.id
            WHERE si.sale_id = ?1
            ORDER BY si.rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists sales, newest first, with optional date-range filtering.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Page<Sale>> {
        let page = filter.page.max(1);
        let limit = filter.limit.max(1);
        let offset = (page - 1) * limit;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM sales WHERE 1=1");
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sales WHERE 1=1");

        if let Some(start) = filter.start_date {
            query.push(" AND DATE(created_at) >= ").push_bind(start);
            count.push(" AND DATE(created_at) >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query.push(" AND DATE(created_at) <= ").push_bind(end);
            count.push(" AND DATE(created_at) <= ").push_bind(end);
        }

        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let sales = query.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(sales, page, limit, total))
    }
}

// =============================================================================
// Invoice Reservation
// =============================================================================

/// Draws invoice-number candidates until one is free in `table`, checked
/// inside the caller's transaction so the reservation holds until commit.
///
/// Shared by the sale and purchase engines.
pub(crate) async fn reserve_invoice_number(
    tx: &mut Transaction<'_, Sqlite>,
    prefix: InvoicePrefix,
    table: &str,
) -> DbResult<String> {
    let mut seq = InvoiceSequence::new(prefix);

    while let Some(candidate) = seq.next_candidate() {
        // `table` is a compile-time constant at every call site, never
        // caller input.
        let sql = format!("SELECT 1 FROM {table} WHERE invoice_number = ?1");
        let taken: Option<i64> = sqlx::query_scalar(&sql)
            .bind(&candidate)
            .fetch_optional(&mut **tx)
            .await?;

        if taken.is_none() {
            return Ok(candidate);
        }

        debug!(candidate = %candidate, "Invoice number collision, drawing again");
    }

    Err(DbError::Domain(CoreError::InvoiceExhausted {
        attempts: seq.attempts(),
    }))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;
    use std::collections::HashSet;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, sku: &str, price_cents: i64, stock: i64) -> Product {
        db.products()
            .create(NewProduct {
                sku: sku.to_string(),
                name: format!("Product {sku}"),
                description: None,
                category_id: None,
                unit_price_cents: price_cents,
                cost_price_cents: price_cents / 2,
                stock_quantity: stock,
                min_stock_level: 10,
                unit: "pcs".to_string(),
            })
            .await
            .unwrap()
    }

    fn sale_of(product_id: &str, quantity: i64, unit_price_cents: i64) -> NewSale {
        NewSale {
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            items: vec![NewSaleItem {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents,
            }],
            discount_cents: 0,
            tax_cents: 0,
            payment_method: PaymentMethod::Cash,
            user_id: "tester".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sale_worked_example() {
        // 2 × $10.00, $5.00 discount, $2.00 tax → total $20.00, final $17.00
        let db = setup().await;
        let product = seed_product(&db, "WE-001", 1000, 10).await;

        let mut input = sale_of(&product.id, 2, 1000);
        input.discount_cents = 500;
        input.tax_cents = 200;

        let record = db.sales().create(input).await.unwrap();
        assert_eq!(record.sale.total_amount_cents, 2000);
        assert_eq!(record.sale.final_amount_cents, 1700);
        assert!(record.sale.invoice_number.starts_with("INV-"));
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.items[0].total_price_cents, 2000);

        let after = db.products().get(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 8);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rejected_without_side_effects() {
        let db = setup().await;
        let product = seed_product(&db, "IS-001", 500, 3).await;

        let err = db.sales().create(sale_of(&product.id, 5, 500)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            })
        ));

        let after = db.products().get(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 3);

        let sales = db.sales().list(&SaleFilter::default()).await.unwrap();
        assert_eq!(sales.total, 0);
    }

    #[tokio::test]
    async fn test_failing_line_rolls_back_whole_sale() {
        let db = setup().await;
        let ok = seed_product(&db, "RB-001", 500, 100).await;
        let short = seed_product(&db, "RB-002", 500, 1).await;

        let mut input = sale_of(&ok.id, 10, 500);
        input.items.push(NewSaleItem {
            product_id: short.id.clone(),
            quantity: 2,
            unit_price_cents: 500,
        });

        db.sales().create(input).await.unwrap_err();

        // Neither line left a trace: no header, no stock movement on the
        // line that would have succeeded.
        let ok_after = db.products().get(&ok.id).await.unwrap().unwrap();
        assert_eq!(ok_after.stock_quantity, 100);
        let sales = db.sales().list(&SaleFilter::default()).await.unwrap();
        assert_eq!(sales.total, 0);
    }

    #[tokio::test]
    async fn test_conditional_decrement_catches_stock_drained_after_read() {
        // Two lines of the same product, each within stock on its own.
        // The validation reads both see the full stock level, so the
        // rejection can only come from the conditional decrement when the
        // second UPDATE finds the stock already taken by the first.
        let db = setup().await;
        let product = seed_product(&db, "CD-001", 500, 4).await;

        let mut input = sale_of(&product.id, 3, 500);
        input.items.push(NewSaleItem {
            product_id: product.id.clone(),
            quantity: 3,
            unit_price_cents: 500,
        });

        let err = db.sales().create(input).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { requested: 3, .. })
        ));

        // Rolled back whole: the first line's decrement is undone too.
        let after = db.products().get(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 4);
        let sales = db.sales().list(&SaleFilter::default()).await.unwrap();
        assert_eq!(sales.total, 0);
    }

    #[tokio::test]
    async fn test_discount_exceeding_total_rejected() {
        let db = setup().await;
        let product = seed_product(&db, "DX-001", 1000, 10).await;

        let mut input = sale_of(&product.id, 1, 1000);
        input.discount_cents = 1500;
        input.tax_cents = 200;

        let err = db.sales().create(input).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::DiscountExceedsTotal {
                discount_cents: 1500,
                total_with_tax_cents: 1200,
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_sale_rejected() {
        let db = setup().await;
        let mut input = sale_of("whatever", 1, 100);
        input.items.clear();

        let err = db.sales().create(input).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::EmptyTransaction { kind: "Sale" })
        ));
    }

    #[tokio::test]
    async fn test_inactive_product_rejected() {
        let db = setup().await;
        let product = seed_product(&db, "IN-001", 500, 10).await;
        db.products()
            .update(
                &product.id,
                crate::repository::product::ProductPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = db.sales().create(sale_of(&product.id, 1, 500)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ProductInactive { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let db = setup().await;
        let err = db.sales().create(sale_of("no-such-id", 1, 500)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_unique() {
        let db = setup().await;
        let product = seed_product(&db, "IV-001", 100, 999).await;

        let mut seen = HashSet::new();
        for _ in 0..20 {
            let record = db.sales().create(sale_of(&product.id, 1, 100)).await.unwrap();
            assert!(seen.insert(record.sale.invoice_number));
        }
    }

    #[tokio::test]
    async fn test_get_returns_enriched_lines() {
        let db = setup().await;
        let product = seed_product(&db, "GE-001", 750, 10).await;

        let created = db.sales().create(sale_of(&product.id, 2, 750)).await.unwrap();
        let fetched = db.sales().get(&created.sale.id).await.unwrap().unwrap();

        assert_eq!(fetched.sale.invoice_number, created.sale.invoice_number);
        assert_eq!(fetched.items.len(), 1);
        assert_eq!(fetched.items[0].product_name, product.name);
        assert_eq!(fetched.items[0].sku, "GE-001");
    }
}
