//! # Purchase Repository
//!
//! The purchase-path transaction engine and its read side. Structurally a
//! mirror of the sale engine: same validation pass, same invoice
//! reservation, same all-or-nothing transaction. The differences are that
//! stock flows IN (unconditional increment, no availability check), the
//! counterparty is a supplier that must exist and be active, lines carry
//! the cost price, and the header tracks a payment status instead of
//! customer details.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use crate::repository::sale::reserve_invoice_number;
use lumen_core::invoice::InvoicePrefix;
use lumen_core::validation::{
    validate_adjustment_cents, validate_item_count, validate_price_cents, validate_quantity,
};
use lumen_core::{
    CoreError, Money, Page, PaymentStatus, Product, Purchase, PurchaseItemDetail, PurchaseRecord,
    Supplier,
};

// =============================================================================
// Request Types
// =============================================================================

/// One line of a purchase request, priced at cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchaseItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// A strictly-typed purchase request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    pub supplier_id: String,
    /// Ordered line items; processed in input order.
    pub items: Vec<NewPurchaseItem>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Acting user, supplied by the identity layer.
    pub user_id: String,
}

/// Filters for the paginated purchases list.
#[derive(Debug, Clone)]
pub struct PurchaseFilter {
    pub page: u32,
    pub limit: u32,
    pub supplier_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for PurchaseFilter {
    fn default() -> Self {
        PurchaseFilter {
            page: 1,
            limit: 10,
            supplier_id: None,
            start_date: None,
            end_date: None,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Creates a purchase and increments stock for every line, as one
    /// transaction. Any rejection rolls the whole purchase back.
    pub async fn create(&self, input: NewPurchase) -> DbResult<PurchaseRecord> {
        if input.items.is_empty() {
            return Err(CoreError::EmptyTransaction { kind: "Purchase" }.into());
        }
        validate_item_count(input.items.len()).map_err(CoreError::from)?;
        validate_adjustment_cents("discount", input.discount_cents).map_err(CoreError::from)?;
        validate_adjustment_cents("tax", input.tax_cents).map_err(CoreError::from)?;
        for item in &input.items {
            validate_quantity(item.quantity).map_err(CoreError::from)?;
            validate_price_cents(item.unit_price_cents).map_err(CoreError::from)?;
        }

        let mut tx = self.pool.begin().await?;

        let supplier =
            sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?1")
                .bind(&input.supplier_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| CoreError::SupplierNotFound(input.supplier_id.clone()))?;

        if !supplier.is_active {
            return Err(CoreError::SupplierInactive {
                name: supplier.name,
            }
            .into());
        }

        // Validate and price every line. Products must exist; receiving
        // stock for an inactive product is allowed (it may be reactivated).
        let mut subtotal = Money::zero();
        let mut resolved: Vec<(&NewPurchaseItem, Product)> = Vec::with_capacity(input.items.len());

        for item in &input.items {
            let product =
                sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
                    .bind(&item.product_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

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
            reserve_invoice_number(&mut tx, InvoicePrefix::Purchase, "purchases").await?;

        let purchase_id = generate_id();
        let now = Utc::now();

        debug!(purchase_id = %purchase_id, invoice_number = %invoice_number, "Inserting purchase header");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, invoice_number, supplier_id,
                total_amount_cents, discount_cents, tax_cents, final_amount_cents,
                payment_status, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&purchase_id)
        .bind(&invoice_number)
        .bind(&input.supplier_id)
        .bind(subtotal.cents())
        .bind(discount.cents())
        .bind(tax.cents())
        .bind(final_amount.cents())
        .bind(input.payment_status)
        .bind(&input.user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut items_out = Vec::with_capacity(resolved.len());

        for (item, product) in resolved {
            let line_id = generate_id();
            let line_total =
                Money::from_cents(item.unit_price_cents).multiply_quantity(item.quantity);

            sqlx::query(
                r#"
                INSERT INTO purchase_items (
                    id, purchase_id, product_id, quantity, unit_price_cents, total_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&line_id)
            .bind(&purchase_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(line_total.cents())
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity + ?1, updated_at = ?2
                WHERE id = ?3
                "#,
            )
            .bind(item.quantity)
            .bind(now)
            .bind(&item.product_id)
            .execute(&mut *tx)
            .await?;

            items_out.push(PurchaseItemDetail {
                id: line_id,
                purchase_id: purchase_id.clone(),
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
            purchase_id = %purchase_id,
            invoice_number = %invoice_number,
            supplier = %supplier.name,
            final_amount = %final_amount,
            items = items_out.len(),
            "Purchase created"
        );

        Ok(PurchaseRecord {
            purchase: Purchase {
                id: purchase_id,
                invoice_number,
                supplier_id: input.supplier_id,
                total_amount_cents: subtotal.cents(),
                discount_cents: discount.cents(),
                tax_cents: tax.cents(),
                final_amount_cents: final_amount.cents(),
                payment_status: input.payment_status,
                user_id: input.user_id,
                created_at: now,
            },
            items: items_out,
        })
    }

    /// Updates the payment status of an existing purchase.
    pub async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> DbResult<Purchase> {
        let result = sqlx::query("UPDATE purchases SET payment_status = ?1 WHERE id = ?2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        info!(purchase_id = %id, status = ?status, "Purchase payment status updated");
        Ok(purchase)
    }

    /// Gets a purchase with its enriched lines.
    pub async fn get(&self, id: &str) -> DbResult<Option<PurchaseRecord>> {
        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(purchase) = purchase else {
            return Ok(None);
        };

        let items = self.get_items(&purchase.id).await?;
        Ok(Some(PurchaseRecord { purchase, items }))
    }

    /// Gets the enriched lines of a purchase, in insertion order.
    pub async fn get_items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItemDetail>> {
        let items = sqlx::query_as::<_, PurchaseItemDetail>(
            r#"
            SELECT
                pi.id, pi.purchase_id, pi.product_id,
                pi.quantity, pi.unit_price_cents, pi.total_price_cents,
                p.name AS product_name, p.sku
            FROM purchase_items pi
            JOIN products p ON pi.product_id = p.id
            WHERE pi.purchase_id = ?1
            ORDER BY pi.rowid
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists purchases, newest first, filterable by supplier and date range.
    pub async fn list(&self, filter: &PurchaseFilter) -> DbResult<Page<Purchase>> {
        let page = filter.page.max(1);
        let limit = filter.limit.max(1);
        let offset = (page - 1) * limit;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM purchases WHERE 1=1");
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM purchases WHERE 1=1");

        if let Some(supplier_id) = &filter.supplier_id {
            query.push(" AND supplier_id = ").push_bind(supplier_id);
            count.push(" AND supplier_id = ").push_bind(supplier_id);
        }
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

        let purchases = query
            .build_query_as::<Purchase>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(Page::new(purchases, page, limit, total))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;
    use crate::repository::supplier::{NewSupplier, SupplierPatch};

    async fn setup() -> (Database, Supplier, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let supplier = db
            .suppliers()
            .create(NewSupplier {
                name: "Metro Wholesale".to_string(),
                contact_person: None,
                email: None,
                phone: None,
                address: None,
            })
            .await
            .unwrap();

        let product = db
            .products()
            .create(NewProduct {
                sku: "PUR-T-001".to_string(),
                name: "Restock Target".to_string(),
                description: None,
                category_id: None,
                unit_price_cents: 500,
                cost_price_cents: 300,
                stock_quantity: 5,
                min_stock_level: 10,
                unit: "pcs".to_string(),
            })
            .await
            .unwrap();

        (db, supplier, product)
    }

    fn purchase_of(supplier_id: &str, product_id: &str, quantity: i64) -> NewPurchase {
        NewPurchase {
            supplier_id: supplier_id.to_string(),
            items: vec![NewPurchaseItem {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents: 300,
            }],
            discount_cents: 0,
            tax_cents: 0,
            payment_status: PaymentStatus::Pending,
            user_id: "tester".to_string(),
        }
    }

    #[tokio::test]
    async fn test_purchase_increments_stock() {
        let (db, supplier, product) = setup().await;

        let record = db
            .purchases()
            .create(purchase_of(&supplier.id, &product.id, 40))
            .await
            .unwrap();

        assert!(record.purchase.invoice_number.starts_with("PUR-"));
        assert_eq!(record.purchase.total_amount_cents, 40 * 300);
        assert_eq!(record.purchase.payment_status, PaymentStatus::Pending);

        let after = db.products().get(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 45);
    }

    #[tokio::test]
    async fn test_unknown_supplier_rejected() {
        let (db, _supplier, product) = setup().await;

        let err = db
            .purchases()
            .create(purchase_of("no-such-supplier", &product.id, 10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::SupplierNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_supplier_rejected() {
        let (db, supplier, product) = setup().await;
        db.suppliers()
            .update(
                &supplier.id,
                SupplierPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = db
            .purchases()
            .create(purchase_of(&supplier.id, &product.id, 10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::SupplierInactive { .. })
        ));

        // No stock movement from the rejected purchase
        let after = db.products().get(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_empty_purchase_rejected() {
        let (db, supplier, _product) = setup().await;
        let mut input = purchase_of(&supplier.id, "x", 1);
        input.items.clear();

        let err = db.purchases().create(input).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::EmptyTransaction { kind: "Purchase" })
        ));
    }

    #[tokio::test]
    async fn test_set_payment_status() {
        let (db, supplier, product) = setup().await;
        let record = db
            .purchases()
            .create(purchase_of(&supplier.id, &product.id, 10))
            .await
            .unwrap();

        let updated = db
            .purchases()
            .set_payment_status(&record.purchase.id, PaymentStatus::Paid)
            .await
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Paid);

        let err = db
            .purchases()
            .set_payment_status("no-such-purchase", PaymentStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_by_supplier() {
        let (db, supplier, product) = setup().await;
        db.purchases()
            .create(purchase_of(&supplier.id, &product.id, 5))
            .await
            .unwrap();

        let other = db
            .suppliers()
            .create(NewSupplier {
                name: "FreshLine".to_string(),
                contact_person: None,
                email: None,
                phone: None,
                address: None,
            })
            .await
            .unwrap();

        let filter = PurchaseFilter {
            supplier_id: Some(supplier.id.clone()),
            ..Default::default()
        };
        assert_eq!(db.purchases().list(&filter).await.unwrap().total, 1);

        let filter = PurchaseFilter {
            supplier_id: Some(other.id.clone()),
            ..Default::default()
        };
        assert_eq!(db.purchases().list(&filter).await.unwrap().total, 0);
    }
}
