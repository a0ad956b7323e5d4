//! # Product Repository
//!
//! Catalog CRUD for products: paginated search, SKU-unique writes, stock
//! adjustment, and the low-stock view the dashboard leans on.
//!
//! Deletion is a soft delete (`is_active = 0`) whenever the product has
//! transaction history, so past sale and purchase lines keep a valid
//! product to join against. A product with no history may be removed
//! outright.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use lumen_core::validation::{validate_name, validate_price_cents, validate_sku};
use lumen_core::{CoreError, Page, Product, ValidationError};

// =============================================================================
// Request Types
// =============================================================================

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub cost_price_cents: i64,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default = "default_min_stock")]
    pub min_stock_level: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_min_stock() -> i64 {
    10
}

fn default_unit() -> String {
    "pcs".to_string()
}

/// Partial update for a product. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Option<String>>,
    pub unit_price_cents: Option<i64>,
    pub cost_price_cents: Option<i64>,
    pub min_stock_level: Option<i64>,
    pub unit: Option<String>,
    pub is_active: Option<bool>,
}

/// Filters for the paginated product list.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub page: u32,
    pub limit: u32,
    /// Matches against name and SKU, case-insensitive substring.
    pub search: Option<String>,
    pub category_id: Option<String>,
    /// When false (the default), soft-deleted products are hidden.
    pub include_inactive: bool,
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter {
            page: 1,
            limit: 10,
            search: None,
            category_id: None,
            include_inactive: false,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product. The SKU must be unique across the catalog,
    /// including soft-deleted products.
    pub async fn create(&self, input: NewProduct) -> DbResult<Product> {
        validate_sku(&input.sku).map_err(CoreError::from)?;
        validate_name("name", &input.name).map_err(CoreError::from)?;
        validate_price_cents(input.unit_price_cents).map_err(CoreError::from)?;
        validate_price_cents(input.cost_price_cents).map_err(CoreError::from)?;
        if input.stock_quantity < 0 {
            return Err(CoreError::from(ValidationError::MustNotBeNegative {
                field: "stock_quantity".to_string(),
            })
            .into());
        }

        if self.get_by_sku(&input.sku).await?.is_some() {
            return Err(DbError::duplicate("SKU", &input.sku));
        }

        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, category_id,
                unit_price_cents, cost_price_cents, stock_quantity,
                min_stock_level, unit, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, ?11)
            "#,
        )
        .bind(&id)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category_id)
        .bind(input.unit_price_cents)
        .bind(input.cost_price_cents)
        .bind(input.stock_quantity)
        .bind(input.min_stock_level)
        .bind(&input.unit)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(product_id = %id, sku = %input.sku, "Product created");
        self.get_required(&id).await
    }

    /// Applies a partial update. Changing the SKU checks uniqueness against
    /// every other product first.
    pub async fn update(&self, id: &str, patch: ProductPatch) -> DbResult<Product> {
        let existing = self.get_required(id).await?;

        if let Some(sku) = &patch.sku {
            validate_sku(sku).map_err(CoreError::from)?;
            if sku != &existing.sku {
                if let Some(other) = self.get_by_sku(sku).await? {
                    if other.id != existing.id {
                        return Err(DbError::duplicate("SKU", sku));
                    }
                }
            }
        }
        if let Some(name) = &patch.name {
            validate_name("name", name).map_err(CoreError::from)?;
        }
        if let Some(price) = patch.unit_price_cents {
            validate_price_cents(price).map_err(CoreError::from)?;
        }
        if let Some(cost) = patch.cost_price_cents {
            validate_price_cents(cost).map_err(CoreError::from)?;
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE products SET updated_at = ");
        query.push_bind(Utc::now());

        if let Some(sku) = &patch.sku {
            query.push(", sku = ").push_bind(sku);
        }
        if let Some(name) = &patch.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(description) = &patch.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(category_id) = &patch.category_id {
            query.push(", category_id = ").push_bind(category_id);
        }
        if let Some(price) = patch.unit_price_cents {
            query.push(", unit_price_cents = ").push_bind(price);
        }
        if let Some(cost) = patch.cost_price_cents {
            query.push(", cost_price_cents = ").push_bind(cost);
        }
        if let Some(level) = patch.min_stock_level {
            query.push(", min_stock_level = ").push_bind(level);
        }
        if let Some(unit) = &patch.unit {
            query.push(", unit = ").push_bind(unit);
        }
        if let Some(active) = patch.is_active {
            query.push(", is_active = ").push_bind(active);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.build().execute(&self.pool).await?;

        debug!(product_id = %id, "Product updated");
        self.get_required(id).await
    }

    /// Sets the stock level directly (inventory correction, not a
    /// transaction). Negative targets are rejected.
    pub async fn update_stock(&self, id: &str, stock_quantity: i64) -> DbResult<Product> {
        if stock_quantity < 0 {
            return Err(CoreError::from(ValidationError::MustNotBeNegative {
                field: "stock_quantity".to_string(),
            })
            .into());
        }

        let result = sqlx::query(
            "UPDATE products SET stock_quantity = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(stock_quantity)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(product_id = %id, stock_quantity, "Stock level corrected");
        self.get_required(id).await
    }

    /// Deletes a product: hard delete when it has no transaction history,
    /// soft delete (deactivation) when sale or purchase lines reference it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let _ = self.get_required(id).await?;

        let references: i64 = sqlx::query_scalar(
            r#"
            SELECT (SELECT COUNT(*) FROM sale_items WHERE product_id = ?1)
                 + (SELECT COUNT(*) FROM purchase_items WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if references > 0 {
            sqlx::query(
                "UPDATE products SET is_active = 0, updated_at = ?1 WHERE id = ?2",
            )
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
            info!(product_id = %id, references, "Product deactivated (has transaction history)");
        } else {
            sqlx::query("DELETE FROM product_group_items WHERE product_id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            sqlx::query("DELETE FROM products WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            info!(product_id = %id, "Product deleted");
        }

        Ok(())
    }

    /// Gets a product by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Gets a product by its SKU business key.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = ?1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn get_required(&self, id: &str) -> DbResult<Product> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Lists products alphabetically with search, category, and activity
    /// filters.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Page<Product>> {
        let page = filter.page.max(1);
        let limit = filter.limit.max(1);
        let offset = (page - 1) * limit;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM products WHERE 1=1");
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products WHERE 1=1");

        if !filter.include_inactive {
            query.push(" AND is_active = 1");
            count.push(" AND is_active = 1");
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            query
                .push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR sku LIKE ")
                .push_bind(pattern.clone())
                .push(")");
            count
                .push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR sku LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category_id) = &filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
            count.push(" AND category_id = ").push_bind(category_id);
        }

        query
            .push(" ORDER BY name LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let products = query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(Page::new(products, page, limit, total))
    }

    /// Lists active products at or below their minimum stock level, lowest
    /// stock first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1 AND stock_quantity <= min_stock_level
            ORDER BY stock_quantity ASC, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Counts active products.
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================
