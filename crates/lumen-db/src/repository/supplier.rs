//! # Supplier Repository
//!
//! CRUD for suppliers. A supplier with purchase history cannot be deleted
//! at all (old purchases keep their counterparty); retiring one is an
//! `is_active` update.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use lumen_core::validation::validate_name;
use lumen_core::{CoreError, Page, Supplier};

/// Input for creating a supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Partial update for a supplier. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplierPatch {
    pub name: Option<String>,
    pub contact_person: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Filters for the paginated supplier list.
#[derive(Debug, Clone)]
pub struct SupplierFilter {
    pub page: u32,
    pub limit: u32,
    /// Matches against name and contact person, case-insensitive substring.
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl Default for SupplierFilter {
    fn default() -> Self {
        SupplierFilter {
            page: 1,
            limit: 10,
            search: None,
            include_inactive: false,
        }
    }
}

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Creates a supplier.
    pub async fn create(&self, input: NewSupplier) -> DbResult<Supplier> {
        validate_name("name", &input.name).map_err(CoreError::from)?;

        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, name, contact_person, email, phone, address, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
            "#,
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(supplier_id = %id, name = %input.name, "Supplier created");
        self.get_required(&id).await
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, patch: SupplierPatch) -> DbResult<Supplier> {
        let _ = self.get_required(id).await?;

        if let Some(name) = &patch.name {
            validate_name("name", name).map_err(CoreError::from)?;
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE suppliers SET id = id");

        if let Some(name) = &patch.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(contact_person) = &patch.contact_person {
            query.push(", contact_person = ").push_bind(contact_person);
        }
        if let Some(email) = &patch.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(phone) = &patch.phone {
            query.push(", phone = ").push_bind(phone);
        }
        if let Some(address) = &patch.address {
            query.push(", address = ").push_bind(address);
        }
        if let Some(active) = patch.is_active {
            query.push(", is_active = ").push_bind(active);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.build().execute(&self.pool).await?;

        self.get_required(id).await
    }

    /// Deletes a supplier. Refused while any purchase references it; a
    /// retired supplier with history is deactivated via [`Self::update`]
    /// instead.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let _ = self.get_required(id).await?;

        let purchases: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE supplier_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if purchases > 0 {
            return Err(DbError::in_use("Supplier", "purchases"));
        }

        sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }

    /// Gets a supplier by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    async fn get_required(&self, id: &str) -> DbResult<Supplier> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    /// Lists suppliers alphabetically with search and activity filters.
    pub async fn list(&self, filter: &SupplierFilter) -> DbResult<Page<Supplier>> {
        let page = filter.page.max(1);
        let limit = filter.limit.max(1);
        let offset = (page - 1) * limit;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM suppliers WHERE 1=1");
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM suppliers WHERE 1=1");

        if !filter.include_inactive {
            query.push(" AND is_active = 1");
            count.push(" AND is_active = 1");
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            query
                .push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR contact_person LIKE ")
                .push_bind(pattern.clone())
                .push(")");
            count
                .push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR contact_person LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query
            .push(" ORDER BY name LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let suppliers = query
            .build_query_as::<Supplier>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(Page::new(suppliers, page, limit, total))
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
    use crate::repository::purchase::{NewPurchase, NewPurchaseItem};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_supplier(name: &str) -> NewSupplier {
        NewSupplier {
            name: name.to_string(),
            contact_person: Some("Anna Keller".to_string()),
            email: None,
            phone: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_create_update_list() {
        let db = setup().await;
        let supplier = db.suppliers().create(new_supplier("Metro Wholesale")).await.unwrap();
        assert!(supplier.is_active);

        let updated = db
            .suppliers()
            .update(
                &supplier.id,
                SupplierPatch {
                    phone: Some(Some("+49 30 1234".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+49 30 1234"));
        assert_eq!(updated.name, "Metro Wholesale");

        let filter = SupplierFilter {
            search: Some("keller".to_string()),
            ..Default::default()
        };
        assert_eq!(db.suppliers().list(&filter).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_delete_without_history_is_hard() {
        let db = setup().await;
        let supplier = db.suppliers().create(new_supplier("Ephemeral")).await.unwrap();

        db.suppliers().delete(&supplier.id).await.unwrap();
        assert!(db.suppliers().get(&supplier.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_refused_while_purchases_reference() {
        let db = setup().await;
        let supplier = db.suppliers().create(new_supplier("Metro Wholesale")).await.unwrap();
        let product = db
            .products()
            .create(NewProduct {
                sku: "SUP-T-001".to_string(),
                name: "Restock Target".to_string(),
                description: None,
                category_id: None,
                unit_price_cents: 500,
                cost_price_cents: 300,
                stock_quantity: 0,
                min_stock_level: 10,
                unit: "pcs".to_string(),
            })
            .await
            .unwrap();

        db.purchases()
            .create(NewPurchase {
                supplier_id: supplier.id.clone(),
                items: vec![NewPurchaseItem {
                    product_id: product.id.clone(),
                    quantity: 10,
                    unit_price_cents: 300,
                }],
                discount_cents: 0,
                tax_cents: 0,
                payment_status: Default::default(),
                user_id: "tester".to_string(),
            })
            .await
            .unwrap();

        let err = db.suppliers().delete(&supplier.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::InUse {
                ref entity,
                ref referenced_by,
            } if entity == "Supplier" && referenced_by == "purchases"
        ));

        // Still there, still active; retiring it is an explicit update.
        let after = db.suppliers().get(&supplier.id).await.unwrap().unwrap();
        assert!(after.is_active);
    }
}
