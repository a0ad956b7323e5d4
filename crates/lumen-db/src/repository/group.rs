//! # Product Group Repository
//!
//! Named product bundles and their membership. Membership updates are
//! replace-set: the caller sends the complete desired list and the old
//! rows are deleted and reinserted inside one transaction, so the stored
//! membership always equals the last submitted list exactly. Applying the
//! same list twice is a no-op.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use lumen_core::validation::{validate_name, validate_quantity};
use lumen_core::{
    CoreError, Page, ProductGroup, ProductGroupItemDetail, ProductGroupRecord, ProductGroupSummary,
};

// =============================================================================
// Request Types
// =============================================================================

/// One desired membership row: which product and how many of it the group
/// adds to a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub product_id: String,
    #[serde(default = "default_member_quantity")]
    pub quantity: i64,
}

fn default_member_quantity() -> i64 {
    1
}

/// Input for creating a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// The complete initial membership; must be non-empty.
    pub products: Vec<GroupMember>,
}

/// Partial update for a group. `None` fields are left untouched;
/// `products: Some(..)` replaces the entire membership.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub products: Option<Vec<GroupMember>>,
}

/// Filters for the paginated group list.
#[derive(Debug, Clone)]
pub struct GroupFilter {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl Default for GroupFilter {
    fn default() -> Self {
        GroupFilter {
            page: 1,
            limit: 10,
            search: None,
            include_inactive: false,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product group database operations.
#[derive(Debug, Clone)]
pub struct ProductGroupRepository {
    pool: SqlitePool,
}

impl ProductGroupRepository {
    /// Creates a new ProductGroupRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductGroupRepository { pool }
    }

    /// Creates a group and its initial membership in one transaction.
    pub async fn create(&self, input: NewGroup) -> DbResult<ProductGroupRecord> {
        validate_name("name", &input.name).map_err(CoreError::from)?;
        if input.products.is_empty() {
            return Err(CoreError::EmptyGroup.into());
        }
        for member in &input.products {
            validate_quantity(member.quantity).map_err(CoreError::from)?;
        }

        let mut tx = self.pool.begin().await?;

        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO product_groups (id, name, description, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_members(&mut tx, &id, &input.products).await?;
        tx.commit().await?;

        info!(group_id = %id, name = %input.name, members = input.products.len(), "Product group created");
        self.get_required(&id).await
    }

    /// Applies a partial update. When `products` is present the stored
    /// membership is deleted and rebuilt from the submitted list, all
    /// inside the same transaction as the header change.
    pub async fn update(&self, id: &str, patch: GroupPatch) -> DbResult<ProductGroupRecord> {
        let existing = self.get_required(id).await?;

        if let Some(name) = &patch.name {
            validate_name("name", name).map_err(CoreError::from)?;
        }
        if let Some(products) = &patch.products {
            if products.is_empty() {
                return Err(CoreError::EmptyGroup.into());
            }
            for member in products {
                validate_quantity(member.quantity).map_err(CoreError::from)?;
            }
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE product_groups
            SET name = ?1, description = ?2, is_active = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(patch.name.as_deref().unwrap_or(&existing.group.name))
        .bind(
            patch
                .description
                .unwrap_or(existing.group.description.clone()),
        )
        .bind(patch.is_active.unwrap_or(existing.group.is_active))
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(products) = &patch.products {
            debug!(group_id = %id, members = products.len(), "Replacing group membership");
            sqlx::query("DELETE FROM product_group_items WHERE group_id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_members(&mut tx, id, products).await?;
        }

        tx.commit().await?;
        self.get_required(id).await
    }

    /// Deletes a group. Membership rows cascade.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM product_groups WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product group", id));
        }

        info!(group_id = %id, "Product group deleted");
        Ok(())
    }

    /// Gets a group with its enriched membership.
    pub async fn get(&self, id: &str) -> DbResult<Option<ProductGroupRecord>> {
        let group =
            sqlx::query_as::<_, ProductGroup>("SELECT * FROM product_groups WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(group) = group else {
            return Ok(None);
        };

        let products = sqlx::query_as::<_, ProductGroupItemDetail>(
            r#"
            SELECT
                gi.id, gi.group_id, gi.product_id, gi.quantity,
                p.name AS product_name, p.sku, p.unit_price_cents, p.stock_quantity
            FROM product_group_items gi
            JOIN products p ON gi.product_id = p.id
            WHERE gi.group_id = ?1
            ORDER BY p.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProductGroupRecord { group, products }))
    }

    async fn get_required(&self, id: &str) -> DbResult<ProductGroupRecord> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product group", id))
    }

    /// Lists groups with their membership counts, alphabetically.
    pub async fn list(&self, filter: &GroupFilter) -> DbResult<Page<ProductGroupSummary>> {
        let page = filter.page.max(1);
        let limit = filter.limit.max(1);
        let offset = (page - 1) * limit;

        let mut query = sqlx::QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                g.id, g.name, g.description, g.is_active, g.created_at, g.updated_at,
                (SELECT COUNT(*) FROM product_group_items gi WHERE gi.group_id = g.id)
                    AS product_count
            FROM product_groups g
            WHERE 1=1
            "#,
        );
        let mut count =
            sqlx::QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM product_groups g WHERE 1=1");

        if !filter.include_inactive {
            query.push(" AND g.is_active = 1");
            count.push(" AND g.is_active = 1");
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            query.push(" AND g.name LIKE ").push_bind(pattern.clone());
            count.push(" AND g.name LIKE ").push_bind(pattern);
        }

        query
            .push(" ORDER BY g.name LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let groups = query
            .build_query_as::<ProductGroupSummary>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(Page::new(groups, page, limit, total))
    }
}

/// Inserts membership rows, verifying each product exists.
async fn insert_members(
    tx: &mut Transaction<'_, Sqlite>,
    group_id: &str,
    members: &[GroupMember],
) -> DbResult<()> {
    for member in members {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(&member.product_id)
            .fetch_optional(&mut **tx)
            .await?;
        if exists.is_none() {
            return Err(CoreError::ProductNotFound(member.product_id.clone()).into());
        }

        sqlx::query(
            r#"
            INSERT INTO product_group_items (id, group_id, product_id, quantity)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(generate_id())
        .bind(group_id)
        .bind(&member.product_id)
        .bind(member.quantity)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;

    async fn setup() -> (Database, Vec<String>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut ids = Vec::new();
        for i in 0..3 {
            let product = db
                .products()
                .create(NewProduct {
                    sku: format!("GRP-{:03}", i),
                    name: format!("Bundle Part {i}"),
                    description: None,
                    category_id: None,
                    unit_price_cents: 500,
                    cost_price_cents: 300,
                    stock_quantity: 10,
                    min_stock_level: 5,
                    unit: "pcs".to_string(),
                })
                .await
                .unwrap();
            ids.push(product.id);
        }

        (db, ids)
    }

    fn members(ids: &[String]) -> Vec<GroupMember> {
        ids.iter()
            .map(|id| GroupMember {
                product_id: id.clone(),
                quantity: 1,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (db, ids) = setup().await;

        let record = db
            .groups()
            .create(NewGroup {
                name: "Breakfast Bundle".to_string(),
                description: None,
                products: members(&ids[..2]),
            })
            .await
            .unwrap();

        assert_eq!(record.products.len(), 2);
        assert!(record.group.is_active);

        let fetched = db.groups().get(&record.group.id).await.unwrap().unwrap();
        assert_eq!(fetched.products.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_membership_rejected() {
        let (db, _ids) = setup().await;

        let err = db
            .groups()
            .create(NewGroup {
                name: "Empty".to_string(),
                description: None,
                products: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyGroup)));
    }

    #[tokio::test]
    async fn test_membership_replace_is_exact_and_idempotent() {
        let (db, ids) = setup().await;

        let record = db
            .groups()
            .create(NewGroup {
                name: "Bundle".to_string(),
                description: None,
                products: members(&ids[..2]),
            })
            .await
            .unwrap();

        // Replace with a different set: stored membership equals it exactly.
        let replacement = members(&ids[1..]);
        let updated = db
            .groups()
            .update(
                &record.group.id,
                GroupPatch {
                    products: Some(replacement.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let mut got: Vec<_> = updated.products.iter().map(|p| p.product_id.clone()).collect();
        got.sort();
        let mut want = vec![ids[1].clone(), ids[2].clone()];
        want.sort();
        assert_eq!(got, want);

        // Applying the same list again changes nothing.
        let again = db
            .groups()
            .update(
                &record.group.id,
                GroupPatch {
                    products: Some(replacement),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let mut got_again: Vec<_> =
            again.products.iter().map(|p| p.product_id.clone()).collect();
        got_again.sort();
        assert_eq!(got_again, want);
    }

    #[tokio::test]
    async fn test_update_without_products_keeps_membership() {
        let (db, ids) = setup().await;

        let record = db
            .groups()
            .create(NewGroup {
                name: "Bundle".to_string(),
                description: None,
                products: members(&ids),
            })
            .await
            .unwrap();

        let updated = db
            .groups()
            .update(
                &record.group.id,
                GroupPatch {
                    name: Some("Renamed Bundle".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.group.name, "Renamed Bundle");
        assert_eq!(updated.products.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_product_in_membership_rejected() {
        let (db, ids) = setup().await;

        let mut products = members(&ids[..1]);
        products.push(GroupMember {
            product_id: "no-such-product".to_string(),
            quantity: 1,
        });

        let err = db
            .groups()
            .create(NewGroup {
                name: "Broken".to_string(),
                description: None,
                products,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ProductNotFound(_))
        ));

        // The rejected create left no half-written group behind.
        let listed = db.groups().list(&GroupFilter::default()).await.unwrap();
        assert_eq!(listed.total, 0);
    }

    #[tokio::test]
    async fn test_list_reports_member_counts() {
        let (db, ids) = setup().await;

        db.groups()
            .create(NewGroup {
                name: "Bundle".to_string(),
                description: None,
                products: members(&ids),
            })
            .await
            .unwrap();

        let listed = db.groups().list(&GroupFilter::default()).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].product_count, 3);
    }

    #[tokio::test]
    async fn test_delete_cascades_membership() {
        let (db, ids) = setup().await;

        let record = db
            .groups()
            .create(NewGroup {
                name: "Bundle".to_string(),
                description: None,
                products: members(&ids),
            })
            .await
            .unwrap();

        db.groups().delete(&record.group.id).await.unwrap();
        assert!(db.groups().get(&record.group.id).await.unwrap().is_none());

        let err = db.groups().delete(&record.group.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
