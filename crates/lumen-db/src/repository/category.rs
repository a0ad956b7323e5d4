//! # Category Repository
//!
//! CRUD for product categories. Names are unique; a category cannot be
//! deleted while products still reference it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use lumen_core::validation::validate_name;
use lumen_core::{Category, CoreError};

/// Input for creating or renaming a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category with a unique name.
    pub async fn create(&self, input: NewCategory) -> DbResult<Category> {
        validate_name("name", &input.name).map_err(CoreError::from)?;

        let taken: Option<i64> = sqlx::query_scalar("SELECT 1 FROM categories WHERE name = ?1")
            .bind(&input.name)
            .fetch_optional(&self.pool)
            .await?;
        if taken.is_some() {
            return Err(DbError::duplicate("Category name", &input.name));
        }

        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(category_id = %id, name = %input.name, "Category created");
        self.get_required(&id).await
    }

    /// Updates a category's name and description.
    pub async fn update(&self, id: &str, input: NewCategory) -> DbResult<Category> {
        validate_name("name", &input.name).map_err(CoreError::from)?;

        let existing = self.get_required(id).await?;
        if input.name != existing.name {
            let taken: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM categories WHERE name = ?1 AND id != ?2")
                    .bind(&input.name)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
            if taken.is_some() {
                return Err(DbError::duplicate("Category name", &input.name));
            }
        }

        sqlx::query("UPDATE categories SET name = ?1, description = ?2 WHERE id = ?3")
            .bind(&input.name)
            .bind(&input.description)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.get_required(id).await
    }

    /// Deletes a category. Refused while any product references it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let _ = self.get_required(id).await?;

        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if products > 0 {
            return Err(DbError::in_use("Category", "products"));
        }

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Gets a category by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn get_required(&self, id: &str) -> DbResult<Category> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Lists all categories alphabetically. The catalog is small enough
    /// that this endpoint is not paginated.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }
}

// =============================================================================
// Tests
// =============================================================================
