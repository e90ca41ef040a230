use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::Trashed;
use crate::error::AppError;
use crate::models::{Category, CategoryRequest};

pub async fn list(pool: &PgPool, trashed: Trashed) -> Result<Vec<Category>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM categories c WHERE {} ORDER BY c.created_at DESC",
        trashed.filter("c")
    );
    sqlx::query_as::<_, Category>(&sql).fetch_all(pool).await
}

pub async fn find(pool: &PgPool, id: Uuid, trashed: Trashed) -> Result<Category, AppError> {
    let sql = format!("SELECT * FROM categories c WHERE c.id = $1 AND {}", trashed.filter("c"));
    sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound { entity: "category", id })
}

pub async fn insert(pool: &PgPool, request: &CategoryRequest) -> Result<Category, sqlx::Error> {
    let now = Utc::now().naive_utc();
    sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, description, is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $5) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&request.name)
    .bind(&request.description)
    .bind(request.is_active)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, id: Uuid, request: &CategoryRequest) -> Result<Category, AppError> {
    sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $1, description = $2, is_active = $3, updated_at = $4 \
         WHERE id = $5 AND deleted_at IS NULL RETURNING *",
    )
    .bind(&request.name)
    .bind(&request.description)
    .bind(request.is_active)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound { entity: "category", id })
}

/// Live categories linked to `owner_id` through `join_table`.
pub async fn linked_to(
    conn: &mut PgConnection,
    join_table: &'static str,
    owner_column: &'static str,
    owner_id: Uuid,
) -> Result<Vec<Category>, sqlx::Error> {
    let sql = format!(
        "SELECT c.* FROM categories c JOIN {join} j ON j.category_id = c.id \
         WHERE j.{owner} = $1 AND c.deleted_at IS NULL ORDER BY c.name",
        join = join_table,
        owner = owner_column
    );
    sqlx::query_as::<_, Category>(&sql)
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await
}
