use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::Trashed;
use crate::error::AppError;
use crate::models::{CastMember, CastMemberRequest};

pub async fn list(pool: &PgPool, trashed: Trashed) -> Result<Vec<CastMember>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM cast_members m WHERE {} ORDER BY m.created_at DESC",
        trashed.filter("m")
    );
    sqlx::query_as::<_, CastMember>(&sql).fetch_all(pool).await
}

pub async fn find(pool: &PgPool, id: Uuid, trashed: Trashed) -> Result<CastMember, AppError> {
    let sql = format!("SELECT * FROM cast_members m WHERE m.id = $1 AND {}", trashed.filter("m"));
    sqlx::query_as::<_, CastMember>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound { entity: "cast member", id })
}

pub async fn insert(pool: &PgPool, request: &CastMemberRequest) -> Result<CastMember, sqlx::Error> {
    let now = Utc::now().naive_utc();
    sqlx::query_as::<_, CastMember>(
        "INSERT INTO cast_members (id, name, type, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&request.name)
    .bind(request.member_type)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    request: &CastMemberRequest,
) -> Result<CastMember, AppError> {
    sqlx::query_as::<_, CastMember>(
        "UPDATE cast_members SET name = $1, type = $2, updated_at = $3 \
         WHERE id = $4 AND deleted_at IS NULL RETURNING *",
    )
    .bind(&request.name)
    .bind(request.member_type)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound { entity: "cast member", id })
}
