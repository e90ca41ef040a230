//! SQL access for the catalog tables.
//!
//! Every catalog table carries a `deleted_at` tombstone. Reads filter on
//! `deleted_at IS NULL` unless the caller opts into [`Trashed::Include`].

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

pub mod cast_members;
pub mod categories;
pub mod genres;
pub mod relations;
pub mod videos;

/// Whether soft-deleted rows are visible to a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trashed {
    #[default]
    Exclude,
    Include,
}

impl Trashed {
    pub fn from_flag(with_trashed: bool) -> Self {
        if with_trashed {
            Trashed::Include
        } else {
            Trashed::Exclude
        }
    }

    /// `WHERE` fragment for `alias.deleted_at`.
    pub(crate) fn filter(self, alias: &str) -> String {
        match self {
            Trashed::Exclude => format!("{}.deleted_at IS NULL", alias),
            Trashed::Include => "TRUE".to_string(),
        }
    }
}

/// A table whose rows can be soft-deleted and restored.
#[derive(Debug, Clone, Copy)]
pub struct SoftDeletable {
    pub table: &'static str,
    pub entity: &'static str,
}

pub const CATEGORIES: SoftDeletable = SoftDeletable { table: "categories", entity: "category" };
pub const GENRES: SoftDeletable = SoftDeletable { table: "genres", entity: "genre" };
pub const CAST_MEMBERS: SoftDeletable = SoftDeletable { table: "cast_members", entity: "cast member" };
pub const VIDEOS: SoftDeletable = SoftDeletable { table: "videos", entity: "video" };

impl SoftDeletable {
    /// Stamps `deleted_at`; a row that is missing or already deleted is `NotFound`.
    pub async fn soft_delete(&self, pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let sql = format!(
            "UPDATE {} SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(Utc::now().naive_utc())
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound { entity: self.entity, id });
        }
        Ok(())
    }

    /// Clears `deleted_at`. Restoring a live row is a no-op; a missing row is `NotFound`.
    pub async fn restore(&self, pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let sql = format!(
            "UPDATE {} SET deleted_at = NULL, updated_at = $1 WHERE id = $2",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(Utc::now().naive_utc())
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound { entity: self.entity, id });
        }
        Ok(())
    }
}
