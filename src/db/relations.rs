//! Join-table maintenance for many-to-many associations.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::AppError;

/// Static description of one side of an N:M join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    /// Request field carrying the identifiers, used in error reports.
    pub field: &'static str,
    pub entity: &'static str,
    pub join_table: &'static str,
    pub owner_column: &'static str,
    pub target_table: &'static str,
    pub target_column: &'static str,
}

pub const GENRE_CATEGORIES: Association = Association {
    field: "categories_id",
    entity: "category",
    join_table: "category_genre",
    owner_column: "genre_id",
    target_table: "categories",
    target_column: "category_id",
};

pub const VIDEO_CATEGORIES: Association = Association {
    field: "categories_id",
    entity: "category",
    join_table: "category_video",
    owner_column: "video_id",
    target_table: "categories",
    target_column: "category_id",
};

pub const VIDEO_GENRES: Association = Association {
    field: "genres_id",
    entity: "genre",
    join_table: "genre_video",
    owner_column: "video_id",
    target_table: "genres",
    target_column: "genre_id",
};

/// Replacement set for one association of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSync {
    pub association: Association,
    pub ids: Vec<Uuid>,
}

impl AssociationSync {
    /// Duplicate identifiers are collapsed, first occurrence wins.
    pub fn new(association: Association, ids: Vec<Uuid>) -> Self {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self { association, ids: unique }
    }

    /// Fails with `AppError::Reference` listing every identifier that is
    /// missing or soft-deleted. Found rows stay share-locked until the
    /// transaction ends so they cannot be deleted underneath the write.
    pub async fn ensure_targets_exist(&self, conn: &mut PgConnection) -> Result<(), AppError> {
        let sql = format!(
            "SELECT id FROM {} WHERE id = ANY($1) AND deleted_at IS NULL FOR SHARE",
            self.association.target_table
        );
        let found = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(self.ids.as_slice())
            .fetch_all(&mut *conn)
            .await?;

        let missing: Vec<Uuid> = self
            .ids
            .iter()
            .filter(|id| !found.contains(id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Reference {
                field: self.association.field,
                entity: self.association.entity,
                missing,
            });
        }
        Ok(())
    }

    /// Deletes the owner's join rows and inserts the replacement set.
    pub async fn apply(&self, conn: &mut PgConnection, owner_id: Uuid) -> Result<(), sqlx::Error> {
        let Association {
            join_table,
            owner_column,
            target_column,
            ..
        } = self.association;

        let delete = format!("DELETE FROM {} WHERE {} = $1", join_table, owner_column);
        sqlx::query(&delete).bind(owner_id).execute(&mut *conn).await?;

        if self.ids.is_empty() {
            return Ok(());
        }

        let insert = format!(
            "INSERT INTO {} ({}, {}) SELECT $1, unnest($2::uuid[])",
            join_table, owner_column, target_column
        );
        sqlx::query(&insert)
            .bind(owner_id)
            .bind(self.ids.as_slice())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
