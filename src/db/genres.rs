use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::relations::GENRE_CATEGORIES;
use super::{categories, Trashed};
use crate::coordinator::RecordWrite;
use crate::error::AppError;
use crate::models::{Genre, GenreRequest, GenreResource, WriteMode};

pub async fn list(pool: &PgPool, trashed: Trashed) -> Result<Vec<Genre>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM genres g WHERE {} ORDER BY g.created_at DESC",
        trashed.filter("g")
    );
    sqlx::query_as::<_, Genre>(&sql).fetch_all(pool).await
}

pub async fn find(conn: &mut PgConnection, id: Uuid, trashed: Trashed) -> Result<Genre, AppError> {
    let sql = format!("SELECT * FROM genres g WHERE g.id = $1 AND {}", trashed.filter("g"));
    sqlx::query_as::<_, Genre>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound { entity: "genre", id })
}

pub async fn find_resource(
    conn: &mut PgConnection,
    id: Uuid,
    trashed: Trashed,
) -> Result<GenreResource, AppError> {
    let genre = find(&mut *conn, id, trashed).await?;
    let categories = categories::linked_to(
        &mut *conn,
        GENRE_CATEGORIES.join_table,
        GENRE_CATEGORIES.owner_column,
        id,
    )
    .await?;
    Ok(GenreResource { genre, categories })
}

/// Live genres linked to `owner_id` through `join_table`.
pub async fn linked_to(
    conn: &mut PgConnection,
    join_table: &'static str,
    owner_column: &'static str,
    owner_id: Uuid,
) -> Result<Vec<Genre>, sqlx::Error> {
    let sql = format!(
        "SELECT g.* FROM genres g JOIN {join} j ON j.genre_id = g.id \
         WHERE j.{owner} = $1 AND g.deleted_at IS NULL ORDER BY g.name",
        join = join_table,
        owner = owner_column
    );
    sqlx::query_as::<_, Genre>(&sql)
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await
}

/// Genres among `genre_ids` related to none of `category_ids`. The matching
/// `category_genre` rows stay share-locked until the transaction ends.
pub async fn outside_categories(
    conn: &mut PgConnection,
    genre_ids: &[Uuid],
    category_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    let covered = sqlx::query_scalar::<_, Uuid>(
        "SELECT genre_id FROM category_genre \
         WHERE genre_id = ANY($1) AND category_id = ANY($2) FOR SHARE",
    )
    .bind(genre_ids)
    .bind(category_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(genre_ids
        .iter()
        .filter(|id| !covered.contains(id))
        .copied()
        .collect())
}

pub struct GenreWrite<'a> {
    id: Uuid,
    mode: WriteMode,
    request: &'a GenreRequest,
}

impl<'a> GenreWrite<'a> {
    pub fn create(request: &'a GenreRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: WriteMode::Create,
            request,
        }
    }

    pub fn update(id: Uuid, request: &'a GenreRequest) -> Self {
        Self {
            id,
            mode: WriteMode::Update,
            request,
        }
    }
}

#[async_trait]
impl<'a> RecordWrite for GenreWrite<'a> {
    type Record = GenreResource;

    fn table(&self) -> &'static str {
        "genres"
    }

    fn entity(&self) -> &'static str {
        "genre"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    async fn write(&self, conn: &mut PgConnection) -> Result<(), AppError> {
        let now = Utc::now().naive_utc();
        match self.mode {
            WriteMode::Create => {
                sqlx::query(
                    "INSERT INTO genres (id, name, is_active, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $4)",
                )
                .bind(self.id)
                .bind(&self.request.name)
                .bind(self.request.is_active)
                .bind(now)
                .execute(&mut *conn)
                .await?;
            }
            WriteMode::Update => {
                let result = sqlx::query(
                    "UPDATE genres SET name = $1, is_active = $2, updated_at = $3 \
                     WHERE id = $4 AND deleted_at IS NULL",
                )
                .bind(&self.request.name)
                .bind(self.request.is_active)
                .bind(now)
                .bind(self.id)
                .execute(&mut *conn)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound { entity: "genre", id: self.id });
                }
            }
        }
        Ok(())
    }

    async fn reload(&self, conn: &mut PgConnection) -> Result<GenreResource, AppError> {
        find_resource(conn, self.id, Trashed::Exclude).await
    }
}
