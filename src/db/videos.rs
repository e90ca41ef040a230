use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::relations::{AssociationSync, VIDEO_CATEGORIES, VIDEO_GENRES};
use super::{categories, genres, Trashed};
use crate::coordinator::RecordWrite;
use crate::error::AppError;
use crate::models::{Video, VideoRequest, VideoResource, WriteMode};

pub async fn list(pool: &PgPool, trashed: Trashed) -> Result<Vec<Video>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM videos v WHERE {} ORDER BY v.created_at DESC",
        trashed.filter("v")
    );
    sqlx::query_as::<_, Video>(&sql).fetch_all(pool).await
}

pub async fn find(conn: &mut PgConnection, id: Uuid, trashed: Trashed) -> Result<Video, AppError> {
    let sql = format!("SELECT * FROM videos v WHERE v.id = $1 AND {}", trashed.filter("v"));
    sqlx::query_as::<_, Video>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound { entity: "video", id })
}

pub async fn find_resource(
    conn: &mut PgConnection,
    id: Uuid,
    trashed: Trashed,
) -> Result<VideoResource, AppError> {
    let video = find(&mut *conn, id, trashed).await?;
    let categories = categories::linked_to(
        &mut *conn,
        VIDEO_CATEGORIES.join_table,
        VIDEO_CATEGORIES.owner_column,
        id,
    )
    .await?;
    let genres = genres::linked_to(
        &mut *conn,
        VIDEO_GENRES.join_table,
        VIDEO_GENRES.owner_column,
        id,
    )
    .await?;
    Ok(VideoResource {
        video,
        categories,
        genres,
    })
}

/// Association replacements carried by a request; omitted lists are left alone.
pub fn association_syncs(request: &VideoRequest) -> Vec<AssociationSync> {
    let mut syncs = Vec::with_capacity(2);
    if let Some(ids) = &request.categories_id {
        syncs.push(AssociationSync::new(VIDEO_CATEGORIES, ids.clone()));
    }
    if let Some(ids) = &request.genres_id {
        syncs.push(AssociationSync::new(VIDEO_GENRES, ids.clone()));
    }
    syncs
}

pub struct VideoWrite<'a> {
    id: Uuid,
    mode: WriteMode,
    request: &'a VideoRequest,
}

impl<'a> VideoWrite<'a> {
    pub fn create(request: &'a VideoRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: WriteMode::Create,
            request,
        }
    }

    pub fn update(id: Uuid, request: &'a VideoRequest) -> Self {
        Self {
            id,
            mode: WriteMode::Update,
            request,
        }
    }
}

#[async_trait]
impl<'a> RecordWrite for VideoWrite<'a> {
    type Record = VideoResource;

    fn table(&self) -> &'static str {
        "videos"
    }

    fn entity(&self) -> &'static str {
        "video"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    /// Each genre must belong to at least one of the video's categories.
    /// Checked only when the request carries both lists.
    async fn check_rules(&self, conn: &mut PgConnection) -> Result<(), AppError> {
        let (Some(genre_ids), Some(category_ids)) = (&self.request.genres_id, &self.request.categories_id)
        else {
            return Ok(());
        };
        let stray = genres::outside_categories(&mut *conn, genre_ids, category_ids).await?;
        if stray.is_empty() {
            return Ok(());
        }
        let listed = stray.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ");
        Err(AppError::invalid(
            "genres_id",
            format!("Genres {} are not related to any of the given categories.", listed),
        ))
    }

    async fn write(&self, conn: &mut PgConnection) -> Result<(), AppError> {
        let request = self.request;
        let now = Utc::now().naive_utc();
        match self.mode {
            WriteMode::Create => {
                sqlx::query(
                    "INSERT INTO videos \
                     (id, title, description, year_launched, opened, rating, duration, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
                )
                .bind(self.id)
                .bind(&request.title)
                .bind(&request.description)
                .bind(request.year_launched)
                .bind(request.opened)
                .bind(request.rating)
                .bind(request.duration)
                .bind(now)
                .execute(&mut *conn)
                .await?;
            }
            WriteMode::Update => {
                let result = sqlx::query(
                    "UPDATE videos SET title = $1, description = $2, year_launched = $3, \
                     opened = $4, rating = $5, duration = $6, updated_at = $7 \
                     WHERE id = $8 AND deleted_at IS NULL",
                )
                .bind(&request.title)
                .bind(&request.description)
                .bind(request.year_launched)
                .bind(request.opened)
                .bind(request.rating)
                .bind(request.duration)
                .bind(now)
                .bind(self.id)
                .execute(&mut *conn)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound { entity: "video", id: self.id });
                }
            }
        }
        Ok(())
    }

    async fn reload(&self, conn: &mut PgConnection) -> Result<VideoResource, AppError> {
        find_resource(conn, self.id, Trashed::Exclude).await
    }
}
