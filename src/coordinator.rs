//! Atomic create/update of a record spanning Postgres and the blob store.
//!
//! Table writes run inside one transaction. Blobs cannot join that
//! transaction, so every key written during an operation is tracked and
//! deleted again if anything fails before the commit lands.
//!
//! Order of work for one call:
//!
//! 1. begin the transaction
//! 2. check every association identifier against its live target rows,
//!    then any cross-association rule of the record
//! 3. insert or update the primary row
//! 4. replace each association's join rows
//! 5. store each attachment under `{record_id}/{file_name}` and point the
//!    record's reference column at it
//! 6. reload the record and commit
//!
//! Blobs replaced by step 5 are removed only after the commit succeeds.

use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use sqlx::{PgConnection, PgPool};
use tempfile::TempPath;
use uuid::Uuid;

use crate::db::relations::AssociationSync;
use crate::error::AppError;
use crate::storage::{namespaced_key, BlobStore};

/// Insert or update of the primary row of a coordinated write.
#[async_trait]
pub trait RecordWrite: Send + Sync {
    type Record: Send;

    /// Table of the primary row. Attachment columns live on this table.
    fn table(&self) -> &'static str;

    fn entity(&self) -> &'static str;

    fn id(&self) -> Uuid;

    /// Rules spanning several associations, run after their targets are
    /// known to exist and before anything is written.
    async fn check_rules(&self, _conn: &mut PgConnection) -> Result<(), AppError> {
        Ok(())
    }

    /// Writes the row. An update of a missing or soft-deleted row must fail
    /// with `AppError::NotFound`.
    async fn write(&self, conn: &mut PgConnection) -> Result<(), AppError>;

    /// Reads back the record as it stands inside the transaction.
    async fn reload(&self, conn: &mut PgConnection) -> Result<Self::Record, AppError>;
}

/// A file to store for the record and the column that references it.
/// The upload is spooled at `file`, which is removed when the attachment drops.
#[derive(Debug)]
pub struct Attachment {
    pub column: &'static str,
    pub file_name: String,
    pub content_type: String,
    pub file: TempPath,
    pub size: u64,
}

pub struct RelationalWriteCoordinator<'a> {
    pool: &'a PgPool,
    blobs: &'a dyn BlobStore,
}

struct Staged<R> {
    record: R,
    superseded: Vec<String>,
}

impl<'a> RelationalWriteCoordinator<'a> {
    pub fn new(pool: &'a PgPool, blobs: &'a dyn BlobStore) -> Self {
        Self { pool, blobs }
    }

    pub async fn execute<W: RecordWrite>(
        &self,
        write: &W,
        associations: &[AssociationSync],
        attachments: Vec<Attachment>,
    ) -> Result<W::Record, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::new();

        let staged = self
            .stage(&mut tx, write, associations, attachments, &mut stored)
            .await;

        match staged {
            Ok(staged) => {
                if let Err(e) = tx.commit().await {
                    error!("Error committing {} {}: {:?}", write.entity(), write.id(), e);
                    self.compensate(&stored).await;
                    return Err(e.into());
                }
                info!(
                    "Saved {} {} ({} association set(s), {} file(s))",
                    write.entity(),
                    write.id(),
                    associations.len(),
                    stored.len()
                );
                self.discard_superseded(&staged.superseded).await;
                Ok(staged.record)
            }
            Err(e) => {
                error!("Error saving {} {}: {}", write.entity(), write.id(), e);
                if let Err(rollback_err) = tx.rollback().await {
                    error!(
                        "Error rolling back {} {}: {:?}",
                        write.entity(),
                        write.id(),
                        rollback_err
                    );
                }
                self.compensate(&stored).await;
                Err(e)
            }
        }
    }

    async fn stage<W: RecordWrite>(
        &self,
        conn: &mut PgConnection,
        write: &W,
        associations: &[AssociationSync],
        attachments: Vec<Attachment>,
        stored: &mut Vec<String>,
    ) -> Result<Staged<W::Record>, AppError> {
        let id = write.id();

        for sync in associations {
            sync.ensure_targets_exist(&mut *conn).await?;
        }
        write.check_rules(&mut *conn).await?;

        write.write(&mut *conn).await?;

        for sync in associations {
            sync.apply(&mut *conn, id).await?;
        }

        let mut superseded = Vec::new();
        for attachment in attachments {
            let previous = current_reference(&mut *conn, write.table(), attachment.column, id).await?;
            let key = namespaced_key(id, &attachment.file_name);

            // a failed put may still leave a partial object behind
            stored.push(key.clone());
            self.blobs
                .put(&key, &attachment.file, &attachment.content_type)
                .await?;
            if !self.blobs.exists(&key).await? {
                return Err(AppError::Consistency(format!(
                    "blob {} missing right after it was stored",
                    key
                )));
            }

            set_reference(&mut *conn, write.table(), attachment.column, id, &attachment.file_name)
                .await?;

            if let Some(previous) = previous.filter(|name| *name != attachment.file_name) {
                superseded.push(namespaced_key(id, &previous));
            }
        }

        let record = write.reload(&mut *conn).await?;
        Ok(Staged { record, superseded })
    }

    async fn compensate(&self, stored: &[String]) {
        for key in stored {
            match self.blobs.delete(key).await {
                Ok(()) => info!("Removed blob {} after failed write", key),
                Err(e) => error!("Error removing blob {} after failed write, blob is orphaned: {}", key, e),
            }
        }
    }

    async fn discard_superseded(&self, superseded: &[String]) {
        for key in superseded {
            if let Err(e) = self.blobs.delete(key).await {
                warn!("Error removing superseded blob {}: {}", key, e);
            }
        }
    }
}

async fn current_reference(
    conn: &mut PgConnection,
    table: &'static str,
    column: &'static str,
    id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", column, table);
    sqlx::query_scalar::<_, Option<String>>(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
}

async fn set_reference(
    conn: &mut PgConnection,
    table: &'static str,
    column: &'static str,
    id: Uuid,
    file_name: &str,
) -> Result<(), sqlx::Error> {
    let sql = format!("UPDATE {} SET {} = $1, updated_at = $2 WHERE id = $3", table, column);
    sqlx::query(&sql)
        .bind(file_name)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
