pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;
pub mod uploads;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::UploadLimits;
use crate::storage::BlobStore;

pub struct AppState {
    pub db_pool: PgPool,
    pub blob_store: Arc<dyn BlobStore>,
    pub upload_limits: UploadLimits,
}
