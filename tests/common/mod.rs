#![allow(dead_code)]

use actix_web::{test, web, App};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use video_catalog_backend::config::UploadLimits;
use video_catalog_backend::handlers;
use video_catalog_backend::storage::{BlobStore, BlobStream, LocalBlobStore, StorageError, StorageResult};
use video_catalog_backend::AppState;

pub async fn setup_test_app(
    pool: PgPool,
    blob_store: Arc<dyn BlobStore>,
    upload_limits: UploadLimits,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    let _ = env_logger::builder().is_test(true).try_init();

    let app_state = web::Data::new(AppState {
        db_pool: pool,
        blob_store,
        upload_limits,
    });

    test::init_service(
        App::new()
            .app_data(app_state)
            .configure(handlers::configure_routes),
    )
    .await
}

pub async fn local_store(dir: &Path) -> Arc<LocalBlobStore> {
    Arc::new(LocalBlobStore::new(dir).await.unwrap())
}

/// Wraps a local store, fails the n-th `put` (1-based, 0 never fails) and
/// remembers the source path of every `put`.
pub struct FailingBlobStore {
    inner: LocalBlobStore,
    fail_on_put: usize,
    puts: AtomicUsize,
    sources: Mutex<Vec<PathBuf>>,
}

impl FailingBlobStore {
    pub async fn new(dir: &Path, fail_on_put: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalBlobStore::new(dir).await.unwrap(),
            fail_on_put,
            puts: AtomicUsize::new(0),
            sources: Mutex::new(Vec::new()),
        })
    }

    pub fn sources(&self) -> Vec<PathBuf> {
        self.sources.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, key: &str, source: &Path, content_type: &str) -> StorageResult<()> {
        self.sources.lock().unwrap().push(source.to_path_buf());
        let attempt = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on_put {
            return Err(StorageError::UploadFailed(format!("injected failure for {}", key)));
        }
        self.inner.put(key, source, content_type).await
    }

    async fn get(&self, key: &str) -> StorageResult<BlobStream> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }
}

/// Every regular file below `root`.
pub fn stored_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files
}

pub async fn create_category(pool: &PgPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    sqlx::query(
        "INSERT INTO categories (id, name, description, is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, TRUE, $4, $4)",
    )
    .bind(id)
    .bind(name)
    .bind(format!("{} description", name))
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn create_genre(pool: &PgPool, name: &str, categories: &[Uuid]) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    sqlx::query(
        "INSERT INTO genres (id, name, is_active, created_at, updated_at) VALUES ($1, $2, TRUE, $3, $3)",
    )
    .bind(id)
    .bind(name)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
    for category_id in categories {
        sqlx::query("INSERT INTO category_genre (category_id, genre_id) VALUES ($1, $2)")
            .bind(category_id)
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }
    id
}

pub async fn create_video(pool: &PgPool, title: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    sqlx::query(
        "INSERT INTO videos (id, title, description, year_launched, opened, rating, duration, created_at, updated_at) \
         VALUES ($1, $2, 'a test video', 2001, FALSE, '12', 95, $3, $3)",
    )
    .bind(id)
    .bind(title)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn soft_delete(pool: &PgPool, table: &str, id: Uuid) {
    let sql = format!("UPDATE {} SET deleted_at = $1 WHERE id = $2", table);
    sqlx::query(&sql)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await.unwrap()
}

/// Target identifiers linked to `owner_id` in a join table, sorted.
pub async fn linked(pool: &PgPool, join_table: &str, owner_column: &str, target_column: &str, owner_id: Uuid) -> Vec<Uuid> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = $1 ORDER BY 1",
        target_column, join_table, owner_column
    );
    sqlx::query_scalar::<_, Uuid>(&sql)
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

pub fn sorted(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("----catalog-test-{}", Uuid::new_v4().simple()),
            buf: Vec::new(),
        }
    }

    pub fn json(mut self, name: &str, value: &serde_json::Value) -> Self {
        self.buf.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.buf.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n", name).as_bytes(),
        );
        self.buf.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
        self.buf.extend_from_slice(value.to_string().as_bytes());
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.buf.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.buf.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        self.buf
            .extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.buf,
        )
    }
}
