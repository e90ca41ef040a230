use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::{S3Settings, StorageDriver};
use crate::storage::{BlobStore, LocalBlobStore, S3BlobStore, StorageResult};

pub async fn init_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub async fn init_s3_client(settings: &S3Settings) -> Client {
    let sdk_config = aws_config::from_env().load().await;
    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

    if let Some(endpoint) = &settings.endpoint {
        s3_config_builder = s3_config_builder.endpoint_url(endpoint).force_path_style(true);
    }

    let credentials = Credentials::new(
        settings.access_key.clone(),
        settings.secret_key.clone(),
        None, // session_token
        None, // expires_after
        "env",
    );
    s3_config_builder = s3_config_builder.credentials_provider(credentials);

    if let Some(region) = sdk_config.region() {
        s3_config_builder = s3_config_builder.region(region.clone());
    } else {
        s3_config_builder = s3_config_builder.region(Region::new("us-east-1"));
    };

    Client::from_conf(s3_config_builder.build())
}

pub async fn init_blob_store(driver: &StorageDriver) -> StorageResult<Arc<dyn BlobStore>> {
    match driver {
        StorageDriver::Local { root } => {
            info!("Using local blob storage at {}", root.display());
            Ok(Arc::new(LocalBlobStore::new(root.clone()).await?))
        }
        StorageDriver::S3(settings) => {
            info!("Using S3 blob storage, bucket {}", settings.bucket);
            let store = S3BlobStore::new(init_s3_client(settings).await, settings.bucket.clone());
            store.ensure_bucket_exists().await?;
            Ok(Arc::new(store))
        }
    }
}
