use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_THUMB_FILE_MAX_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_VIDEO_FILE_MAX_BYTES: u64 = 50 * 1024 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageDriver {
    Local { root: PathBuf },
    S3(S3Settings),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
}

/// Per-field ceilings applied while spooling uploaded files to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub thumb_file_max_bytes: u64,
    pub video_file_max_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            thumb_file_max_bytes: DEFAULT_THUMB_FILE_MAX_BYTES,
            video_file_max_bytes: DEFAULT_VIDEO_FILE_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub http_host: String,
    pub http_port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub storage: StorageDriver,
    pub upload_limits: UploadLimits,
}

impl Config {
    /// Reads the process environment. Call `dotenv().ok()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let http_host = env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let http_port = parse_var("HTTP_PORT", 5050)?;

        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let cors_allowed_origins = parse_origins(&allowed_origins);

        let storage = match env::var("STORAGE_DRIVER").unwrap_or_else(|_| "local".to_string()).as_str() {
            "local" => StorageDriver::Local {
                root: env::var("STORAGE_LOCAL_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./storage")),
            },
            "s3" => StorageDriver::S3(S3Settings {
                bucket: env::var("MINIO_BUCKET").unwrap_or_else(|_| "videos".to_string()),
                endpoint: env::var("MINIO_ENDPOINT").ok(),
                access_key: env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minio".to_string()),
                secret_key: env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minio123".to_string()),
            }),
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_DRIVER",
                    value: other.to_string(),
                })
            }
        };

        let upload_limits = UploadLimits {
            thumb_file_max_bytes: parse_var("THUMB_FILE_MAX_BYTES", DEFAULT_THUMB_FILE_MAX_BYTES)?,
            video_file_max_bytes: parse_var("VIDEO_FILE_MAX_BYTES", DEFAULT_VIDEO_FILE_MAX_BYTES)?,
        };

        Ok(Self {
            database_url,
            http_host,
            http_port,
            cors_allowed_origins,
            storage,
            upload_limits,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
