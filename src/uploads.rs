//! Intake of write requests that may carry files.
//!
//! A write arrives either as `application/json` or as `multipart/form-data`
//! with a `payload` part holding the same JSON and one part per file field.
//! File parts are spooled to temporary files as they arrive.

use actix_multipart::{Field, Multipart};
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{web, HttpRequest};
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::UploadLimits;
use crate::coordinator::Attachment;
use crate::error::AppError;
use crate::storage::StorageError;

const PAYLOAD_FIELD: &str = "payload";
const JSON_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeRule {
    /// Any subtype of a top-level type, e.g. `image/*`.
    AnyOf(&'static str),
    Exact(&'static str),
}

impl MimeRule {
    pub fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            MimeRule::AnyOf(top) => essence
                .split_once('/')
                .map(|(kind, sub)| kind == *top && !sub.is_empty())
                .unwrap_or(false),
            MimeRule::Exact(expected) => essence == *expected,
        }
    }
}

/// A file field accepted by a write and the column it fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRule {
    pub field: &'static str,
    pub column: &'static str,
    pub mime: MimeRule,
    pub max_bytes: u64,
}

pub fn video_file_rules(limits: &UploadLimits) -> [FileRule; 2] {
    [
        FileRule {
            field: "thumb_file",
            column: "thumb_file",
            mime: MimeRule::AnyOf("image"),
            max_bytes: limits.thumb_file_max_bytes,
        },
        FileRule {
            field: "video_file",
            column: "video_file",
            mime: MimeRule::Exact("video/mp4"),
            max_bytes: limits.video_file_max_bytes,
        },
    ]
}

#[derive(Debug)]
pub struct WriteRequest<T> {
    pub payload: T,
    pub attachments: Vec<Attachment>,
}

pub async fn read_write_request<T: DeserializeOwned>(
    req: &HttpRequest,
    body: web::Payload,
    rules: &[FileRule],
) -> Result<WriteRequest<T>, AppError> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        read_multipart(Multipart::new(req.headers(), body), rules).await
    } else {
        let data = read_json_body(body).await?;
        Ok(WriteRequest {
            payload: parse_payload("body", &data)?,
            attachments: Vec::new(),
        })
    }
}

async fn read_json_body(mut body: web::Payload) -> Result<Bytes, AppError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| AppError::invalid("body", format!("could not read body: {}", e)))?;
        if buf.len() + chunk.len() > JSON_LIMIT {
            return Err(AppError::invalid("body", "The body is too large."));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

async fn read_multipart<T: DeserializeOwned>(
    mut multipart: Multipart,
    rules: &[FileRule],
) -> Result<WriteRequest<T>, AppError> {
    let mut payload = None;
    let mut attachments = Vec::new();

    while let Some(field) = multipart
        .try_next()
        .await
        .map_err(|e| AppError::invalid("body", format!("malformed multipart body: {}", e)))?
    {
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        if name == PAYLOAD_FIELD {
            let data = read_payload_field(field).await?;
            payload = Some(parse_payload(PAYLOAD_FIELD, &data)?);
            continue;
        }

        let rule = rules
            .iter()
            .find(|rule| rule.field == name)
            .ok_or_else(|| AppError::invalid(name.clone(), "Unexpected field."))?;
        if attachments.iter().any(|a: &Attachment| a.column == rule.column) {
            return Err(AppError::invalid(rule.field, "The file was sent more than once."));
        }

        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default();
        if !rule.mime.accepts(&content_type) {
            return Err(AppError::invalid(
                rule.field,
                format!("The {} has an unsupported type ({}).", rule.field, content_type),
            ));
        }

        let original_name = field.content_disposition().get_filename().map(String::from);
        let (file, size) = spool_field(field, rule).await?;
        if size == 0 {
            return Err(AppError::invalid(rule.field, format!("The {} is empty.", rule.field)));
        }

        attachments.push(Attachment {
            column: rule.column,
            file_name: stored_file_name(original_name.as_deref(), &content_type),
            content_type,
            file,
            size,
        });
    }

    let payload = payload.ok_or_else(|| AppError::invalid(PAYLOAD_FIELD, "The payload field is required."))?;
    Ok(WriteRequest { payload, attachments })
}

async fn read_payload_field(mut field: Field) -> Result<Bytes, AppError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| AppError::invalid(PAYLOAD_FIELD, format!("could not read payload: {}", e)))?
    {
        if buf.len() + chunk.len() > JSON_LIMIT {
            return Err(AppError::invalid(PAYLOAD_FIELD, "The payload is too large."));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Streams a file part into a temporary file, enforcing the rule's size cap.
async fn spool_field(mut field: Field, rule: &FileRule) -> Result<(TempPath, u64), AppError> {
    let (file, path) = tempfile::Builder::new()
        .prefix("catalog-upload-")
        .tempfile()
        .map_err(StorageError::from)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut size: u64 = 0;
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| AppError::invalid(rule.field, format!("could not read {}: {}", rule.field, e)))?
    {
        size += chunk.len() as u64;
        if size > rule.max_bytes {
            return Err(AppError::invalid(
                rule.field,
                format!("The {} may not be greater than {} bytes.", rule.field, rule.max_bytes),
            ));
        }
        file.write_all(&chunk).await.map_err(StorageError::from)?;
    }
    file.flush().await.map_err(StorageError::from)?;
    Ok((path, size))
}

fn parse_payload<T: DeserializeOwned>(field: &'static str, data: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(data).map_err(|e| AppError::invalid(field, e.to_string()))
}

/// Random, collision-free name keeping a sanitized extension of the upload.
pub fn stored_file_name(original_name: Option<&str>, content_type: &str) -> String {
    let extension = original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| {
            content_type
                .split_once('/')
                .map(|(_, sub)| sub.to_ascii_lowercase())
                .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()))
        })
        .unwrap_or_else(|| "bin".to_string());
    format!("{}.{}", Uuid::new_v4().simple(), extension)
}
