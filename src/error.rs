use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

/// Messages per request field, in the shape returned to clients.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("the given data was invalid")]
    Validation(FieldErrors),

    /// An association identifier that does not exist or is soft-deleted.
    #[error("referenced {entity} not found: {missing:?}")]
    Reference {
        field: &'static str,
        entity: &'static str,
        missing: Vec<Uuid>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("blob storage error: {0}")]
    Storage(#[from] StorageError),

    /// Orphaned blob or dangling reference detected mid-write.
    #[error("consistency violation: {0}")]
    Consistency(String),
}

impl AppError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        AppError::Validation(errors)
    }
}

pub fn field_errors(errors: &validator::ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, field_errors) in errors.field_errors() {
        let messages = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("The {} field is invalid ({}).", field, e.code))
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }
    fields
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(field_errors(&errors))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Reference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Storage(_) | AppError::Consistency(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(errors) => json!({
                "message": self.to_string(),
                "errors": errors,
            }),
            AppError::Reference { field, .. } => {
                let mut errors = FieldErrors::new();
                errors.insert(field.to_string(), vec![format!("The selected {} is invalid.", field)]);
                json!({
                    "message": self.to_string(),
                    "errors": errors,
                })
            }
            AppError::NotFound { entity, .. } => json!({
                "error": format!("{} not found", entity),
            }),
            AppError::Consistency(detail) => {
                error!("Consistency violation: {}", detail);
                json!({ "error": "Internal server error" })
            }
            AppError::Database(_) | AppError::Storage(_) => json!({
                "error": "Internal server error"
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
