use actix_web::{error, get, web, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::db::Trashed;
use crate::error::AppError;

pub mod cast_members;
pub mod categories;
pub mod genres;
pub mod videos;

/// Query string accepted by list and show routes.
#[derive(Debug, Default, Deserialize)]
pub struct TrashedQuery {
    #[serde(default)]
    pub with_trashed: bool,
}

impl TrashedQuery {
    pub fn scope(&self) -> Trashed {
        Trashed::from_flag(self.with_trashed)
    }
}

#[get("/api/status")]
async fn status() -> impl Responder {
    web::Json(json!({
        "status": "running"
    }))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _req| {
            let message = match &err {
                error::JsonPayloadError::Deserialize(e) => e.to_string(),
                other => other.to_string(),
            };
            AppError::invalid("body", message).into()
        })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(status)
        .configure(categories::configure)
        .configure(genres::configure)
        .configure(cast_members::configure)
        .configure(videos::configure);
}
