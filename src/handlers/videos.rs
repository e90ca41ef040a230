use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;
use uuid::Uuid;

use super::TrashedQuery;
use crate::coordinator::RelationalWriteCoordinator;
use crate::db::{self, videos};
use crate::error::AppError;
use crate::models::{VideoRequest, WriteMode};
use crate::storage::{namespaced_key, StorageError};
use crate::uploads::{read_write_request, video_file_rules, WriteRequest};
use crate::AppState;

#[get("/api/videos")]
async fn index(
    query: web::Query<TrashedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let videos = videos::list(&state.db_pool, query.scope()).await?;
    Ok(HttpResponse::Ok().json(videos))
}

async fn save(
    state: &AppState,
    http_req: &HttpRequest,
    body: web::Payload,
    id: Option<Uuid>,
) -> Result<HttpResponse, AppError> {
    let rules = video_file_rules(&state.upload_limits);
    let WriteRequest { payload, attachments } =
        read_write_request::<serde_json::Value>(http_req, body, &rules).await?;

    let mode = if id.is_some() { WriteMode::Update } else { WriteMode::Create };
    let payload = VideoRequest::from_json(payload, mode)?;

    let coordinator = RelationalWriteCoordinator::new(&state.db_pool, state.blob_store.as_ref());
    let associations = videos::association_syncs(&payload);
    match id {
        None => {
            let write = videos::VideoWrite::create(&payload);
            let video = coordinator.execute(&write, &associations, attachments).await?;
            Ok(HttpResponse::Created().json(video))
        }
        Some(id) => {
            let write = videos::VideoWrite::update(id, &payload);
            let video = coordinator.execute(&write, &associations, attachments).await?;
            Ok(HttpResponse::Ok().json(video))
        }
    }
}

#[post("/api/videos")]
async fn store(
    http_req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    save(&state, &http_req, body, None).await
}

#[get("/api/videos/{id}")]
async fn show(
    path: web::Path<Uuid>,
    query: web::Query<TrashedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = state.db_pool.acquire().await?;
    let video = videos::find_resource(&mut conn, path.into_inner(), query.scope()).await?;
    Ok(HttpResponse::Ok().json(video))
}

#[put("/api/videos/{id}")]
async fn update(
    path: web::Path<Uuid>,
    http_req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    save(&state, &http_req, body, Some(path.into_inner())).await
}

#[delete("/api/videos/{id}")]
async fn destroy(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::VIDEOS.soft_delete(&state.db_pool, id).await?;
    info!("Deleted video {}", id);
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/videos/{id}/restore")]
async fn restore(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::VIDEOS.restore(&state.db_pool, id).await?;
    let mut conn = state.db_pool.acquire().await?;
    let video = videos::find_resource(&mut conn, id, db::Trashed::Exclude).await?;
    info!("Restored video {}", id);
    Ok(HttpResponse::Ok().json(video))
}

#[get("/api/videos/{id}/{file}")]
async fn download(
    path: web::Path<(Uuid, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (id, file) = path.into_inner();
    let mut conn = state.db_pool.acquire().await?;
    let video = videos::find(&mut conn, id, db::Trashed::Exclude).await?;

    let (file_name, fallback_type) = match file.as_str() {
        "thumb_file" => (video.thumb_file, "image/jpeg"),
        "video_file" => (video.video_file, "video/mp4"),
        _ => return Ok(HttpResponse::NotFound().json(serde_json::json!({ "error": "File not found" }))),
    };
    let Some(file_name) = file_name else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({ "error": "File not found" })));
    };

    let key = namespaced_key(id, &file_name);
    match state.blob_store.get(&key).await {
        Ok(body) => Ok(HttpResponse::Ok()
            .content_type(content_type_for(&file_name, fallback_type))
            .streaming(body)),
        Err(StorageError::NotFound(_)) => Err(AppError::Consistency(format!(
            "video {} references missing blob {}",
            id, key
        ))),
        Err(e) => Err(e.into()),
    }
}

fn content_type_for(file_name: &str, fallback: &'static str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        _ => fallback,
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(store)
        .service(show)
        .service(update)
        .service(destroy)
        .service(restore)
        .service(download);
}
