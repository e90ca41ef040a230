use actix_web::{delete, get, post, put, web, HttpResponse};
use log::info;
use uuid::Uuid;

use super::TrashedQuery;
use crate::coordinator::RelationalWriteCoordinator;
use crate::db::relations::{AssociationSync, GENRE_CATEGORIES};
use crate::db::{self, genres};
use crate::error::AppError;
use crate::models::GenreRequest;
use crate::AppState;

#[get("/api/genres")]
async fn index(
    query: web::Query<TrashedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let genres = genres::list(&state.db_pool, query.scope()).await?;
    Ok(HttpResponse::Ok().json(genres))
}

#[post("/api/genres")]
async fn store(
    body: web::Json<serde_json::Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = GenreRequest::from_json(body.into_inner())?;
    let write = genres::GenreWrite::create(&req);
    let categories = AssociationSync::new(GENRE_CATEGORIES, req.categories_id.clone());
    let genre = RelationalWriteCoordinator::new(&state.db_pool, state.blob_store.as_ref())
        .execute(&write, &[categories], Vec::new())
        .await?;
    Ok(HttpResponse::Created().json(genre))
}

#[get("/api/genres/{id}")]
async fn show(
    path: web::Path<Uuid>,
    query: web::Query<TrashedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = state.db_pool.acquire().await?;
    let genre = genres::find_resource(&mut conn, path.into_inner(), query.scope()).await?;
    Ok(HttpResponse::Ok().json(genre))
}

#[put("/api/genres/{id}")]
async fn update(
    path: web::Path<Uuid>,
    body: web::Json<serde_json::Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = GenreRequest::from_json(body.into_inner())?;
    let write = genres::GenreWrite::update(path.into_inner(), &req);
    let categories = AssociationSync::new(GENRE_CATEGORIES, req.categories_id.clone());
    let genre = RelationalWriteCoordinator::new(&state.db_pool, state.blob_store.as_ref())
        .execute(&write, &[categories], Vec::new())
        .await?;
    Ok(HttpResponse::Ok().json(genre))
}

#[delete("/api/genres/{id}")]
async fn destroy(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::GENRES.soft_delete(&state.db_pool, id).await?;
    info!("Deleted genre {}", id);
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/genres/{id}/restore")]
async fn restore(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::GENRES.restore(&state.db_pool, id).await?;
    let mut conn = state.db_pool.acquire().await?;
    let genre = genres::find_resource(&mut conn, id, db::Trashed::Exclude).await?;
    info!("Restored genre {}", id);
    Ok(HttpResponse::Ok().json(genre))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(store)
        .service(show)
        .service(update)
        .service(destroy)
        .service(restore);
}
