use actix_web::{delete, get, post, put, web, HttpResponse};
use log::info;
use uuid::Uuid;

use super::TrashedQuery;
use crate::db::{self, categories};
use crate::error::AppError;
use crate::models::CategoryRequest;
use crate::AppState;

#[get("/api/categories")]
async fn index(
    query: web::Query<TrashedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let categories = categories::list(&state.db_pool, query.scope()).await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[post("/api/categories")]
async fn store(
    body: web::Json<serde_json::Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = CategoryRequest::from_json(body.into_inner())?;
    let category = categories::insert(&state.db_pool, &req).await?;
    info!("Created category {}", category.id);
    Ok(HttpResponse::Created().json(category))
}

#[get("/api/categories/{id}")]
async fn show(
    path: web::Path<Uuid>,
    query: web::Query<TrashedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let category = categories::find(&state.db_pool, path.into_inner(), query.scope()).await?;
    Ok(HttpResponse::Ok().json(category))
}

#[put("/api/categories/{id}")]
async fn update(
    path: web::Path<Uuid>,
    body: web::Json<serde_json::Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = CategoryRequest::from_json(body.into_inner())?;
    let category = categories::update(&state.db_pool, path.into_inner(), &req).await?;
    info!("Updated category {}", category.id);
    Ok(HttpResponse::Ok().json(category))
}

#[delete("/api/categories/{id}")]
async fn destroy(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::CATEGORIES.soft_delete(&state.db_pool, id).await?;
    info!("Deleted category {}", id);
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/categories/{id}/restore")]
async fn restore(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::CATEGORIES.restore(&state.db_pool, id).await?;
    let category = categories::find(&state.db_pool, id, db::Trashed::Exclude).await?;
    info!("Restored category {}", id);
    Ok(HttpResponse::Ok().json(category))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(store)
        .service(show)
        .service(update)
        .service(destroy)
        .service(restore);
}
