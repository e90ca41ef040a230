use actix_web::{delete, get, post, put, web, HttpResponse};
use log::info;
use uuid::Uuid;

use super::TrashedQuery;
use crate::db::{self, cast_members};
use crate::error::AppError;
use crate::models::CastMemberRequest;
use crate::AppState;

#[get("/api/cast_members")]
async fn index(
    query: web::Query<TrashedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let members = cast_members::list(&state.db_pool, query.scope()).await?;
    Ok(HttpResponse::Ok().json(members))
}

#[post("/api/cast_members")]
async fn store(
    body: web::Json<serde_json::Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = CastMemberRequest::from_json(body.into_inner())?;
    let member = cast_members::insert(&state.db_pool, &req).await?;
    info!("Created cast member {}", member.id);
    Ok(HttpResponse::Created().json(member))
}

#[get("/api/cast_members/{id}")]
async fn show(
    path: web::Path<Uuid>,
    query: web::Query<TrashedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let member = cast_members::find(&state.db_pool, path.into_inner(), query.scope()).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[put("/api/cast_members/{id}")]
async fn update(
    path: web::Path<Uuid>,
    body: web::Json<serde_json::Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = CastMemberRequest::from_json(body.into_inner())?;
    let member = cast_members::update(&state.db_pool, path.into_inner(), &req).await?;
    info!("Updated cast member {}", member.id);
    Ok(HttpResponse::Ok().json(member))
}

#[delete("/api/cast_members/{id}")]
async fn destroy(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::CAST_MEMBERS.soft_delete(&state.db_pool, id).await?;
    info!("Deleted cast member {}", id);
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/cast_members/{id}/restore")]
async fn restore(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::CAST_MEMBERS.restore(&state.db_pool, id).await?;
    let member = cast_members::find(&state.db_pool, id, db::Trashed::Exclude).await?;
    info!("Restored cast member {}", id);
    Ok(HttpResponse::Ok().json(member))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(store)
        .service(show)
        .service(update)
        .service(destroy)
        .service(restore);
}
