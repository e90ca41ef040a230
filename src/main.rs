use actix_cors::Cors;
use actix_web::{http, middleware, web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use video_catalog_backend::config::Config;
use video_catalog_backend::{handlers, services, AppState};

fn io_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io_error("Invalid configuration", e))?;

    let db_pool = services::init_db_pool(&config.database_url)
        .await
        .map_err(|e| io_error("Failed to connect to database", e))?;
    services::run_migrations(&db_pool)
        .await
        .map_err(|e| io_error("Failed to run migrations", e))?;

    let blob_store = services::init_blob_store(&config.storage)
        .await
        .map_err(|e| io_error("Failed to initialize blob storage", e))?;

    let app_state = web::Data::new(AppState {
        db_pool,
        blob_store,
        upload_limits: config.upload_limits,
    });

    let allowed_origins = config.cors_allowed_origins.clone();
    info!("Starting HTTP server on {}:{}", config.http_host, config.http_port);
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
            .supports_credentials();

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(handlers::configure_routes)
    })
    .bind((config.http_host.as_str(), config.http_port))?
    .run()
    .await
}
