use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod routes;
mod service;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::service::attendance::AttendanceClassifier;
use crate::utils::catalog_cache::CatalogCache;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        addr = %config.server_addr,
        standard_start = %config.standard_start,
        standard_end = %config.standard_end,
        "Server starting..."
    );

    let pool = init_db(&config.database_url, config.db_max_connections).await?;
    let limiters = Limiters::from_config(&config)?;

    let classifier = Data::new(AttendanceClassifier::new(
        config.attendance_policy(),
        config.default_avatar_url.clone(),
    ));
    let catalog = Data::new(CatalogCache::new(Duration::from_secs(
        config.catalog_cache_ttl_secs,
    )));

    let pool_for_warmup = pool.clone();
    let catalog_for_warmup = catalog.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = catalog_for_warmup.warmup(&pool_for_warmup).await {
            warn!(error = %e, "Failed to warm up catalog cache");
        }
    });

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} matches the UI's JS/CSS files
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(classifier.clone())
            .app_data(catalog.clone())
            .configure(|cfg| routes::configure(cfg, &config, limiters.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
