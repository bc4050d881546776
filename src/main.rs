use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::routes::RateLimits;
use crate::store::settings::{self as settings_store, SettingsSnapshot};
use crate::utils::change_feed::ChangeFeed;
use crate::utils::username_cache;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Geo Attendance API"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url, config.run_migrations).await?;
    let limits = RateLimits::from_config(&config)?;

    let feed = ChangeFeed::default();
    let settings = Data::new(SettingsSnapshot::new());

    // Check-in refuses to run until this succeeds.
    match settings_store::reload(&settings, &pool).await {
        Ok(_) => info!("System settings loaded"),
        Err(e) => warn!(error = %e, "System settings not loaded, waiting for a change"),
    }

    actix_web::rt::spawn(settings_store::watch(
        feed.clone(),
        settings.clone(),
        pool.clone(),
    ));

    let pool_for_cache_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = username_cache::warmup_username_cache(&pool_for_cache_warmup, 250).await {
            error!(error = %e, "Failed to warmup username cache");
        }
    });

    let server_addr = config.server_addr.clone();
    let feed = Data::new(feed);
    let pool = Data::new(pool);
    let config = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard needed for the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(feed.clone())
            .app_data(settings.clone())
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, &limits))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await
    .context("Server error")
}
