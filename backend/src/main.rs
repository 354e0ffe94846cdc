mod config;
mod error;
mod job_controller;
mod render;
mod services;
mod storage;

use crate::config::Config;
use crate::error::ServiceResult;
use crate::job_controller::state::AppState;
use crate::render::content::FsContentStore;
use crate::render::raster::{BoundedRasterizer, SvgRasterizer};
use crate::storage::sqlite::SqliteStore;
use crate::storage::CarouselStore;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};
use std::sync::Arc;

/// Opens the stores and builds the shared state.
fn bootstrap(config: Config) -> ServiceResult<AppState> {
    let store = Arc::new(SqliteStore::open(&config.database_path)?);
    info!("Using database {}", store.path().display());

    let recovered = store.recover_interrupted()?;
    if recovered > 0 {
        warn!(
            "Marked {} carousel(s) interrupted by the last shutdown as failed",
            recovered
        );
    }
    if config.seed_templates {
        storage::seed::seed_if_empty(store.as_ref())?;
    }

    let content = Arc::new(FsContentStore::new(&config.output_dir)?);
    info!("Writing slides to {}", content.root().display());

    let rasterizer = Arc::new(BoundedRasterizer::new(
        Arc::new(SvgRasterizer::new()),
        config.raster_timeout,
    ));

    Ok(AppState::new(config, store, content, rasterizer))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(std::io::Error::other)?;
    let (host, port) = config.bind_address();
    let json_limit = config.json_limit;
    info!(
        "Slide failure policy: {}, rasterization timeout: {:?}",
        config.failure_policy, config.raster_timeout
    );

    let state = bootstrap(config).map_err(std::io::Error::other)?;

    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(services::json_config(json_limit))
            .app_data(web::Data::new(state.clone()))
            .service(services::health::configure_routes())
            .service(services::templates::configure_routes())
            .service(services::carousel::configure_routes())
            .service(services::output::configure_routes())
    })
    .bind((host, port))?
    .run()
    .await
}
