//! State shared by all request handlers.
//!
//! `AppState` is built once in `main.rs` and handed to actix as `web::Data`.
//! Everything in it is behind an `Arc`, so cloning is cheap and every worker
//! sees the same store, content store and renderer.

use crate::config::Config;
use crate::render::batch::BatchRenderer;
use crate::render::content::ContentStore;
use crate::render::raster::{FallbackRasterizer, Rasterizer};
use crate::storage::CarouselStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Single source of truth for templates, carousels and slide status.
    pub store: Arc<dyn CarouselStore>,
    pub content: Arc<dyn ContentStore>,
    /// Used by template previews; batches go through `renderer`.
    pub rasterizer: Arc<dyn Rasterizer>,
    pub fallback: Arc<dyn Rasterizer>,
    pub renderer: Arc<BatchRenderer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn CarouselStore>,
        content: Arc<dyn ContentStore>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        let fallback: Arc<dyn Rasterizer> = Arc::new(FallbackRasterizer);
        let renderer = BatchRenderer::new(
            store.clone(),
            rasterizer.clone(),
            content.clone(),
            config.failure_policy,
        )
        .with_fallback(fallback.clone());

        AppState {
            store,
            content,
            rasterizer,
            fallback,
            renderer: Arc::new(renderer),
            config: Arc::new(config),
        }
    }

    /// Public URL of a stored output location.
    pub fn image_url(&self, location: &str) -> String {
        match &self.config.public_base_url {
            Some(base) => format!("{}{}", base, location),
            None => location.to_string(),
        }
    }
}
