//! # Carousel Service Module
//!
//! Routes under `/api/carousel`.
//!
//! ## Sub-modules:
//! - `create`: stores a carousel and its slides; `create-and-generate` also
//!   renders it before answering.
//! - `generate`: claims a carousel and renders it in the background, or in the
//!   request with `?wait=true`.
//! - `slides`: carousel status, progress and per-slide image URLs.

mod create;
mod generate;
mod slides;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/carousel";

/// # Registered Routes:
///
/// *   **`POST /`**: `{"name", "slides": [{"templateId", "replacements", "order"?}]}`.
/// *   **`POST /create-and-generate`**: same body, answers with the batch report.
/// *   **`POST /{carousel_id}/generate`**: `202` while the batch runs; `409` if one
///     is already running for this carousel.
/// *   **`GET /{carousel_id}/slides`**: poll target for generation progress.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("/create-and-generate", post().to(create::create_and_generate))
        .route("/{carousel_id}/generate", post().to(generate::process))
        .route("/{carousel_id}/slides", get().to(slides::process))
}
