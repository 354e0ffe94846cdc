//! # Template Service Module
//!
//! Routes under `/api/templates`.
//!
//! ## Sub-modules:
//! - `upload`: validates and upserts one template.
//! - `sync`: validates and upserts a whole template set from the admin side.
//! - `list`: template metadata with preview links.
//! - `get`: one template with its markup and declared placeholders.
//! - `preview`: the unresolved template rendered to PNG.

mod get;
mod list;
mod preview;
mod sync;
mod upload;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/templates";

/// Configures and returns the Actix `Scope` for all template routes.
///
/// # Registered Routes:
///
/// *   **`POST /upload`**: creates or replaces a template. Answers whether it
///     was `created`, `updated` or `unchanged` and which placeholders it declares.
/// *   **`POST /sync`**: the same for `{"templates": [...]}`; invalid entries are
///     reported as `skipped` instead of failing the request.
/// *   **`GET /all-previews`**: every template without markup, newest first.
/// *   **`GET /{template_id}`**: a single template.
/// *   **`GET /{template_id}/preview`**: `image/png` of the template as stored.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/upload", post().to(upload::process))
        .route("/sync", post().to(sync::process))
        .route("/all-previews", get().to(list::process))
        .route("/{template_id}", get().to(get::process))
        .route("/{template_id}/preview", get().to(preview::process))
}
