//! # Persistence
//!
//! The store is the single source of truth for templates, carousels and
//! slides. Generation status lives only here, so a status poll always sees
//! what the render batch last wrote, even across restarts.
//!
//! ## Sub-modules:
//! - `sqlite`: the `rusqlite` implementation of `CarouselStore`.
//! - `seed`: built-in templates inserted into an empty store.

pub mod seed;
pub mod sqlite;

use crate::error::ServiceResult;
use common::jobs::{CarouselStatus, Progress, SlideStatus};
use common::model::carousel::{Carousel, NewSlide, Slide};
use common::model::template::Template;
use serde::Serialize;

/// What an upsert did to the stored template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// Same id and byte-identical markup; metadata may still have changed.
    Unchanged,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        }
    }
}

/// Persistence interface used by the render pipeline and the HTTP surface.
pub trait CarouselStore: Send + Sync {
    /// Inserts or overwrites the template with `template.id`.
    fn upsert_template(&self, template: &Template) -> ServiceResult<UpsertOutcome>;

    fn get_template(&self, id: &str) -> ServiceResult<Template>;

    fn list_templates(&self) -> ServiceResult<Vec<Template>>;

    /// Creates a carousel in `Pending` together with all of its slides.
    fn create_carousel(&self, name: &str, slides: &[NewSlide]) -> ServiceResult<Carousel>;

    fn get_carousel(&self, id: &str) -> ServiceResult<Carousel>;

    /// Slides of a carousel ordered by `slide_order`.
    fn list_slides(&self, carousel_id: &str) -> ServiceResult<Vec<Slide>>;

    fn progress(&self, carousel_id: &str) -> ServiceResult<Progress>;

    /// Atomically moves a carousel to `Generating` and resets its slides to
    /// `Pending`. Fails with `AlreadyGenerating` while another batch owns it.
    fn begin_generation(&self, carousel_id: &str) -> ServiceResult<()>;

    fn record_slide(
        &self,
        carousel_id: &str,
        slide_order: u32,
        status: SlideStatus,
        output_url: Option<&str>,
        error: Option<&str>,
    ) -> ServiceResult<()>;

    /// Moves the carousel to a terminal status and stamps `completed_at`.
    /// Slides still `Pending` are marked `Error` with `error` (or a generic
    /// reason) so none is left behind.
    fn finish_carousel(
        &self,
        carousel_id: &str,
        status: CarouselStatus,
        error: Option<&str>,
    ) -> ServiceResult<()>;

    /// Fails every carousel a previous process left in `Generating`.
    /// Returns how many were recovered.
    fn recover_interrupted(&self) -> ServiceResult<usize>;
}
