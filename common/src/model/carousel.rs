use crate::jobs::{CarouselStatus, SlideStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder key to value. Values stay untyped JSON until the resolver
/// coerces them, so one bad value never rejects a whole slide.
pub type Substitutions = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carousel {
    pub id: String,
    pub name: String,
    pub status: CarouselStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: String,
    pub carousel_id: String,
    pub template_id: String,
    pub replacements: Substitutions,
    /// Unique within the carousel; defines rendering and display order.
    pub slide_order: u32,
    pub status: SlideStatus,
    pub output_url: Option<String>,
    /// Failure reason, or the rasterization error that forced a fallback image.
    pub error: Option<String>,
}

/// A slide as submitted at carousel creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSlide {
    pub template_id: String,
    pub replacements: Substitutions,
    pub slide_order: u32,
}
