use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored SVG template.
///
/// `width`/`height` is the raster size slides made from this template are
/// rendered at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub category: String,
    pub template_type: String,
    pub template_role: String,
    pub svg_content: String,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry for a template, without its markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub category: String,
    pub template_type: String,
    pub template_role: String,
    pub width: u32,
    pub height: u32,
    pub preview_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Template> for TemplateSummary {
    fn from(t: &Template) -> Self {
        TemplateSummary {
            id: t.id.clone(),
            name: t.name.clone(),
            category: t.category.clone(),
            template_type: t.template_type.clone(),
            template_role: t.template_role.clone(),
            width: t.width,
            height: t.height,
            preview_url: format!("/api/templates/{}/preview", t.id),
            created_at: t.created_at,
        }
    }
}
