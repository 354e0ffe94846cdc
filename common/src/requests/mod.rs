//! Request payloads of the HTTP surface.
//!
//! Required fields are `Option`s so missing ones are reported as validation
//! errors naming the field instead of a generic deserialization failure.

use crate::model::carousel::Substitutions;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCarouselRequest {
    pub name: Option<String>,
    pub slides: Option<Vec<SlideRequest>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlideRequest {
    #[serde(rename = "templateId")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub replacements: Substitutions,
    /// 1-based position; either every slide carries one or none does.
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadTemplateRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub template_type: Option<String>,
    pub template_role: Option<String>,
    pub svg_content: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncTemplatesRequest {
    pub templates: Option<Vec<UploadTemplateRequest>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateQuery {
    /// Run the batch in the request and answer with its report.
    #[serde(default)]
    pub wait: bool,
}
