//! # Template Retrieval
//!
//! `GET /api/templates/{template_id}` returns the stored template, markup
//! included, together with the placeholders the markup declares.

use crate::error::ServiceResult;
use crate::job_controller::state::AppState;
use crate::render::validate;
use actix_web::{web, HttpResponse};

pub(crate) async fn process(
    state: web::Data<AppState>,
    template_id: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let template = state.store.get_template(&template_id)?;
    // Stored markup was checked on upload.
    let placeholders = validate::check_template(&template.svg_content)
        .map(|check| check.placeholders)
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "template": template,
        "placeholders": placeholders,
    })))
}
