//! # Template Upload
//!
//! `POST /api/templates/upload`. The request names every field of the
//! template; the markup must pass `render::validate::check_template` before
//! anything is written. The raster size comes from the request, then from the
//! markup, then from the template family.

use crate::error::ServiceResult;
use crate::job_controller::state::AppState;
use crate::render::validate::{self, TemplateCheck};
use crate::services::required;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::model::template::Template;
use common::requests::UploadTemplateRequest;
use log::info;

pub(crate) async fn process(
    state: web::Data<AppState>,
    payload: web::Json<UploadTemplateRequest>,
) -> ServiceResult<HttpResponse> {
    let (template, check) = prepare_template(payload.into_inner())?;
    let outcome = state.store.upsert_template(&template)?;
    info!(
        "Template {} {} ({}x{}, {} placeholders)",
        template.id,
        outcome.as_str(),
        template.width,
        template.height,
        check.placeholders.len()
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("Template {} successfully", outcome.as_str()),
        "template_id": template.id,
        "outcome": outcome,
        "width": template.width,
        "height": template.height,
        "placeholders": check.placeholders,
    })))
}

/// Checks an upload request and turns it into a storable template.
pub(crate) fn prepare_template(req: UploadTemplateRequest) -> ServiceResult<(Template, TemplateCheck)> {
    let id = required(req.id, "id")?;
    let name = required(req.name, "name")?;
    let category = required(req.category, "category")?;
    let template_type = required(req.template_type, "template_type")?;
    let template_role = required(req.template_role, "template_role")?;
    let svg_content = required(req.svg_content, "svg_content")?;

    let check = validate::check_template(&svg_content)?;
    let (width, height) =
        validate::target_size((req.width, req.height), check.declared_size, &template_type)?;

    let now = Utc::now();
    let template = Template {
        id: id.trim().to_string(),
        name,
        category,
        template_type,
        template_role,
        svg_content,
        width,
        height,
        created_at: now,
        updated_at: now,
    };
    Ok((template, check))
}
