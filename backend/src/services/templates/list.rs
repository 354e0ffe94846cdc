use crate::error::ServiceResult;
use crate::job_controller::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::template::TemplateSummary;

/// `GET /api/templates/all-previews`
pub(crate) async fn process(state: web::Data<AppState>) -> ServiceResult<HttpResponse> {
    let templates: Vec<TemplateSummary> = state
        .store
        .list_templates()?
        .iter()
        .map(TemplateSummary::from)
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": templates.len(),
        "templates": templates,
    })))
}
