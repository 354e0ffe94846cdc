//! `GET /api/templates/{template_id}/preview`
//!
//! Renders the stored markup with its placeholders unresolved, at the
//! template size. A template the rasterizer cannot draw still gets the
//! fallback image.

use crate::error::{ServiceError, ServiceResult};
use crate::job_controller::state::AppState;
use actix_web::{web, HttpResponse};
use log::warn;

pub(crate) async fn process(
    state: web::Data<AppState>,
    template_id: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let template = state.store.get_template(&template_id)?;
    let rasterizer = state.rasterizer.clone();
    let fallback = state.fallback.clone();

    let png = web::block(move || {
        let (w, h) = (template.width, template.height);
        rasterizer
            .render_to_raster(&template.svg_content, w, h)
            .or_else(|e| {
                warn!("Preview of template {} fell back: {}", template.id, e);
                fallback.render_to_raster(&template.svg_content, w, h)
            })
    })
    .await
    .map_err(|e| ServiceError::Rasterization(e.to_string()))??;

    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}
