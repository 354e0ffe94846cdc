//! Slide listing and progress for one carousel.

use crate::error::{ServiceError, ServiceResult};
use crate::job_controller::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::{json, Value};

/// `GET /api/carousel/{carousel_id}/slides`
///
/// Safe to poll while a batch is running; everything is read from the store.
pub(crate) async fn process(
    state: web::Data<AppState>,
    carousel_id: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let store = state.store.clone();
    let (carousel, slides, progress) = web::block(move || -> ServiceResult<_> {
        let carousel = store.get_carousel(&carousel_id)?;
        let slides = store.list_slides(&carousel.id)?;
        let progress = store.progress(&carousel.id)?;
        Ok((carousel, slides, progress))
    })
    .await
    .map_err(|e| ServiceError::Persistence(e.to_string()))??;

    let slides: Vec<Value> = slides
        .iter()
        .map(|slide| {
            json!({
                "id": slide.id,
                "templateId": slide.template_id,
                "slideNumber": slide.slide_order,
                "imageUrl": slide.output_url.as_deref().map(|loc| state.image_url(loc)),
                "status": slide.status,
                "error": slide.error,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "carouselId": carousel.id,
        "name": carousel.name,
        "status": carousel.status,
        "progress": progress,
        "slides": slides,
        "createdAt": carousel.created_at,
        "completedAt": carousel.completed_at,
        "errorMessage": carousel.error_message,
    })))
}
