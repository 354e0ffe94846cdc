//! # Carousel Generation
//!
//! `POST /api/carousel/{carousel_id}/generate`
//!
//! The carousel is claimed before the handler returns, so two concurrent
//! calls for the same id cannot both start a batch: the second one gets
//! `409 Conflict`. Without `wait` the batch runs on a blocking worker and the
//! answer is `202 Accepted`; clients then poll `/slides`. With `?wait=true`
//! the handler answers with the batch report once every slide is done.

use crate::error::ServiceResult;
use crate::job_controller::dispatch;
use crate::job_controller::state::AppState;
use crate::render::batch::BatchReport;
use actix_web::{web, HttpResponse};
use common::jobs::CarouselStatus;
use common::requests::GenerateQuery;
use serde_json::{json, Value};

pub(crate) async fn process(
    state: web::Data<AppState>,
    carousel_id: web::Path<String>,
    query: web::Query<GenerateQuery>,
) -> ServiceResult<HttpResponse> {
    let carousel_id = carousel_id.into_inner();

    if query.wait {
        let report = dispatch::generate_now(&state, &carousel_id).await?;
        return Ok(HttpResponse::Ok().json(report_json(&state, &report)));
    }

    dispatch::schedule_generation(&state, &carousel_id).await?;
    Ok(HttpResponse::Accepted().json(json!({
        "success": true,
        "carouselId": carousel_id,
        "status": CarouselStatus::Generating,
        "message": "Carousel generation started",
        "statusUrl": format!("/api/carousel/{}/slides", carousel_id),
    })))
}

/// Response body for a finished batch.
pub(crate) fn report_json(state: &AppState, report: &BatchReport) -> Value {
    let slides: Vec<Value> = report
        .slides
        .iter()
        .map(|slide| {
            json!({
                "slideNumber": slide.slide_order,
                "status": slide.status,
                "imageUrl": slide.output_url.as_deref().map(|loc| state.image_url(loc)),
                "error": slide.error,
            })
        })
        .collect();

    json!({
        "success": report.error.is_none(),
        "carouselId": report.carousel_id,
        "status": report.status,
        "slides": slides,
        "error": report.error,
    })
}
