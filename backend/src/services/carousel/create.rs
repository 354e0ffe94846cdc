//! # Carousel Creation
//!
//! `POST /api/carousel` stores a carousel and its slides as `pending`;
//! `POST /api/carousel/create-and-generate` also renders it before answering.

use crate::error::{ServiceError, ServiceResult};
use crate::job_controller::dispatch;
use crate::job_controller::state::AppState;
use crate::services::carousel::generate::report_json;
use crate::services::required;
use actix_web::{web, HttpResponse};
use common::model::carousel::{Carousel, NewSlide};
use common::requests::CreateCarouselRequest;
use log::info;
use std::collections::HashSet;

/// `POST /api/carousel`
pub(crate) async fn process(
    state: web::Data<AppState>,
    payload: web::Json<CreateCarouselRequest>,
) -> ServiceResult<HttpResponse> {
    let (name, slides) = new_slides(payload.into_inner())?;
    let (carousel, slides) = create_blocking(&state, name, slides).await?;
    info!("Created carousel {} with {} slides", carousel.id, slides.len());

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "carouselId": carousel.id,
        "status": carousel.status,
        "slideCount": slides.len(),
        "message": "Carousel created successfully",
    })))
}

/// `POST /api/carousel/create-and-generate`
pub(crate) async fn create_and_generate(
    state: web::Data<AppState>,
    payload: web::Json<CreateCarouselRequest>,
) -> ServiceResult<HttpResponse> {
    let (name, slides) = new_slides(payload.into_inner())?;
    let (carousel, slides) = create_blocking(&state, name, slides).await?;
    info!(
        "Created carousel {} with {} slides, generating now",
        carousel.id,
        slides.len()
    );

    let report = dispatch::generate_now(&state, &carousel.id).await?;
    Ok(HttpResponse::Ok().json(report_json(&state, &report)))
}

async fn create_blocking(
    state: &AppState,
    name: String,
    slides: Vec<NewSlide>,
) -> ServiceResult<(Carousel, Vec<NewSlide>)> {
    let store = state.store.clone();
    web::block(move || -> ServiceResult<(Carousel, Vec<NewSlide>)> {
        let carousel = store.create_carousel(&name, &slides)?;
        Ok((carousel, slides))
    })
    .await
    .map_err(|e| ServiceError::Persistence(e.to_string()))?
}

/// Validates a create request. Slide orders come from `order` when every
/// slide has one, otherwise from the array position.
fn new_slides(req: CreateCarouselRequest) -> ServiceResult<(String, Vec<NewSlide>)> {
    let name = required(req.name, "name")?;
    let slides = req
        .slides
        .ok_or_else(|| ServiceError::Validation("Missing required field: slides".to_string()))?;
    if slides.is_empty() {
        return Err(ServiceError::Validation(
            "slides must contain at least one slide".to_string(),
        ));
    }

    let explicit = slides.iter().filter(|s| s.order.is_some()).count();
    if explicit != 0 && explicit != slides.len() {
        return Err(ServiceError::Validation(
            "order must be given on every slide or on none".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(slides.len());
    for (idx, slide) in slides.into_iter().enumerate() {
        let template_id = required(slide.template_id, &format!("slides[{}].templateId", idx))?;
        let slide_order = slide.order.unwrap_or(idx as u32 + 1);
        if slide_order == 0 {
            return Err(ServiceError::Validation(format!(
                "slides[{}].order must be 1 or greater",
                idx
            )));
        }
        if !seen.insert(slide_order) {
            return Err(ServiceError::Validation(format!(
                "slide order {} is used more than once",
                slide_order
            )));
        }
        result.push(NewSlide {
            template_id,
            replacements: slide.replacements,
            slide_order,
        });
    }
    Ok((name, result))
}
