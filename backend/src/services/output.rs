//! `GET /output/{carousel_id}/slide_{order}.png`
//!
//! Serves rendered slides from the content store. Addresses that do not name
//! a slide output are answered with `404`.

use crate::error::{ServiceError, ServiceResult};
use crate::job_controller::state::AppState;
use crate::render::content::parse_output_file_name;
use actix_web::web::{get, resource};
use actix_web::{web, HttpResponse, Resource};

pub fn configure_routes() -> Resource {
    resource("/output/{carousel_id}/{file_name}").route(get().to(process))
}

async fn process(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ServiceResult<HttpResponse> {
    let (carousel_id, file_name) = path.into_inner();
    let slide_order = parse_output_file_name(&file_name)
        .ok_or_else(|| ServiceError::NotFound(format!("output {}/{}", carousel_id, file_name)))?;

    let bytes = state.content.get_output(&carousel_id, slide_order)?;
    Ok(HttpResponse::Ok().content_type("image/png").body(bytes))
}
