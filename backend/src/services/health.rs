use actix_web::web::{get, resource};
use actix_web::{HttpResponse, Resource, Responder};
use chrono::Utc;

pub fn configure_routes() -> Resource {
    resource("/health").route(get().to(process))
}

async fn process() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "message": "Flyer template service is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn reports_healthy() {
        let app = test::init_service(App::new().service(configure_routes())).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }
}
