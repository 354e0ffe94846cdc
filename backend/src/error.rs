//! Error taxonomy of the service.
//!
//! Pipeline code returns `ServiceError`; handlers turn it into the JSON
//! envelope `{"success": false, "error": "..."}` through `ResponseError`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("rasterization failed: {0}")]
    Rasterization(String),
    #[error("substitution failed: {0}")]
    Substitution(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("carousel {0} is already generating")]
    AlreadyGenerating(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Persistence(format!("stored JSON is invalid: {}", err))
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::AlreadyGenerating(_) => StatusCode::CONFLICT,
            ServiceError::Rasterization(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Substitution(_)
            | ServiceError::Persistence(_)
            | ServiceError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}
