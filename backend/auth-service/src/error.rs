use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use delivery_tracking::PublishError;
use serde_json::json;
use thiserror::Error;

/// Body returned for any failure to hand the request to the broker
pub const SEND_FAILED_MESSAGE: &str = "Failed to send OTP request";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::PublishFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AuthError::Validation(detail) => detail.clone(),
            AuthError::PublishFailed(_) => SEND_FAILED_MESSAGE.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

impl From<PublishError> for AuthError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::InvalidPayload(e) => AuthError::Validation(e.to_string()),
            other => AuthError::PublishFailed(other.to_string()),
        }
    }
}
