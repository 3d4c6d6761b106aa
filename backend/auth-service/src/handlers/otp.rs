use crate::{error::Result, AppState};
use actix_middleware::get_correlation_id;
use actix_web::{web, HttpRequest, HttpResponse};
use event_schema::topics::SEND_OTP_TOPIC;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

/// POST /send-otp
///
/// Publishes an OTP request carrying a fresh request id. Delivery of the OTP
/// itself happens downstream of the `send_otp` topic.
pub async fn send_otp(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<SendOtpRequest>,
) -> Result<HttpResponse> {
    let correlation_id = get_correlation_id(&req).unwrap_or_default();

    match state.gateway.publish_otp(SEND_OTP_TOPIC, &body.email).await {
        Ok(request_id) => {
            info!(
                request_id = %request_id,
                correlation_id = %correlation_id,
                "OTP request published"
            );
            Ok(HttpResponse::Ok().json(json!({ "message": "OTP request sent successfully" })))
        }
        Err(e) => {
            warn!(correlation_id = %correlation_id, error = %e, "OTP request not published");
            Err(e.into())
        }
    }
}
