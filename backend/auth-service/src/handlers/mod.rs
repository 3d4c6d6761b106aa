mod otp;

pub use otp::{send_otp, SendOtpRequest};

use crate::error::AuthError;
use actix_web::{web, HttpResponse};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AuthError::Validation(err.to_string()).into()),
    )
    .route("/send-otp", web::post().to(send_otp))
    .route("/metrics", web::get().to(get_metrics))
    .route(
        "/metrics/prometheus",
        web::get().to(actix_middleware::serve_prometheus),
    )
    .route("/health", web::get().to(health_check));
}

async fn get_metrics(state: web::Data<crate::AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.exporter.get_snapshot())
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}
