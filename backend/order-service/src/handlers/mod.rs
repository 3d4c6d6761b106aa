mod health;
mod metrics;
mod submissions;

pub use health::health_check;
pub use metrics::get_metrics;
pub use submissions::{create_order, create_product, create_user};

use crate::error::AppError;
use actix_web::web;

/// Register every route this service exposes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/users", web::post().to(create_user))
    .route("/orders", web::post().to(create_order))
    .route("/products", web::post().to(create_product))
    .route("/metrics", web::get().to(get_metrics))
    .route(
        "/metrics/prometheus",
        web::get().to(actix_middleware::serve_prometheus),
    )
    .route("/health", web::get().to(health_check));
}
