use crate::AppState;
use actix_web::{web, HttpResponse};

/// GET /metrics
///
/// Per-topic delivery counters as JSON, keyed by topic name.
pub async fn get_metrics(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.exporter.get_snapshot())
}
