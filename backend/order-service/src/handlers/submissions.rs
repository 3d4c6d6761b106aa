use crate::{error::Result, AppState};
use actix_web::{web, HttpResponse};
use event_schema::{
    topics::{ORDER_TOPIC, PRODUCT_TOPIC, USER_TOPIC},
    OrderSubmitted, ProductSubmitted, UserSubmitted,
};

/// POST /users
pub async fn create_user(
    state: web::Data<AppState>,
    body: web::Json<UserSubmitted>,
) -> Result<HttpResponse> {
    state.gateway.publish(USER_TOPIC, &body.into_inner()).await?;
    Ok(HttpResponse::Ok().body("User data sent to Kafka"))
}

/// POST /orders
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<OrderSubmitted>,
) -> Result<HttpResponse> {
    state.gateway.publish(ORDER_TOPIC, &body.into_inner()).await?;
    Ok(HttpResponse::Ok().body("Order data sent to Kafka"))
}

/// POST /products
pub async fn create_product(
    state: web::Data<AppState>,
    body: web::Json<ProductSubmitted>,
) -> Result<HttpResponse> {
    state
        .gateway
        .publish(PRODUCT_TOPIC, &body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().body("Product data sent to Kafka"))
}
