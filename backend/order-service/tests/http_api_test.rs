//! HTTP surface of order-service against an in-memory broker.

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use delivery_tracking::{
    BrokerProducer, ConsumerPipeline, CounterStore, DeliveredRecord, LoggingHandler,
    MessageHandler, ProcessingFailure, ProducerGateway, PublishError, RetryLedger, TopicRegistry,
};
use order_service::{configure, AppState, ORDER_SERVICE_TOPICS};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct InMemoryBroker {
    sent: Mutex<Vec<(String, Vec<u8>)>>,
    reject: AtomicBool,
}

impl InMemoryBroker {
    fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerProducer for InMemoryBroker {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(PublishError::Rejected("broker unavailable".to_string()));
        }
        self.sent.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }
}

struct AlwaysFails;

impl MessageHandler for AlwaysFails {
    fn handle(&self, _record: &DeliveredRecord<'_>) -> Result<(), ProcessingFailure> {
        Err(ProcessingFailure::new("downstream unavailable"))
    }
}

fn setup() -> (AppState, Arc<InMemoryBroker>, Arc<CounterStore>) {
    let registry = TopicRegistry::new(ORDER_SERVICE_TOPICS).unwrap();
    let counters = Arc::new(CounterStore::new(&registry));
    let broker = Arc::new(InMemoryBroker::default());
    let gateway = ProducerGateway::new(broker.clone(), counters.clone());
    (AppState::new(gateway), broker, counters)
}

#[actix_web::test]
async fn post_user_publishes_and_counts_as_queued() {
    let (state, broker, _) = setup();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "username": "ann", "email": "ann@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "User data sent to Kafka");

    let sent = broker.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "user-topic");

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["user-topic"],
        json!({ "queued": 1, "inProcess": 0, "failed": 0, "success": 0 })
    );
    assert_eq!(body["order-topic"]["queued"], 0);
    assert_eq!(body["product-topic"]["queued"], 0);
}

#[actix_web::test]
async fn orders_and_products_use_their_own_topics() {
    let (state, broker, counters) = setup();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/orders")
        .set_json(json!({ "product": "lamp", "quantity": 2 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "Order data sent to Kafka");

    let req = test::TestRequest::post()
        .uri("/products")
        .set_json(json!({ "name": "lamp", "price": 19.5 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "Product data sent to Kafka");

    let topics: Vec<String> = broker.sent().into_iter().map(|(t, _)| t).collect();
    assert_eq!(topics, vec!["order-topic", "product-topic"]);

    let snapshot = counters.snapshot();
    assert_eq!(snapshot["order-topic"].queued, 1);
    assert_eq!(snapshot["product-topic"].queued, 1);
    assert_eq!(snapshot["user-topic"].queued, 0);
}

#[actix_web::test]
async fn rejected_publish_returns_500_and_leaves_counters_untouched() {
    let (state, broker, counters) = setup();
    broker.reject.store(true, Ordering::SeqCst);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "username": "ann", "email": "ann@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "PUBLISH_REJECTED");

    assert_eq!(counters.snapshot()["user-topic"].queued, 0);
}

#[actix_web::test]
async fn invalid_payload_is_a_validation_error() {
    let (state, broker, _) = setup();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "username": "ann", "email": "not-an-email" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let req = test::TestRequest::post()
        .uri("/orders")
        .set_json(json!({ "product": "lamp" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "BAD_REQUEST");

    assert!(broker.sent().is_empty());
}

#[actix_web::test]
async fn health_and_prometheus_endpoints_respond() {
    let (state, _, _) = setup();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/metrics/prometheus").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn published_user_is_consumed_and_reported_as_success() {
    let (state, broker, counters) = setup();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "username": "ann", "email": "ann@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let pipeline = ConsumerPipeline::new(
        counters.clone(),
        Arc::new(RetryLedger::new()),
        Arc::new(LoggingHandler),
    );
    for (offset, (topic, payload)) in broker.sent().iter().enumerate() {
        let record = DeliveredRecord::new(topic, 0, offset as i64, Some(payload.as_slice()));
        pipeline.process(&record).unwrap();
    }

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["user-topic"],
        json!({ "queued": 0, "inProcess": 0, "failed": 0, "success": 1 })
    );
}

#[actix_web::test]
async fn exhausted_retries_show_up_as_failed() {
    let (state, broker, counters) = setup();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/orders")
        .set_json(json!({ "product": "lamp", "quantity": 1 }))
        .to_request();
    test::call_service(&app, req).await;

    let pipeline = ConsumerPipeline::new(
        counters,
        Arc::new(RetryLedger::new()),
        Arc::new(AlwaysFails),
    );

    let sent = broker.sent();
    let (topic, payload) = &sent[0];
    let record = DeliveredRecord::new(topic, 0, 7, Some(payload.as_slice()));
    for _ in 0..4 {
        pipeline.process(&record).unwrap();
    }

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["order-topic"],
        json!({ "queued": 0, "inProcess": 3, "failed": 1, "success": 0 })
    );
    assert!(pipeline.ledger().is_empty());
}
