use actix_middleware::{CorrelationIdMiddleware, Logging, MetricsMiddleware};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use auth_service::{configure, AppState, Config};
use delivery_tracking::{
    CounterStore, KafkaProducerClient, PipelineMetrics, ProducerGateway, TopicRegistry,
};
use event_schema::topics::SEND_OTP_TOPIC;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,auth_service=debug,delivery_tracking=debug".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Starting auth-service on {}:{} as {}",
        config.http_host, config.http_port, config.service_identifier
    );

    // No consumer runs here, so `queued` only ever grows for send_otp
    let registry = TopicRegistry::new([SEND_OTP_TOPIC]).context("Invalid topic registry")?;
    let counters = Arc::new(CounterStore::new(&registry));

    let producer = Arc::new(
        KafkaProducerClient::new(&config.kafka()).context("Failed to create Kafka producer")?,
    );
    if let Err(e) = producer.health_check() {
        warn!("Kafka broker not reachable at startup: {}", e);
    }

    let gateway = ProducerGateway::new(producer.clone(), counters)
        .with_service_identifier(config.service_identifier.clone())
        .with_metrics(PipelineMetrics::new("auth-service"));
    let state = AppState::new(gateway);

    let server_result = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(MetricsMiddleware)
            .wrap(Logging)
            .wrap(CorrelationIdMiddleware)
            .configure(configure)
    })
    .bind((config.http_host.as_str(), config.http_port))
    .with_context(|| format!("Failed to bind {}:{}", config.http_host, config.http_port))?
    .run()
    .await;

    match tokio::task::spawn_blocking(move || producer.flush()).await {
        Ok(Ok(())) => info!("Kafka producer flushed"),
        Ok(Err(e)) => warn!("Kafka producer flush failed: {}", e),
        Err(e) => warn!("Kafka producer flush task failed: {}", e),
    }

    server_result.context("HTTP server error")
}
