use actix_middleware::{CorrelationIdMiddleware, Logging, MetricsMiddleware};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use delivery_tracking::{
    spawn_consumers, ConsumerPipeline, CounterStore, KafkaProducerClient, LoggingHandler,
    PipelineMetrics, ProducerGateway, RetryLedger, RetryPolicy, TopicRegistry,
};
use order_service::{configure, AppState, Config, ORDER_SERVICE_TOPICS};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,order_service=debug,delivery_tracking=debug".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
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
        "Starting order-service on {}:{}",
        config.http_host, config.http_port
    );

    let registry = TopicRegistry::new(ORDER_SERVICE_TOPICS).context("Invalid topic registry")?;
    let counters = Arc::new(CounterStore::new(&registry));
    let ledger = Arc::new(RetryLedger::new());
    let metrics = PipelineMetrics::new("order-service");

    let kafka_config = config.kafka();
    let producer = Arc::new(
        KafkaProducerClient::new(&kafka_config).context("Failed to create Kafka producer")?,
    );
    if let Err(e) = producer.health_check() {
        // Messages are buffered locally until the broker becomes reachable
        warn!("Kafka broker not reachable at startup: {}", e);
    }

    let gateway = ProducerGateway::new(producer.clone(), counters.clone())
        .with_metrics(metrics.clone());

    let pipeline = Arc::new(
        ConsumerPipeline::new(counters, ledger, Arc::new(LoggingHandler))
            .with_retry_policy(RetryPolicy::new(config.max_retries))
            .with_metrics(metrics),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumers = spawn_consumers(&kafka_config, &registry, pipeline, shutdown_rx)
        .context("Failed to start Kafka consumers")?;
    info!("Started {} Kafka consumer(s)", consumers.len());

    let state = AppState::new(gateway);

    // Wraps run outermost-last: the correlation id is attached before Logging sees the request
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

    info!("HTTP server stopped, shutting down consumers");
    let _ = shutdown_tx.send(true);
    for consumer in consumers {
        if let Err(e) = consumer.await {
            error!("Consumer task ended abnormally: {}", e);
        }
    }

    let flush_result = tokio::task::spawn_blocking(move || producer.flush()).await;
    match flush_result {
        Ok(Ok(())) => info!("Kafka producer flushed"),
        Ok(Err(e)) => warn!("Kafka producer flush failed: {}", e),
        Err(e) => warn!("Kafka producer flush task failed: {}", e),
    }

    server_result.context("HTTP server error")
}
