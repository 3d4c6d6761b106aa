//! End-to-end behaviour of the tracking pipeline against an in-memory broker.

use async_trait::async_trait;
use delivery_tracking::*;
use event_schema::{topics, OrderSubmitted, UserSubmitted};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Broker double: keeps every accepted message, or rejects everything.
#[derive(Default)]
struct InMemoryBroker {
    sent: Mutex<Vec<(String, Vec<u8>)>>,
    reject: AtomicBool,
}

impl InMemoryBroker {
    fn rejecting() -> Self {
        let broker = Self::default();
        broker.reject.store(true, Ordering::SeqCst);
        broker
    }

    fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerProducer for InMemoryBroker {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(PublishError::Rejected("no connected broker".to_string()));
        }
        self.sent.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }
}

fn handler<F>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(&DeliveredRecord<'_>) -> Result<(), ProcessingFailure> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn order_registry() -> TopicRegistry {
    TopicRegistry::new([topics::USER_TOPIC, topics::ORDER_TOPIC, topics::PRODUCT_TOPIC]).unwrap()
}

fn ann() -> UserSubmitted {
    UserSubmitted {
        username: "ann".to_string(),
        email: "ann@x.com".to_string(),
    }
}

#[tokio::test]
async fn publish_then_successful_delivery() {
    let counters = Arc::new(CounterStore::new(&order_registry()));
    let broker = Arc::new(InMemoryBroker::default());
    let gateway = ProducerGateway::new(broker.clone(), counters.clone());

    gateway.publish(topics::USER_TOPIC, &ann()).await.unwrap();
    assert_eq!(counters.get(topics::USER_TOPIC, DeliveryState::Queued).unwrap(), 1);

    let sent = broker.sent();
    assert_eq!(sent.len(), 1);
    let (topic, payload) = &sent[0];
    assert_eq!(topic, topics::USER_TOPIC);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(payload).unwrap(),
        serde_json::json!({ "username": "ann", "email": "ann@x.com" })
    );

    let pipeline = ConsumerPipeline::new(
        counters.clone(),
        Arc::new(RetryLedger::new()),
        Arc::new(LoggingHandler),
    );
    let record = DeliveredRecord::new(topic, 0, 0, Some(payload.as_slice()));
    assert_eq!(pipeline.process(&record).unwrap(), Outcome::Success);

    let snapshot = counters.topic_snapshot(topics::USER_TOPIC).unwrap();
    assert_eq!(snapshot.queued, 0);
    assert_eq!(snapshot.in_process, 0);
    assert_eq!(snapshot.success, 1);
}

#[tokio::test]
async fn rejected_publish_does_not_count_as_queued() {
    let counters = Arc::new(CounterStore::new(&order_registry()));
    let gateway = ProducerGateway::new(Arc::new(InMemoryBroker::rejecting()), counters.clone());

    let result = gateway.publish(topics::USER_TOPIC, &ann()).await;

    assert!(matches!(result, Err(PublishError::Rejected(_))));
    assert_eq!(counters.get(topics::USER_TOPIC, DeliveryState::Queued).unwrap(), 0);
}

#[tokio::test]
async fn invalid_payload_never_reaches_broker() {
    let counters = Arc::new(CounterStore::new(&order_registry()));
    let broker = Arc::new(InMemoryBroker::default());
    let gateway = ProducerGateway::new(broker.clone(), counters.clone());

    let order = OrderSubmitted {
        product: "widget".to_string(),
        quantity: 0,
    };
    let result = gateway.publish(topics::ORDER_TOPIC, &order).await;

    assert!(matches!(result, Err(PublishError::InvalidPayload(_))));
    assert!(broker.sent().is_empty());
    assert_eq!(counters.get(topics::ORDER_TOPIC, DeliveryState::Queued).unwrap(), 0);
}

#[tokio::test]
async fn unregistered_topic_is_rejected() {
    let counters = Arc::new(CounterStore::new(&order_registry()));
    let broker = Arc::new(InMemoryBroker::default());
    let gateway = ProducerGateway::new(broker.clone(), counters);

    let result = gateway.publish("audit-topic", &ann()).await;

    assert!(matches!(result, Err(PublishError::UnknownTopic(t)) if t == "audit-topic"));
    assert!(broker.sent().is_empty());
}

#[tokio::test]
async fn otp_publish_embeds_fresh_request_id() {
    let registry = TopicRegistry::new([topics::SEND_OTP_TOPIC]).unwrap();
    let counters = Arc::new(CounterStore::new(&registry));
    let broker = Arc::new(InMemoryBroker::default());
    let gateway = ProducerGateway::new(broker.clone(), counters.clone())
        .with_service_identifier("AuthService");

    let first = gateway.publish_otp(topics::SEND_OTP_TOPIC, "bob@example.com").await.unwrap();
    let second = gateway.publish_otp(topics::SEND_OTP_TOPIC, "bob@example.com").await.unwrap();
    assert_ne!(first, second);

    let sent = broker.sent();
    let message: serde_json::Value = serde_json::from_slice(&sent[0].1).unwrap();
    assert_eq!(message["email"], "bob@example.com");
    assert_eq!(message["requestId"], first.to_string());
    assert_eq!(message["serviceIdentifier"], "AuthService");
    assert_eq!(counters.get(topics::SEND_OTP_TOPIC, DeliveryState::Queued).unwrap(), 2);
}

#[test]
fn four_failing_deliveries_of_same_offset_end_failed() {
    let counters = Arc::new(CounterStore::new(&order_registry()));
    let ledger = Arc::new(RetryLedger::new());
    let calls = Arc::new(AtomicU32::new(0));
    let handler_calls = calls.clone();
    let pipeline = ConsumerPipeline::new(
        counters.clone(),
        ledger.clone(),
        handler(move |_| {
            handler_calls.fetch_add(1, Ordering::SeqCst);
            Err(ProcessingFailure::new("boom"))
        }),
    );

    let record = DeliveredRecord::new(topics::ORDER_TOPIC, 0, 5, Some(b"{}".as_slice()));
    let outcomes: Vec<Outcome> = (0..4).map(|_| pipeline.process(&record).unwrap()).collect();

    assert!(outcomes[..3].iter().all(|o| !o.is_terminal()));
    assert_eq!(outcomes[3], Outcome::Failed { attempts: 3 });
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    // Four deliveries entered InProcess; the terminal one left it
    let snapshot = counters.topic_snapshot(topics::ORDER_TOPIC).unwrap();
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.in_process, 3);
    assert_eq!(ledger.get_attempts(topics::ORDER_TOPIC, 5), 0);
}

#[test]
fn success_after_two_failures_leaves_no_ledger_entry() {
    let counters = Arc::new(CounterStore::new(&order_registry()));
    let ledger = Arc::new(RetryLedger::new());
    let failures_left = Arc::new(AtomicU32::new(2));
    let remaining = failures_left.clone();
    let pipeline = ConsumerPipeline::new(
        counters.clone(),
        ledger.clone(),
        handler(move |_| {
            if remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                Err(ProcessingFailure::new("transient"))
            } else {
                Ok(())
            }
        }),
    );

    counters.increment(topics::PRODUCT_TOPIC, DeliveryState::Queued).unwrap();
    let record = DeliveredRecord::new(topics::PRODUCT_TOPIC, 1, 17, None);

    assert_eq!(pipeline.process(&record).unwrap(), Outcome::Retrying { attempt: 1 });
    assert_eq!(pipeline.process(&record).unwrap(), Outcome::Retrying { attempt: 2 });
    assert_eq!(pipeline.process(&record).unwrap(), Outcome::Success);

    // Redeliveries saturate queued at zero and leave two InProcess entries behind
    let snapshot = counters.topic_snapshot(topics::PRODUCT_TOPIC).unwrap();
    assert_eq!(snapshot.queued, 0);
    assert_eq!(snapshot.in_process, 2);
    assert_eq!(snapshot.success, 1);
    assert_eq!(snapshot.failed, 0);
    assert!(ledger.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishes_and_deliveries_lose_no_updates() {
    const MESSAGES: i64 = 500;

    let counters = Arc::new(CounterStore::new(&order_registry()));
    let gateway = ProducerGateway::new(Arc::new(InMemoryBroker::default()), counters.clone());
    let pipeline = Arc::new(ConsumerPipeline::new(
        counters.clone(),
        Arc::new(RetryLedger::new()),
        Arc::new(LoggingHandler),
    ));

    let mut tasks = Vec::new();
    for offset in 0..MESSAGES {
        let gateway = gateway.clone();
        tasks.push(tokio::spawn(async move {
            gateway.publish(topics::USER_TOPIC, &ann()).await.unwrap();
        }));

        let pipeline = pipeline.clone();
        tasks.push(tokio::spawn(async move {
            let record = DeliveredRecord::new(topics::USER_TOPIC, 0, offset, None);
            pipeline.process(&record).unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let snapshot = counters.topic_snapshot(topics::USER_TOPIC).unwrap();
    assert_eq!(snapshot.success, MESSAGES as u64);
    assert_eq!(snapshot.in_process, 0);
    // Deliveries racing ahead of their publish saturate queued at zero
    assert!(snapshot.queued <= MESSAGES as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_counter_updates_are_exact() {
    let counters = Arc::new(CounterStore::new(&order_registry()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let counters = counters.clone();
            tokio::spawn(async move {
                for _ in 0..1000 {
                    counters.increment(topics::ORDER_TOPIC, DeliveryState::Queued).unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(counters.get(topics::ORDER_TOPIC, DeliveryState::Queued).unwrap(), 8000);
}
