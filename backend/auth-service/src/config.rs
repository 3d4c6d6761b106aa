/// Configuration management
use delivery_tracking::KafkaConfig;
use event_schema::DEFAULT_SERVICE_IDENTIFIER;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_kafka_brokers")]
    pub kafka_brokers: String,
    #[serde(default = "default_kafka_client_id")]
    pub kafka_client_id: String,
    #[serde(default = "default_kafka_message_timeout_ms")]
    pub kafka_message_timeout_ms: u64,
    /// Stamped into every OTP request as `serviceIdentifier`
    #[serde(default = "default_service_identifier")]
    pub service_identifier: String,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    3000
}

fn default_kafka_brokers() -> String {
    "kafka:9092".to_string()
}

fn default_kafka_client_id() -> String {
    "auth-service".to_string()
}

fn default_kafka_message_timeout_ms() -> u64 {
    5000
}

fn default_service_identifier() -> String {
    DEFAULT_SERVICE_IDENTIFIER.to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn kafka(&self) -> KafkaConfig {
        KafkaConfig {
            brokers: self.kafka_brokers.clone(),
            client_id: self.kafka_client_id.clone(),
            message_timeout_ms: self.kafka_message_timeout_ms,
            ..KafkaConfig::default()
        }
    }
}
