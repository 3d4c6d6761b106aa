/// Configuration management
use delivery_tracking::{KafkaConfig, DEFAULT_MAX_RETRIES};
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
    #[serde(default = "default_kafka_group_id")]
    pub kafka_group_id: String,
    #[serde(default = "default_kafka_message_timeout_ms")]
    pub kafka_message_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    3001
}

fn default_kafka_brokers() -> String {
    "kafka:9092".to_string()
}

fn default_kafka_client_id() -> String {
    "order-service".to_string()
}

fn default_kafka_group_id() -> String {
    "order-group".to_string()
}

fn default_kafka_message_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn kafka(&self) -> KafkaConfig {
        KafkaConfig {
            brokers: self.kafka_brokers.clone(),
            client_id: self.kafka_client_id.clone(),
            group_id: self.kafka_group_id.clone(),
            message_timeout_ms: self.kafka_message_timeout_ms,
            ..KafkaConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();

        assert_eq!(config.http_port, 3001);
        assert_eq!(config.kafka_brokers, "kafka:9092");
        assert_eq!(config.kafka_group_id, "order-group");
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_overrides() {
        let config: Config = envy::from_iter(vec![
            ("HTTP_PORT".to_string(), "8080".to_string()),
            ("KAFKA_BROKERS".to_string(), "k1:9092,k2:9092".to_string()),
            ("MAX_RETRIES".to_string(), "5".to_string()),
        ])
        .unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.max_retries, 5);

        let kafka = config.kafka();
        assert_eq!(kafka.brokers, "k1:9092,k2:9092");
        assert_eq!(kafka.client_id, "order-service");
        assert_eq!(kafka.auto_offset_reset, "earliest");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result: Result<Config, _> =
            envy::from_iter(vec![("HTTP_PORT".to_string(), "not-a-port".to_string())]);
        assert!(result.is_err());
    }
}
