pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;

pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::configure;

use event_schema::topics::{ORDER_TOPIC, PRODUCT_TOPIC, USER_TOPIC};

/// Topics this service publishes to and consumes from
pub const ORDER_SERVICE_TOPICS: [&str; 3] = [USER_TOPIC, ORDER_TOPIC, PRODUCT_TOPIC];
