/// Payload schemas for every Kafka topic the pipeline services publish to.
///
/// Messages travel without an envelope: the JSON object on the wire is exactly
/// the submitted fields, plus the generated request identifier for OTP
/// requests. Every payload is validated at the producer boundary before it is
/// serialized.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Topic names shared between producers and consumers
pub mod topics {
    pub const USER_TOPIC: &str = "user-topic";
    pub const ORDER_TOPIC: &str = "order-topic";
    pub const PRODUCT_TOPIC: &str = "product-topic";
    pub const SEND_OTP_TOPIC: &str = "send_otp";
}

/// Default `serviceIdentifier` stamped on OTP requests
pub const DEFAULT_SERVICE_IDENTIFIER: &str = "AuthService";

const MAX_USERNAME_LEN: usize = 64;
const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} is too long ({len} > {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),

    #[error("Price must be a finite non-negative number, got {0}")]
    InvalidPrice(f64),
}

/// Boundary validation for outbound payloads
pub trait Validate {
    fn validate(&self) -> Result<(), SchemaError>;
}

// ============================================================================
// ORDER SERVICE PAYLOADS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSubmitted {
    pub username: String,
    pub email: String,
}

impl Validate for UserSubmitted {
    fn validate(&self) -> Result<(), SchemaError> {
        require_non_empty("username", &self.username)?;
        if self.username.len() > MAX_USERNAME_LEN {
            return Err(SchemaError::TooLong {
                field: "username",
                len: self.username.len(),
                max: MAX_USERNAME_LEN,
            });
        }
        validate_email(&self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    pub product: String,
    pub quantity: i64,
}

impl Validate for OrderSubmitted {
    fn validate(&self) -> Result<(), SchemaError> {
        require_non_empty("product", &self.product)?;
        if self.quantity < 1 {
            return Err(SchemaError::InvalidQuantity(self.quantity));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSubmitted {
    pub name: String,
    pub price: f64,
}

impl Validate for ProductSubmitted {
    fn validate(&self) -> Result<(), SchemaError> {
        require_non_empty("name", &self.name)?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(SchemaError::InvalidPrice(self.price));
        }
        Ok(())
    }
}

// ============================================================================
// AUTH SERVICE PAYLOADS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequest {
    pub email: String,
    pub request_id: Uuid,
    pub service_identifier: String,
}

impl OtpRequest {
    /// Build a request with a fresh v4 request identifier
    pub fn new(email: impl Into<String>, service_identifier: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            request_id: Uuid::new_v4(),
            service_identifier: service_identifier.into(),
        }
    }
}

impl Validate for OtpRequest {
    fn validate(&self) -> Result<(), SchemaError> {
        validate_email(&self.email)?;
        require_non_empty("serviceIdentifier", &self.service_identifier)
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), SchemaError> {
    if value.trim().is_empty() {
        return Err(SchemaError::MissingField(field));
    }
    Ok(())
}

/// Structural check only: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), SchemaError> {
    require_non_empty("email", email)?;
    if email.len() > MAX_EMAIL_LEN {
        return Err(SchemaError::TooLong {
            field: "email",
            len: email.len(),
            max: MAX_EMAIL_LEN,
        });
    }

    let invalid = || SchemaError::InvalidEmail(email.to_string());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}
