//! Cart error taxonomy.
//!
//! Every failure the cart service can produce is classified into one of the
//! variants below. Classification looks at the HTTP status first and then at
//! the message: any message mentioning "stock" is a stock-limit error,
//! whatever the status.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the cart client and store.
#[derive(Debug, Error)]
pub enum CartError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The session is missing or expired. The local cart is cleared.
    #[error("Not signed in")]
    Unauthorized,

    /// The request was rejected as invalid.
    #[error("Validation error: {message}")]
    Validation {
        /// Offending field, when the service names one.
        field: Option<String>,
        /// Human-readable reason.
        message: String,
    },

    /// Not enough stock to satisfy the requested quantity.
    #[error("Stock limit: {0}")]
    StockLimit(String),

    /// The cart item, vendor or promo does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other rejected mutation.
    #[error("Cart update failed ({status}): {message}")]
    Mutation {
        /// HTTP status returned by the service.
        status: u16,
        /// Message returned by the service.
        message: String,
    },

    /// A successful response could not be decoded.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Plain classification of a [`CartError`], suitable for storing and
/// comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Auth,
    Validation,
    StockLimit,
    NotFound,
    Mutation,
}

impl CartError {
    /// Classify a non-success response.
    #[must_use]
    pub fn from_status(status: StatusCode, message: String, field: Option<String>) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return Self::Unauthorized;
        }
        if mentions_stock(&message) {
            return Self::StockLimit(message);
        }
        match status {
            StatusCode::BAD_REQUEST => Self::Validation { field, message },
            StatusCode::NOT_FOUND => Self::NotFound(message),
            _ => Self::Mutation {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// A local validation failure on the quantity argument.
    #[must_use]
    pub fn invalid_quantity(message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some("quantity".to_string()),
            message: message.into(),
        }
    }

    /// The classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Unauthorized => ErrorKind::Auth,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::StockLimit(_) => ErrorKind::StockLimit,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Mutation { .. } | Self::Decode(_) => ErrorKind::Mutation,
        }
    }

    /// Whether this error means the session is gone.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

fn mentions_stock(message: &str) -> bool {
    message.to_lowercase().contains("stock")
}
