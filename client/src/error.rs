//! Error types for the client crate.
//!
//! DESIGN
//! ======
//! `ApiError` is the transport/auth taxonomy the request pipeline classifies
//! every failure into. Each variant maps onto exactly one user-visible notice
//! category (see `net::notice`). Store and config errors stay separate so a
//! durable-storage problem can never masquerade as a server response.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

// =============================================================================
// API
// =============================================================================

/// Classified failure of a call issued through the request pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the credential (HTTP 401).
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Valid session, insufficient privilege (HTTP 403).
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// The addressed resource does not exist (HTTP 404).
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Any other non-success status with a response.
    #[error("request failed with status {status}: {message}")]
    Server { status: u16, message: String },

    /// No response was received (connect failure, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// A success response whose body does not match the expected payload.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The request could not be built on the client side.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status of the response that produced this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Server { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Message carried by the server response, if one was classified.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Server { message, .. } => Some(message),
            Self::Network(_) | Self::Decode(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Whether this is the authorization-expired classification.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Failure writing the durable session mirror.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// CONFIG
// =============================================================================

/// Failure parsing client configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL `{0}`: expected http:// or https://")]
    InvalidBaseUrl(String),

    #[error("invalid value `{value}` for {var}: expected a positive integer")]
    InvalidNumber { var: String, value: String },
}
