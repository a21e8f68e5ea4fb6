//! # Client Error Types
//!
//! Error types for network, session and configuration failures.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Client Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Transport    │  │      Backend            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Config         │  │  Network        │  │  VoucherRejected        │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Http                   │ │
//! │  │                 │  │                 │  │  Deserialization        │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Session      │  │     Input       │  │      Internal           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  No token       │  │  Validation     │  │  StaleResponse          │ │
//! │  │  LoginFailed    │  │  Core           │  │  ChannelClosed          │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mmo_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Client error type covering every failure the marketplace client reports.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid client configuration: {0}")]
    Config(String),

    /// Invalid API base URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request never produced an HTTP response (DNS, refused, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// The backend refused a voucher code.
    ///
    /// `reason` carries the server's message (expired, used up, wrong store,
    /// minimum order not met, ...) when one was sent.
    #[error("Voucher rejected: {}", .reason.as_deref().unwrap_or("no reason given"))]
    VoucherRejected { reason: Option<String> },

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {}", .reason.as_deref().unwrap_or("no details"))]
    Http { status: u16, reason: Option<String> },

    /// A response body did not match the expected shape.
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// An authenticated call was made without a live token.
    #[error("Not signed in")]
    NotAuthenticated,

    /// The token endpoint refused the credentials.
    #[error("Login failed: {0}")]
    LoginFailed(String),

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// User input failed validation before any request was made.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Domain rule violated (stock, unknown type, ...).
    #[error(transparent)]
    Core(CoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// A response arrived for a superseded request.
    #[error("Stale response for request #{seq}")]
    StaleResponse { seq: u64 },

    /// The actor behind a handle has stopped.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => ClientError::Validation(v),
            other => ClientError::Core(other),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Deserialization(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Http {
                status: status.as_u16(),
                reason: None,
            }
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Deserialization(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ClientError {
    /// Returns true if the request never reached a verdict from the backend.
    ///
    /// Nothing in this crate retries automatically; callers use this to
    /// decide whether to offer a manual retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Timeout)
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(self, ClientError::Config(_) | ClientError::InvalidUrl(_))
    }

    /// Text suitable for a non-blocking notice.
    ///
    /// Prefers the server's own reason when one was sent.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::VoucherRejected { reason: Some(r) } => r.clone(),
            ClientError::VoucherRejected { reason: None } => "Voucher is not valid".to_string(),
            ClientError::Http {
                reason: Some(r), ..
            } => r.clone(),
            ClientError::Network(_) | ClientError::Timeout => {
                "Network error, please try again".to_string()
            }
            ClientError::NotAuthenticated => "Please sign in first".to_string(),
            other => other.to_string(),
        }
    }
}
