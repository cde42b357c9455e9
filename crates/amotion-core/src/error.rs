// ── Core error types ──
//
// User-facing errors from amotion-core. Consumers never see raw socket
// or JSON failures; `From<amotion_api::Error>` maps them into
// session-level variants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to unit at {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Unit did not authenticate within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Session is not connected")]
    NotConnected,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Failed to deliver '{endpoint}' after {attempts} attempts")]
    PublishFailed { endpoint: String, attempts: u32 },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Unit rejected the request ({code})")]
    Rejected { code: String },

    #[error("Session has been shut down")]
    Shutdown,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Authentication failures need new credentials; retrying cannot help.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. } | Self::Shutdown)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<amotion_api::Error> for CoreError {
    fn from(err: amotion_api::Error) -> Self {
        match err {
            amotion_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            amotion_api::Error::InvalidUser => CoreError::AuthenticationFailed {
                message: "unknown user name".into(),
            },
            amotion_api::Error::Http(ref e) => CoreError::ConnectionFailed {
                endpoint: e.url().map(ToString::to_string).unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            amotion_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            amotion_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            amotion_api::Error::Api { code } => CoreError::Rejected { code },
            amotion_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                endpoint: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            amotion_api::Error::NotConnected => CoreError::NotConnected,
            amotion_api::Error::Decode { message, .. } => {
                CoreError::Internal(format!("Undecodable frame: {message}"))
            }
            amotion_api::Error::Encode(e) => CoreError::Internal(format!("Encode error: {e}")),
            amotion_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
