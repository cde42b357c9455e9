use thiserror::Error;

/// Top-level error type for the `amotion-api` crate.
///
/// Covers every failure mode across both API surfaces: the WebSocket
/// session transport, the wire codec, and the onboarding HTTP endpoints.
/// `amotion-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected by the unit (wrong password, expired token, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The unit does not know the supplied user name.
    #[error("Unknown user -- the unit rejected the user name")]
    InvalidUser,

    // ── HTTP transport ──────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Operation timed out.
    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Onboarding API ──────────────────────────────────────────────
    /// Non-OK `code` returned by an onboarding endpoint.
    #[error("Unit API error ({code})")]
    Api { code: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// A send was attempted while no link is open.
    #[error("WebSocket is not connected")]
    NotConnected,

    // ── Data ────────────────────────────────────────────────────────
    /// Inbound frame that is not valid JSON or has no recognizable shape.
    #[error("Undecodable frame: {message}")]
    Decode { message: String, frame: String },

    /// Outbound envelope could not be serialized.
    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// JSON deserialization of an HTTP body failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the unit rejected the supplied credentials.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::InvalidUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejections_are_classified() {
        assert!(Error::InvalidUser.is_auth_rejected());
        assert!(
            Error::Authentication {
                message: "bad password".into()
            }
            .is_auth_rejected()
        );
        assert!(!Error::NotConnected.is_auth_rejected());
    }
}
