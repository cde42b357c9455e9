// ── Runtime session configuration ──
//
// Describes *how* to talk to one unit: where it lives, who logs in, and
// the timing bounds of every wait. Never touches disk; the CLI builds a
// `SessionConfig` from its profile and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;
use crate::model::DeviceInfo;

/// Username and password for the credential login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Display name, used in logs and as the registry key.
    pub name: String,
    /// WebSocket endpoint, e.g. `ws://192.168.1.50/api/ws`.
    pub endpoint: Url,
    pub credentials: Credentials,
    /// Identity known before the first `discovery` round trip.
    pub device: DeviceInfo,

    /// How often the connect wait re-checks the phase.
    pub connect_poll_interval: Duration,
    /// Number of polls before a connect attempt gives up.
    pub connect_poll_attempts: u32,
    /// Total send attempts for one command before it is dropped.
    pub publish_attempts: u32,
    /// Pause between failed send attempts.
    pub publish_retry_delay: Duration,
    /// Rejected logins tolerated before authentication becomes terminal.
    pub max_login_attempts: u32,
    /// Sends without any inbound frame before the link counts as stalled.
    pub stall_threshold: u32,
    /// Health monitor period. `None` disables the monitor.
    pub health_interval: Option<Duration>,
    /// Minimum spacing between two [`refresh`](crate::Session::refresh) queries.
    pub refresh_throttle: Duration,
    /// Upper bound on the WebSocket handshake.
    pub handshake_timeout: Duration,
}

impl SessionConfig {
    pub fn new(name: impl Into<String>, endpoint: Url, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            endpoint,
            credentials,
            device: DeviceInfo::default(),
            connect_poll_interval: Duration::from_secs(3),
            connect_poll_attempts: 10,
            publish_attempts: 5,
            publish_retry_delay: Duration::from_secs(3),
            max_login_attempts: 5,
            stall_threshold: 5,
            health_interval: Some(Duration::from_secs(60)),
            refresh_throttle: Duration::from_secs(15),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Longest a single connect attempt may wait for authentication.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_poll_interval * self.connect_poll_attempts
    }
}

/// Build the session endpoint for a host name or `host:port`.
pub fn endpoint_for_host(host: &str) -> Result<Url, CoreError> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(CoreError::Config {
            message: "host must not be empty".into(),
        });
    }
    let raw = if host.contains("://") {
        host.to_owned()
    } else {
        format!("ws://{host}/api/ws")
    };
    Url::parse(&raw).map_err(|e| CoreError::Config {
        message: format!("invalid endpoint '{raw}': {e}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_bare_host() {
        let url = endpoint_for_host("192.168.1.50").unwrap();
        assert_eq!(url.as_str(), "ws://192.168.1.50/api/ws");
    }

    #[test]
    fn endpoint_keeps_port_and_explicit_scheme() {
        assert_eq!(
            endpoint_for_host("amotion.local:8080/").unwrap().as_str(),
            "ws://amotion.local:8080/api/ws"
        );
        assert_eq!(
            endpoint_for_host("wss://unit.example/api/ws").unwrap().as_str(),
            "wss://unit.example/api/ws"
        );
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(matches!(endpoint_for_host("  "), Err(CoreError::Config { .. })));
    }

    #[test]
    fn default_timing() {
        let config = SessionConfig::new(
            "unit",
            endpoint_for_host("unit").unwrap(),
            Credentials::new("admin", SecretString::from("pw")),
        );
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.publish_attempts, 5);
        assert_eq!(config.max_login_attempts, 5);
        assert_eq!(config.stall_threshold, 5);
        assert_eq!(config.health_interval, Some(Duration::from_secs(60)));
    }
}
