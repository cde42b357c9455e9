//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use amotion_config::ConfigError;
use amotion_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the unit at {endpoint}")]
    #[diagnostic(
        code(amotion::connection_failed),
        help(
            "Check that the unit is powered and reachable on the network.\n\
             Endpoint: {endpoint}"
        )
    )]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request '{endpoint}' could not be delivered after {attempts} attempts")]
    #[diagnostic(
        code(amotion::delivery_failed),
        help("The unit did not accept a session in time. Run with -v to see each attempt.")
    )]
    DeliveryFailed { endpoint: String, attempts: u32 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(amotion::auth_failed),
        help(
            "Verify the user name and password for this unit.\n\
             Run: amotion onboard <host> to store new credentials"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(amotion::no_credentials),
        help("Run: amotion onboard <host>\nOr set AMOTION_USERNAME and AMOTION_PASSWORD.")
    )]
    NoCredentials { profile: String },

    // ── Unit ─────────────────────────────────────────────────────────
    #[error("The unit rejected the request ({code})")]
    #[diagnostic(code(amotion::rejected))]
    Rejected { code: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(amotion::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(amotion::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: amotion onboard <host> --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No unit configured")]
    #[diagnostic(
        code(amotion::no_config),
        help(
            "Pass --host, or create a profile with: amotion onboard <host>\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(amotion::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("No answer from the unit within {seconds}s")]
    #[diagnostic(
        code(amotion::timeout),
        help("Increase the timeout with --timeout or check the unit's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(amotion::internal))]
    Internal(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::DeliveryFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { endpoint, reason } => CliError::ConnectionFailed {
                endpoint,
                source: reason.into(),
            },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::NotConnected => CliError::ConnectionFailed {
                endpoint: "(not connected)".into(),
                source: "session is not connected".into(),
            },
            CoreError::PublishFailed { endpoint, attempts } => {
                CliError::DeliveryFailed { endpoint, attempts }
            }
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Rejected { code } => CliError::Rejected { code },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Shutdown => CliError::Internal("session was shut down".into()),
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

impl From<amotion_api::Error> for CliError {
    fn from(err: amotion_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
