//! CLI configuration: thin wrapper around `amotion_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --username, --password, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use amotion_core::{Credentials, SessionConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use amotion_config::{Config, Defaults, Profile, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names, for help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Build a `SessionConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, `--host` plus credentials from flags or
/// env are enough.
pub fn build_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, &cfg.defaults, global);
    }

    let Some(host) = global.host.clone() else {
        return Err(if global.profile.is_some() {
            CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            }
        } else {
            CliError::NoConfig {
                path: config_path().display().to_string(),
            }
        });
    };

    let profile = Profile {
        host,
        ..Profile::default()
    };
    resolve_profile(&profile, &profile_name, &cfg.defaults, global)
}

/// Translate a `Profile` + global flags into a `SessionConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<SessionConfig, CliError> {
    let mut profile = profile.clone();
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }

    let username = match global.username {
        Some(ref username) => username.clone(),
        None => amotion_config::resolve_username(&profile, profile_name)?,
    };
    let password = match global.password {
        Some(ref password) => SecretString::from(password.clone()),
        None => amotion_config::resolve_password(&profile, profile_name)?,
    };

    let mut config =
        amotion_config::session_config_with(&profile, profile_name, defaults, Credentials::new(username, password))?;
    config.handshake_timeout = Duration::from_secs(global.timeout);
    Ok(config)
}
