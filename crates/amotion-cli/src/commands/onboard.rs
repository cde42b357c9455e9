//! `amotion onboard`: first contact over HTTP, then save a profile.

use std::fmt::Write;
use std::time::Duration;

use dialoguer::Input;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use amotion_api::OnboardingClient;
use amotion_api::http::HttpConfig;
use amotion_core::DeviceInfo;

use crate::cli::{GlobalOpts, OnboardArgs, OutputFormat};
use crate::commands::util::prompt_err;
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: &OnboardArgs, global: &GlobalOpts) -> Result<(), CliError> {
    // Parse errors surface before anything is written.
    let mut cfg = config::load_config()?;

    let username = match global.username {
        Some(ref username) => username.clone(),
        None => Input::new()
            .with_prompt("Username")
            .default("admin".to_owned())
            .interact_text()
            .map_err(prompt_err)?,
    };
    let password = match global.password {
        Some(ref password) => SecretString::from(password.clone()),
        None => SecretString::from(rpassword::prompt_password("Password: ").map_err(prompt_err)?),
    };
    if username.is_empty() || password.expose_secret().is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    let http = HttpConfig::default().with_timeout(Duration::from_secs(global.timeout));
    let client = OnboardingClient::for_host(&args.host, &http)?;
    client.login(&username, &password).await?;
    let device = DeviceInfo::from(client.discovery().await?);
    info!(host = %args.host, model = %device.model_or_default(), "unit answered");

    let mut profile = Profile {
        host: args.host.clone(),
        username: Some(username),
        ..Profile::default()
    };
    profile.set_device(&device);
    if args.plaintext {
        profile.password = Some(password.expose_secret().to_owned());
    } else {
        amotion_config::store_keyring_password(&args.name, &password)?;
    }

    cfg.profiles.insert(args.name.clone(), profile);
    if args.set_default || cfg.profiles.len() == 1 {
        cfg.default_profile = Some(args.name.clone());
    }
    let path = config::save_config(&cfg)?;

    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        eprintln!("saved profile '{}' to {}", args.name, path.display());
    }
    let out = output::render_single(&global.output, &device, detail, |d| {
        d.production_number.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(device: &DeviceInfo) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}", device.model_or_default());
    if let Some(ref version) = device.version {
        let _ = write!(out, " {version}");
    }
    if let Some(ref number) = device.production_number {
        let _ = write!(out, ", production number {number}");
    }
    out
}
