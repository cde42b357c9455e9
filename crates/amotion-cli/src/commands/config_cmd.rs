//! Config subcommand handlers.

use std::fmt::Write;

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ProfileEntry {
    name: String,
    host: String,
    username: Option<String>,
    model: Option<String>,
    default: bool,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Model")]
    model: String,
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
        }
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
        }
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let entries = profile_entries(&cfg);
            let out = output::render_list(
                &global.output,
                &entries,
                |e| ProfileRow {
                    marker: if e.default { "*" } else { "" },
                    name: e.name.clone(),
                    host: e.host.clone(),
                    username: e.username.clone().unwrap_or_default(),
                    model: e.model.clone().unwrap_or_default(),
                },
                |e| e.name.clone(),
            );
            output::print_output(&out, global.quiet);
        }
    }
    Ok(())
}

fn profile_entries(cfg: &Config) -> Vec<ProfileEntry> {
    let mut entries: Vec<ProfileEntry> = cfg
        .profiles
        .iter()
        .map(|(name, p)| ProfileEntry {
            name: name.clone(),
            host: p.host.clone(),
            username: p.username.clone(),
            model: p.model.clone(),
            default: cfg.default_profile.as_deref() == Some(name.as_str()),
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Format config for display, masking the password.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "health_interval = {}", cfg.defaults.health_interval);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "host = \"{}\"", p.host);
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        for (key, value) in [
            ("model", &p.model),
            ("version", &p.version),
            ("production_number", &p.production_number),
            ("board_number", &p.board_number),
        ] {
            if let Some(v) = value {
                let _ = writeln!(out, "{key} = \"{v}\"");
            }
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use crate::config::Profile;

    use super::*;

    #[test]
    fn redacted_view_hides_the_password() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                host: "10.0.0.7".into(),
                password: Some("hunter2".into()),
                model: Some("aMotion".into()),
                ..Profile::default()
            },
        );
        let text = format_config_redacted(&cfg);
        assert!(text.contains("password = \"****\""));
        assert!(text.contains("model = \"aMotion\""));
        assert!(!text.contains("hunter2"));
    }
}
