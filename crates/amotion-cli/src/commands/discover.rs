//! `amotion discover`: ask the unit who it is.

use std::fmt::Write;
use std::time::Duration;

use amotion_core::{DeviceInfo, Session};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let mut identity = session.watch_device_info();
    session.discover().await?;

    tokio::time::timeout(Duration::from_secs(global.timeout), identity.changed())
        .await
        .map_err(|_| CliError::Timeout { seconds: global.timeout })?
        .map_err(|_| CliError::Internal("session closed".into()))?;

    let device = session.device_info();
    let out = output::render_single(&global.output, &device, detail, |d| {
        d.production_number.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(device: &DeviceInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model:             {}", device.model_or_default());
    for (label, value) in [
        ("Version:          ", &device.version),
        ("Production number:", &device.production_number),
        ("Board number:     ", &device.board_number),
    ] {
        let _ = writeln!(out, "{label} {}", value.as_deref().unwrap_or("-"));
    }
    out.trim_end().to_owned()
}
