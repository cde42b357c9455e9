//! `amotion status`: one-shot state read.

use std::fmt::Write;

use serde::Serialize;
use tabled::Tabled;

use amotion_core::{ConnectionState, DeviceInfo, DeviceSnapshot, Session};

use crate::cli::GlobalOpts;
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusView<'a> {
    session: &'a str,
    state: ConnectionState,
    device: DeviceInfo,
    snapshot: &'a DeviceSnapshot,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let mut updates = session.subscribe();
    session.connect().await?;
    session.query_info().await?;
    let snapshot = util::wait_for_snapshot(&mut updates, global.timeout).await?;

    let view = StatusView {
        session: session.name(),
        state: session.connection_state(),
        device: session.device_info(),
        snapshot: &snapshot,
    };
    let color = output::should_color(&global.color);
    let out = output::render_single(&global.output, &view, |v| detail(v, color), plain);
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(view: &StatusView<'_>, color: bool) -> String {
    let mut out = String::new();
    let device = &view.device;
    let _ = write!(out, "{} ({}", view.session, device.model_or_default());
    if let Some(ref version) = device.version {
        let _ = write!(out, " {version}");
    }
    let _ = writeln!(out, ")");
    let _ = writeln!(out, "State:   {}", output::paint_state(view.state, color));
    if let Some(at) = view.snapshot.updated_at() {
        let _ = writeln!(out, "Updated: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    let rows: Vec<FieldRow> = view
        .snapshot
        .fields()
        .map(|(field, value)| FieldRow {
            field: field.to_string(),
            value: util::format_value(field, value),
        })
        .collect();
    let _ = writeln!(out, "{}", output::render_table(&rows));

    let active = view.snapshot.active_state_names();
    if !active.is_empty() {
        let _ = write!(out, "Active:  {}", active.join(", "));
    }
    out.trim_end().to_owned()
}

fn plain(view: &StatusView<'_>) -> String {
    view.snapshot
        .fields()
        .map(|(field, value)| format!("{field}\t{value}"))
        .collect::<Vec<_>>()
        .join("\n")
}
