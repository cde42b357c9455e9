//! `amotion watch`: follow pushed state until Ctrl-C.

use std::time::Duration;

use chrono::Utc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use amotion_core::{DeviceSnapshot, Session};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(session: &Session, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut updates = session.subscribe();
    let mut states = session.watch_connection_state();
    let mut ticker = (args.refresh > 0).then(|| {
        let mut t = tokio::time::interval(Duration::from_secs(args.refresh));
        t.set_missed_tick_behavior(MissedTickBehavior::Delay);
        t
    });
    let color = output::should_color(&global.color);

    // The health monitor retries on its own if this fails.
    if let Err(e) = session.refresh().await {
        warn!(error = %e, "initial state request failed");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                info!(%state, "connection state");
                if matches!(global.output, OutputFormat::Table) && !global.quiet {
                    eprintln!("{} {}", Utc::now().format("%H:%M:%S"), output::paint_state(state, color));
                }
            }
            snapshot = updates.changed() => {
                let Some(snapshot) = snapshot else { break };
                let out = output::render_single(&global.output, &*snapshot, summary_line, summary_line);
                output::print_output(&out, global.quiet);
            }
            () = next_tick(&mut ticker) => {
                if let Err(e) = session.refresh().await {
                    warn!(error = %e, "state request failed");
                }
            }
        }
    }
    Ok(())
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn summary_line(snapshot: &DeviceSnapshot) -> String {
    let time = snapshot.updated_at().unwrap_or_else(Utc::now).format("%H:%M:%S");
    let fields: Vec<String> = snapshot
        .fields()
        .map(|(field, value)| format!("{field}={value}"))
        .collect();
    format!("{time} {}", fields.join(" "))
}
