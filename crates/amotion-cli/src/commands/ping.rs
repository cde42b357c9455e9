//! `amotion ping`: measure one request round trip.

use serde::Serialize;
use tokio::time::Instant;

use amotion_core::Session;

use crate::cli::GlobalOpts;
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Pong<'a> {
    session: &'a str,
    latency_ms: u64,
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    // Log in first so the measurement covers the ping alone.
    session.connect().await?;

    let started = Instant::now();
    session.ping().await?;
    util::wait_for_answer(session, global.timeout).await?;
    let pong = Pong {
        session: session.name(),
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    let out = output::render_single(
        &global.output,
        &pong,
        |p| format!("pong from {} in {} ms", p.session, p.latency_ms),
        |p| p.latency_ms.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
