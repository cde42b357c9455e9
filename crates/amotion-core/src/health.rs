// ── Link health ──
//
// Two mechanisms keep a session usable without caller involvement: a
// periodic monitor that reconnects whenever the session is not
// authenticated, and a send watchdog that declares the link stalled when
// the unit stops answering while the socket still looks open.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::session::{ConnectionState, Session};

// ── SendWatchdog ─────────────────────────────────────────────────────

/// Counts sends since the last inbound frame.
#[derive(Debug, Clone)]
pub(crate) struct SendWatchdog {
    unacknowledged: u32,
    threshold: u32,
}

impl SendWatchdog {
    pub(crate) fn new(threshold: u32) -> Self {
        Self {
            unacknowledged: 0,
            threshold: threshold.max(1),
        }
    }

    /// Count one send. Returns `true` when the threshold is reached, in
    /// which case the counter starts over.
    pub(crate) fn record_send(&mut self) -> bool {
        self.unacknowledged += 1;
        if self.unacknowledged >= self.threshold {
            self.unacknowledged = 0;
            true
        } else {
            false
        }
    }

    /// Any inbound frame proves the link alive.
    pub(crate) fn acknowledge(&mut self) {
        self.unacknowledged = 0;
    }

    pub(crate) fn unacknowledged(&self) -> u32 {
        self.unacknowledged
    }
}

// ── Health monitor ───────────────────────────────────────────────────

/// Reconnect whenever the session is not authenticated, then sleep one
/// interval. Runs until `cancel` fires; individual failures are logged.
pub(crate) async fn health_monitor_task(session: Session, interval: Duration, cancel: CancellationToken) {
    debug!(session = %session.name(), interval_secs = interval.as_secs(), "health monitor started");

    loop {
        match session.connection_state() {
            ConnectionState::Authenticated => trace!("health check: link is up"),
            ConnectionState::AuthFailed => {
                debug!("health check: authentication is disabled until credentials change");
            }
            state => {
                debug!(%state, "health check: reconnecting");
                if let Err(e) = session.connect().await {
                    warn!(error = %e, "health check reconnect failed");
                }
            }
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    debug!("health monitor stopped");
}
