// Mutable session state. Everything here is guarded by the single
// session mutex; no field is touched without it.

use std::collections::HashMap;

use amotion_api::{LinkId, RequestId, ResponseCode};
use secrecy::SecretString;
use tokio::time::Instant;

use super::ConnectionState;
use crate::config::{Credentials, SessionConfig};
use crate::health::SendWatchdog;

/// Why a request was sent; decides what its response does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RequestKind {
    Login,
    TokenLogin,
    Discovery,
    QueryInfo,
    Ping,
    Command,
}

impl RequestKind {
    pub(crate) fn is_auth(self) -> bool {
        matches!(self, Self::Login | Self::TokenLogin)
    }
}

/// Expected response id per request kind.
///
/// Tracking a new request of a kind supersedes the previous one, so a
/// late answer to the older request no longer matches anything.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    expected: HashMap<RequestKind, RequestId>,
}

impl PendingRequests {
    /// Returns the id this request superseded, if any.
    pub(crate) fn track(&mut self, kind: RequestKind, id: RequestId) -> Option<RequestId> {
        self.expected.insert(kind, id)
    }

    /// Resolve a response id, removing the entry it matched.
    pub(crate) fn take(&mut self, id: RequestId) -> Option<RequestKind> {
        let kind = self
            .expected
            .iter()
            .find_map(|(kind, expected)| (*expected == id).then_some(*kind))?;
        self.expected.remove(&kind);
        Some(kind)
    }

    pub(crate) fn clear_auth(&mut self) {
        self.expected.retain(|kind, _| !kind.is_auth());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.expected.len()
    }
}

pub(crate) struct SessionState {
    pub(crate) phase: ConnectionState,
    /// Link the session currently listens to. Events from others are stale.
    pub(crate) link: Option<LinkId>,
    pub(crate) credentials: Credentials,
    pub(crate) token: Option<SecretString>,
    next_id: RequestId,
    pub(crate) pending: PendingRequests,
    /// Rejected logins since the last successful authentication.
    pub(crate) login_failures: u32,
    pub(crate) watchdog: SendWatchdog,
    pub(crate) last_refresh: Option<Instant>,
    /// Reason of the most recent link failure, for error messages.
    pub(crate) last_fault: Option<String>,
    /// Code the unit answered the latest acknowledged command with.
    pub(crate) last_command_ack: Option<(RequestId, ResponseCode)>,
}

impl SessionState {
    pub(crate) fn new(config: &SessionConfig) -> Self {
        Self {
            phase: ConnectionState::Disconnected,
            link: None,
            credentials: config.credentials.clone(),
            token: None,
            next_id: 0,
            pending: PendingRequests::default(),
            login_failures: 0,
            watchdog: SendWatchdog::new(config.stall_threshold),
            last_refresh: None,
            last_fault: None,
            last_command_ack: None,
        }
    }

    /// Next request id. Ids are never reused for the session's lifetime.
    pub(crate) fn allocate_id(&mut self) -> RequestId {
        self.next_id += 1;
        self.next_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn newer_request_supersedes_older() {
        let mut pending = PendingRequests::default();
        assert_eq!(pending.track(RequestKind::QueryInfo, 3), None);
        assert_eq!(pending.track(RequestKind::QueryInfo, 7), Some(3));

        assert_eq!(pending.take(3), None);
        assert_eq!(pending.take(7), Some(RequestKind::QueryInfo));
        assert_eq!(pending.take(7), None);
    }

    #[test]
    fn kinds_are_tracked_independently() {
        let mut pending = PendingRequests::default();
        pending.track(RequestKind::Login, 1);
        pending.track(RequestKind::Discovery, 2);
        pending.track(RequestKind::Ping, 3);
        assert_eq!(pending.len(), 3);

        assert_eq!(pending.take(2), Some(RequestKind::Discovery));
        pending.clear_auth();
        assert_eq!(pending.take(1), None);
        assert_eq!(pending.take(3), Some(RequestKind::Ping));
    }

    #[test]
    fn allocated_ids_are_never_reused() {
        let config = SessionConfig::new(
            "unit",
            url::Url::parse("ws://unit.test/api/ws").unwrap(),
            Credentials::new("admin", SecretString::from("pw")),
        );
        let mut state = SessionState::new(&config);
        let ids: Vec<_> = (0..5).map(|_| state.allocate_id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }
}
