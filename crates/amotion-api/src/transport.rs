// Transport seam between the session engine and the socket.
//
// A transport owns at most one live link. Everything the link observes
// (open, close, error, inbound text) is pushed as a `LinkEvent` into the
// channel handed over at construction, tagged with the link id so the
// receiver can discard events from links it already replaced.

use std::time::Duration;

use tokio::sync::mpsc;
use url::Url;

use crate::error::Error;

/// Identifies one opened link. Never reused by a transport instance.
pub type LinkId = u64;

/// Sink for link events.
pub type EventSender = mpsc::UnboundedSender<LinkEvent>;

/// Something that happened on a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub link: LinkId,
    pub kind: LinkEventKind,
}

impl LinkEvent {
    pub fn new(link: LinkId, kind: LinkEventKind) -> Self {
        Self { link, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEventKind {
    /// Handshake finished; sends are accepted from now on.
    Open,
    /// The peer closed the link or the stream ended.
    Close { code: Option<u16>, reason: String },
    /// Handshake or socket failure. The link is dead afterwards.
    Error(String),
    /// One inbound text frame.
    Message(String),
}

/// Bidirectional text-frame link to one endpoint.
///
/// Methods never block: `open` starts the handshake in the background and
/// reports the outcome as a [`LinkEventKind::Open`] or
/// [`LinkEventKind::Error`] event.
pub trait Transport: Send + Sync {
    /// Start a new link, replacing (and silently closing) any existing one.
    fn open(&self, endpoint: &Url) -> Result<LinkId, Error>;

    /// Queue one text frame on the open link.
    ///
    /// Fails with [`Error::NotConnected`] unless the current link has
    /// reported open.
    fn send(&self, text: String) -> Result<(), Error>;

    /// Tear down the current link. Emits no events for it.
    fn close(&self);

    /// Whether the current link has completed its handshake and is alive.
    fn is_open(&self) -> bool;
}

/// WebSocket link settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on the TCP connect + WebSocket upgrade.
    pub handshake_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            user_agent: concat!("amotion/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}
