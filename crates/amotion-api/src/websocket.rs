//! WebSocket implementation of [`Transport`].
//!
//! Each [`open`](Transport::open) spawns one task that performs the
//! handshake and then owns both halves of the socket: inbound text frames
//! are forwarded as [`LinkEvent`]s, outbound frames arrive over an
//! unbounded channel so that [`send`](Transport::send) never awaits.
//! Opening again, closing, or dropping the transport cancels the task.
//!
//! Reconnection policy lives with the caller; a link that dies stays dead.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::transport::{EventSender, LinkEvent, LinkEventKind, LinkId, Transport, TransportConfig};

// ── WsTransport ──────────────────────────────────────────────────────

/// Transport over `tokio-tungstenite`.
pub struct WsTransport {
    events: EventSender,
    config: TransportConfig,
    next_link: AtomicU64,
    current: Mutex<Option<Link>>,
}

/// Handle to the task driving one link.
struct Link {
    id: LinkId,
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
    open: Arc<AtomicBool>,
}

impl Link {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl WsTransport {
    pub fn new(events: EventSender, config: TransportConfig) -> Self {
        Self {
            events,
            config,
            next_link: AtomicU64::new(1),
            current: Mutex::new(None),
        }
    }

    fn current(&self) -> std::sync::MutexGuard<'_, Option<Link>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for WsTransport {
    fn open(&self, endpoint: &Url) -> Result<LinkId, Error> {
        let uri: tungstenite::http::Uri = endpoint
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

        let id = self.next_link.fetch_add(1, Ordering::Relaxed);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let link = Link {
            id,
            outbound,
            cancel: CancellationToken::new(),
            open: Arc::new(AtomicBool::new(false)),
        };

        let task = LinkTask {
            id,
            events: self.events.clone(),
            cancel: link.cancel.clone(),
            open: Arc::clone(&link.open),
        };
        let request = ClientRequestBuilder::new(uri)
            .with_header("User-Agent", self.config.user_agent.clone());
        let timeout = self.config.handshake_timeout;

        if let Some(previous) = self.current().replace(link) {
            tracing::debug!(link = previous.id, "Replacing WebSocket link");
            previous.cancel.cancel();
        }

        tracing::info!(link = id, url = %endpoint, "Opening WebSocket link");
        tokio::spawn(task.run(request, timeout, outbound_rx));
        Ok(id)
    }

    fn send(&self, text: String) -> Result<(), Error> {
        let guard = self.current();
        match guard.as_ref() {
            Some(link) if link.is_open() => link
                .outbound
                .send(Message::text(text))
                .map_err(|_| Error::NotConnected),
            _ => Err(Error::NotConnected),
        }
    }

    fn close(&self) {
        if let Some(link) = self.current().take() {
            tracing::debug!(link = link.id, "Closing WebSocket link");
            link.open.store(false, Ordering::Release);
            link.cancel.cancel();
        }
    }

    fn is_open(&self) -> bool {
        self.current().as_ref().is_some_and(Link::is_open)
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Link task ────────────────────────────────────────────────────────

struct LinkTask {
    id: LinkId,
    events: EventSender,
    cancel: CancellationToken,
    open: Arc<AtomicBool>,
}

impl LinkTask {
    fn emit(&self, kind: LinkEventKind) {
        if self.cancel.is_cancelled() {
            return;
        }
        // Receiver gone means the session is shutting down.
        let _ = self.events.send(LinkEvent::new(self.id, kind));
    }

    async fn run(
        self,
        request: ClientRequestBuilder,
        timeout: Duration,
        mut outbound: mpsc::UnboundedReceiver<Message>,
    ) {
        let handshake = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request));
        let stream = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return,
            result = handshake => match result {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(e)) => {
                    tracing::warn!(link = self.id, error = %e, "WebSocket handshake failed");
                    self.emit(LinkEventKind::Error(e.to_string()));
                    return;
                }
                Err(_) => {
                    let timeout_secs = timeout.as_secs();
                    tracing::warn!(link = self.id, timeout_secs, "WebSocket handshake timed out");
                    self.emit(LinkEventKind::Error(
                        Error::Timeout { timeout_secs }.to_string(),
                    ));
                    return;
                }
            }
        };

        self.open.store(true, Ordering::Release);
        tracing::info!(link = self.id, "WebSocket connected");
        self.emit(LinkEventKind::Open);

        let (mut write, mut read) = stream.split();

        let ending = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    self.open.store(false, Ordering::Release);
                    return;
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.emit(LinkEventKind::Message(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or((None, String::new()), |cf| {
                            (Some(u16::from(cf.code)), cf.reason.as_str().to_owned())
                        });
                        tracing::info!(link = self.id, ?code, %reason, "WebSocket close frame received");
                        break LinkEventKind::Close { code, reason };
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite answers pings itself
                        tracing::trace!(link = self.id, "WebSocket ping");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(link = self.id, error = %e, "WebSocket read failed");
                        break LinkEventKind::Error(e.to_string());
                    }
                    None => {
                        tracing::info!(link = self.id, "WebSocket stream ended");
                        break LinkEventKind::Close { code: None, reason: "stream ended".into() };
                    }
                },
                Some(message) = outbound.recv() => {
                    if let Err(e) = write.send(message).await {
                        tracing::warn!(link = self.id, error = %e, "WebSocket write failed");
                        break LinkEventKind::Error(e.to_string());
                    }
                }
            }
        };

        self.open.store(false, Ordering::Release);
        self.emit(ending);
    }
}

// ── Tests ────────────────────────────────────────────────────────────
