// ── Session engine ──
//
// One authenticated conversation with one unit over one transport.
// Link events are message-passed from the transport into a dispatcher
// task; command issuance and the health monitor run on caller tasks.
// All of them meet at a single `SessionState` behind one mutex, and no
// `.await` happens while it is held.

mod routing;
mod state;

use std::fmt;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use amotion_api::{
    Args, Endpoint, EventSender, LinkEvent, Request, RequestId, ResponseCode, Transport,
    TransportConfig, WsTransport,
};
use secrecy::SecretString;
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::{Credentials, SessionConfig};
use crate::error::CoreError;
use crate::health::health_monitor_task;
use crate::model::DeviceInfo;
use crate::store::{DeviceSnapshot, StateCache};
use crate::stream::SnapshotStream;

use state::{RequestKind, SessionState};

// ── ConnectionState ──────────────────────────────────────────────────

/// Session phase, observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    /// Link requested, handshake not finished.
    Connecting,
    /// Link open, login sent.
    AwaitingAuth,
    Authenticated,
    /// The link failed; it is closed before the next attempt.
    Faulted,
    /// The unit rejected too many logins. Cleared only by
    /// [`Session::update_credentials`].
    AuthFailed,
}

impl ConnectionState {
    pub fn is_authenticated(self) -> bool {
        self == Self::Authenticated
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Handle to one unit session.
///
/// Cheaply cloneable. Background tasks (dispatcher, optional health
/// monitor) live until [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name())
            .field("endpoint", &self.inner.config.endpoint.as_str())
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

struct SessionInner {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<SessionState>,
    phase: watch::Sender<ConnectionState>,
    cache: Arc<StateCache>,
    device: watch::Sender<DeviceInfo>,
    /// Serializes connect attempts so concurrent callers join one.
    connecting: Mutex<()>,
    cancel: CancellationToken,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Create a session over a WebSocket transport and spawn its
    /// background tasks. Does not connect; the health monitor (when
    /// enabled) or the first command will.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: SessionConfig) -> Self {
        let transport_config = TransportConfig {
            handshake_timeout: config.handshake_timeout,
            ..TransportConfig::default()
        };
        Self::with_transport(config, move |events| {
            let transport: Arc<dyn Transport> = Arc::new(WsTransport::new(events, transport_config));
            transport
        })
    }

    /// Like [`new`](Self::new) with a caller-built transport. `build`
    /// receives the sender the transport must push its link events into.
    pub fn with_transport<F>(config: SessionConfig, build: F) -> Self
    where
        F: FnOnce(EventSender) -> Arc<dyn Transport>,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = build(events_tx);
        let (phase, _) = watch::channel(ConnectionState::Disconnected);
        let (device, _) = watch::channel(config.device.clone());

        let session = Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState::new(&config)),
                config,
                transport,
                phase,
                cache: Arc::new(StateCache::new()),
                device,
                connecting: Mutex::new(()),
                cancel: CancellationToken::new(),
                tasks: std::sync::Mutex::new(Vec::new()),
            }),
        };

        let mut handles = vec![tokio::spawn(dispatch_task(session.clone(), events_rx))];
        if let Some(interval) = session.inner.config.health_interval {
            let cancel = session.inner.cancel.clone();
            handles.push(tokio::spawn(health_monitor_task(session.clone(), interval, cancel)));
        }
        session
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(handles);

        debug!(session = %session.name(), endpoint = %session.inner.config.endpoint, "session created");
        session
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Make sure the session is authenticated.
    ///
    /// A no-op when already authenticated; joins an attempt already in
    /// progress. Otherwise opens the link and waits, bounded by the poll
    /// settings, for the login handshake to finish.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let _connecting = self.inner.connecting.lock().await;
        self.ensure_running()?;
        {
            let mut state = self.inner.state.lock().await;
            match state.phase {
                ConnectionState::Authenticated => return Ok(()),
                ConnectionState::AuthFailed => return Err(auth_failed_error(&state)),
                ConnectionState::Faulted => {
                    debug!("closing faulted link before reconnecting");
                    self.drop_link(&mut state, ConnectionState::Disconnected);
                }
                ConnectionState::Disconnected
                | ConnectionState::Connecting
                | ConnectionState::AwaitingAuth => {}
            }
            if state.phase == ConnectionState::Disconnected {
                self.open_link(&mut state)?;
            }
        }
        self.await_authenticated().await
    }

    /// Run the login handshake again on the open link, or connect.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        let _connecting = self.inner.connecting.lock().await;
        self.ensure_running()?;
        {
            let mut state = self.inner.state.lock().await;
            match state.phase {
                ConnectionState::AuthFailed => return Err(auth_failed_error(&state)),
                ConnectionState::Connecting => {}
                ConnectionState::Authenticated | ConnectionState::AwaitingAuth
                    if self.inner.transport.is_open() =>
                {
                    self.transition(&mut state, ConnectionState::AwaitingAuth);
                    self.send_login(&mut state);
                }
                _ => {
                    self.drop_link(&mut state, ConnectionState::Disconnected);
                    self.open_link(&mut state)?;
                }
            }
        }
        self.await_authenticated().await
    }

    /// Stop background tasks and close the link. Pending waits return
    /// [`CoreError::Shutdown`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        {
            let mut state = self.inner.state.lock().await;
            self.drop_link(&mut state, ConnectionState::Disconnected);
        }

        let handles = std::mem::take(
            &mut *self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            let _ = handle.await;
        }
        info!(session = %self.name(), "session shut down");
    }

    /// Replace the login credentials. Drops the token and re-enables
    /// authentication after a terminal failure.
    pub async fn update_credentials(&self, username: impl Into<String>, password: SecretString) {
        let mut state = self.inner.state.lock().await;
        state.credentials = Credentials::new(username, password);
        state.token = None;
        state.login_failures = 0;
        state.last_fault = None;
        if state.phase == ConnectionState::AuthFailed {
            self.transition(&mut state, ConnectionState::Disconnected);
        }
        info!(session = %self.name(), "credentials updated");
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Send a command. Returns the id it was sent under.
    ///
    /// Nothing is queued: if the session cannot be brought up within the
    /// publish attempts the command is dropped and
    /// [`CoreError::PublishFailed`] returned.
    pub async fn send_command(&self, command: &Command) -> Result<RequestId, CoreError> {
        let (endpoint, args) = command.to_wire()?;
        self.publish(RequestKind::Command, endpoint, args).await
    }

    /// Ask for a full `ui_info` body; the answer lands in the state cache.
    pub async fn query_info(&self) -> Result<RequestId, CoreError> {
        self.publish(RequestKind::QueryInfo, Endpoint::UiInfo, Args::Null).await
    }

    /// Ask the unit for its identity; the answer updates [`device_info`](Self::device_info).
    pub async fn discover(&self) -> Result<RequestId, CoreError> {
        self.publish(RequestKind::Discovery, Endpoint::Discovery, Args::Null).await
    }

    pub async fn ping(&self) -> Result<RequestId, CoreError> {
        self.publish(RequestKind::Ping, Endpoint::Ping, Args::Null).await
    }

    /// [`query_info`](Self::query_info), at most once per refresh throttle.
    /// Returns `None` when throttled.
    pub async fn refresh(&self) -> Result<Option<RequestId>, CoreError> {
        {
            let mut state = self.inner.state.lock().await;
            let now = Instant::now();
            if let Some(last) = state.last_refresh {
                if now.duration_since(last) < self.inner.config.refresh_throttle {
                    debug!("refresh throttled");
                    return Ok(None);
                }
            }
            state.last_refresh = Some(now);
        }
        self.query_info().await.map(Some)
    }

    // ── State observation ────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.phase.borrow()
    }

    pub fn watch_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.phase.subscribe()
    }

    pub fn snapshot(&self) -> Arc<DeviceSnapshot> {
        self.inner.cache.snapshot()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.cache.subscribe()
    }

    pub fn cache(&self) -> &Arc<StateCache> {
        &self.inner.cache
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.inner.device.borrow().clone()
    }

    pub fn watch_device_info(&self) -> watch::Receiver<DeviceInfo> {
        self.inner.device.subscribe()
    }

    /// The unit's answer to command `id`, once it arrived. Only the most
    /// recent answered command is remembered.
    pub async fn command_ack(&self, id: RequestId) -> Option<ResponseCode> {
        let state = self.inner.state.lock().await;
        state
            .last_command_ack
            .as_ref()
            .filter(|(acked, _)| *acked == id)
            .map(|(_, code)| code.clone())
    }

    /// Sends since the last inbound frame.
    pub async fn unacknowledged_sends(&self) -> u32 {
        self.inner.state.lock().await.watchdog.unacknowledged()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn ensure_running(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            Err(CoreError::Shutdown)
        } else {
            Ok(())
        }
    }

    fn transition(&self, state: &mut SessionState, next: ConnectionState) {
        if state.phase != next {
            debug!(session = %self.name(), from = %state.phase, to = %next, "session phase");
            state.phase = next;
            self.inner.phase.send_replace(next);
        }
    }

    fn open_link(&self, state: &mut SessionState) -> Result<(), CoreError> {
        let endpoint = &self.inner.config.endpoint;
        info!(session = %self.name(), %endpoint, "connecting");
        match self.inner.transport.open(endpoint) {
            Ok(link) => {
                state.link = Some(link);
                state.last_fault = None;
                state.watchdog.acknowledge();
                self.transition(state, ConnectionState::Connecting);
                Ok(())
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "cannot open link");
                Err(CoreError::ConnectionFailed {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Forget the current link and move to `next`.
    fn drop_link(&self, state: &mut SessionState, next: ConnectionState) {
        if state.link.take().is_some() {
            self.inner.transport.close();
        }
        state.watchdog.acknowledge();
        state.pending.clear_auth();
        self.transition(state, next);
    }

    /// Wait until the phase settles, at most `connect_poll_attempts`
    /// polls. Wakes early on every phase change.
    async fn await_authenticated(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let mut phase_rx = self.inner.phase.subscribe();
        let mut ticker = tokio::time::interval(config.connect_poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut polls = 0;
        loop {
            let phase = *phase_rx.borrow_and_update();
            match phase {
                ConnectionState::Authenticated => return Ok(()),
                ConnectionState::AuthFailed => {
                    return Err(auth_failed_error(&*self.inner.state.lock().await));
                }
                ConnectionState::Disconnected | ConnectionState::Faulted => {
                    let reason = self.inner.state.lock().await.last_fault.clone();
                    return Err(CoreError::ConnectionFailed {
                        endpoint: config.endpoint.to_string(),
                        reason: reason.unwrap_or_else(|| "link closed before authentication".into()),
                    });
                }
                ConnectionState::Connecting | ConnectionState::AwaitingAuth => {}
            }
            if polls >= config.connect_poll_attempts {
                break;
            }
            tokio::select! {
                biased;
                () = self.inner.cancel.cancelled() => return Err(CoreError::Shutdown),
                changed = phase_rx.changed() => {
                    if changed.is_err() {
                        return Err(CoreError::Shutdown);
                    }
                }
                _ = ticker.tick() => polls += 1,
            }
        }

        let mut state = self.inner.state.lock().await;
        if state.phase == ConnectionState::Authenticated {
            return Ok(());
        }
        let timeout_secs = config.connect_timeout().as_secs();
        warn!(session = %self.name(), timeout_secs, phase = %state.phase, "unit did not authenticate in time");
        if matches!(state.phase, ConnectionState::Connecting | ConnectionState::AwaitingAuth) {
            self.drop_link(&mut state, ConnectionState::Disconnected);
        }
        Err(CoreError::Timeout { timeout_secs })
    }

    /// Send one request, reconnecting between attempts as needed.
    async fn publish(&self, kind: RequestKind, endpoint: Endpoint, args: Args) -> Result<RequestId, CoreError> {
        let attempts = self.inner.config.publish_attempts.max(1);

        for attempt in 1..=attempts {
            self.ensure_running()?;

            if !self.connection_state().is_authenticated() {
                debug!(%endpoint, attempt, "not authenticated, reconnecting before send");
                if let Err(e) = self.connect().await {
                    if e.is_terminal() {
                        return Err(e);
                    }
                    debug!(%endpoint, attempt, error = %e, "reconnect failed");
                }
            }

            if let Some(id) = self.try_send(kind, &endpoint, &args).await {
                return Ok(id);
            }

            if attempt < attempts {
                self.pause(self.inner.config.publish_retry_delay).await?;
            }
        }

        warn!(%endpoint, attempts, "giving up, request dropped");
        Err(CoreError::PublishFailed {
            endpoint: endpoint.to_string(),
            attempts,
        })
    }

    /// Send if authenticated. A failed send drops the link.
    async fn try_send(&self, kind: RequestKind, endpoint: &Endpoint, args: &Args) -> Option<RequestId> {
        let mut state = self.inner.state.lock().await;
        if !state.phase.is_authenticated() {
            return None;
        }
        let id = state.allocate_id();
        let request = Request::new(endpoint.clone(), id, args.clone());
        match self.transmit(&mut state, &request) {
            Ok(()) => {
                state.pending.track(kind, id);
                Some(id)
            }
            Err(e) => {
                warn!(%endpoint, id, error = %e, "send failed, dropping link");
                state.last_fault = Some(e.to_string());
                self.drop_link(&mut state, ConnectionState::Disconnected);
                None
            }
        }
    }

    /// Encode and hand one request to the transport, feeding the watchdog.
    fn transmit(&self, state: &mut SessionState, request: &Request) -> Result<(), CoreError> {
        let text = request.encode()?;
        self.inner.transport.send(text)?;
        debug!(endpoint = %request.endpoint, id = request.id, "request sent");

        if state.watchdog.record_send() {
            warn!(
                session = %self.name(),
                threshold = self.inner.config.stall_threshold,
                "link is up but the unit stopped answering, forcing reconnect"
            );
            state.last_fault = Some("unit stopped answering".into());
            self.drop_link(state, ConnectionState::Disconnected);
        }
        Ok(())
    }

    async fn pause(&self, delay: Duration) -> Result<(), CoreError> {
        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => Err(CoreError::Shutdown),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

fn auth_failed_error(state: &SessionState) -> CoreError {
    CoreError::AuthenticationFailed {
        message: format!(
            "the unit rejected {} login attempts; update the credentials",
            state.login_failures
        ),
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Feed link events into the session, one at a time.
async fn dispatch_task(session: Session, mut events: mpsc::UnboundedReceiver<LinkEvent>) {
    let cancel = session.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                session.handle_link_event(event).await;
            }
        }
    }
}
