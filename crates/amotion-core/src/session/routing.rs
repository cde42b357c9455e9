// Inbound side of the session: link events, response routing by id,
// event routing by name, and the login handshake.

use amotion_api::models::{DiscoveryInfo, UiInfo};
use amotion_api::{Args, Endpoint, EventName, Inbound, LinkEvent, LinkEventKind, Request, Response, ResponseCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, error, info, trace, warn};

use super::state::{RequestKind, SessionState};
use super::{ConnectionState, Session};
use crate::model::DeviceInfo;

impl Session {
    pub(super) async fn handle_link_event(&self, event: LinkEvent) {
        let mut state = self.inner.state.lock().await;
        if state.link != Some(event.link) {
            trace!(link = event.link, "ignoring event from a stale link");
            return;
        }

        match event.kind {
            LinkEventKind::Open => {
                info!(session = %self.name(), link = event.link, "link open, logging in");
                self.transition(&mut state, ConnectionState::AwaitingAuth);
                self.send_login(&mut state);
            }
            LinkEventKind::Close { code, reason } => {
                info!(session = %self.name(), link = event.link, ?code, %reason, "link closed");
                if state.last_fault.is_none() {
                    state.last_fault = Some(if reason.is_empty() {
                        "link closed by the unit".into()
                    } else {
                        format!("link closed by the unit: {reason}")
                    });
                }
                let next = if state.phase == ConnectionState::AuthFailed {
                    ConnectionState::AuthFailed
                } else {
                    ConnectionState::Disconnected
                };
                self.drop_link(&mut state, next);
            }
            LinkEventKind::Error(detail) => {
                warn!(session = %self.name(), link = event.link, error = %detail, "link failed");
                state.last_fault = Some(detail);
                if state.phase != ConnectionState::AuthFailed {
                    self.transition(&mut state, ConnectionState::Faulted);
                }
            }
            LinkEventKind::Message(text) => {
                state.watchdog.acknowledge();
                match Inbound::decode(&text) {
                    Ok(Inbound::Response(response)) => self.route_response(&mut state, response),
                    Ok(Inbound::Event { name, args }) => self.route_event(&name, args),
                    Err(e) => warn!(error = %e, "dropping undecodable frame"),
                }
            }
        }
    }

    /// Send a login on the current link: the token when one is held,
    /// username and password otherwise.
    pub(super) fn send_login(&self, state: &mut SessionState) {
        let max = self.inner.config.max_login_attempts;
        if state.login_failures >= max {
            error!(attempts = state.login_failures, "login attempts exhausted, not retrying");
            self.drop_link(state, ConnectionState::AuthFailed);
            return;
        }

        let (kind, args) = match &state.token {
            Some(token) => (RequestKind::TokenLogin, json!({ "token": token.expose_secret() })),
            None => (
                RequestKind::Login,
                json!({
                    "username": state.credentials.username,
                    "password": state.credentials.password.expose_secret(),
                }),
            ),
        };
        let id = state.allocate_id();
        let request = Request::new(Endpoint::Login, id, Args::Payload(args));

        match self.transmit(state, &request) {
            Ok(()) if state.link.is_some() => {
                state.pending.track(kind, id);
                debug!(id, ?kind, "login sent");
            }
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "cannot send login");
                state.last_fault = Some(e.to_string());
                self.drop_link(state, ConnectionState::Disconnected);
            }
        }
    }

    fn route_response(&self, state: &mut SessionState, response: Response) {
        let Some(id) = response.id else {
            warn!(code = %response.code, "ignoring response without an id");
            return;
        };
        let Some(kind) = state.pending.take(id) else {
            warn!(id, code = %response.code, "ignoring response that matches no pending request");
            return;
        };

        match kind {
            RequestKind::Login | RequestKind::TokenLogin if !response.code.is_success() => {
                self.login_rejected(state, &response.code);
            }
            RequestKind::Login => match response.body_str().filter(|t| !t.is_empty()) {
                Some(token) => {
                    debug!(id, "credentials accepted, confirming token");
                    state.token = Some(SecretString::from(token.to_owned()));
                    self.send_login(state);
                }
                None => self.login_rejected(state, &ResponseCode::Other("login answer without a token".into())),
            },
            RequestKind::TokenLogin => {
                state.login_failures = 0;
                state.last_fault = None;
                self.transition(state, ConnectionState::Authenticated);
                info!(session = %self.name(), "authenticated");
            }
            RequestKind::Discovery => self.apply_discovery(&response),
            RequestKind::QueryInfo => {
                if response.code.is_success() {
                    self.apply_ui_info(response.response);
                } else {
                    warn!(id, code = %response.code, "ui_info request failed");
                }
            }
            RequestKind::Ping => debug!(id, code = %response.code, "pong"),
            RequestKind::Command => {
                if response.code.is_success() {
                    debug!(id, "command acknowledged");
                } else {
                    warn!(id, code = %response.code, error = ?response.error, "unit rejected command");
                }
                state.last_command_ack = Some((id, response.code));
            }
        }
    }

    /// Every rejection counts. The link is closed either way and a held
    /// token is kept; at the cap the session stops trying until
    /// credentials change.
    fn login_rejected(&self, state: &mut SessionState, code: &ResponseCode) {
        state.login_failures += 1;
        state.last_fault = Some(format!("login rejected ({code})"));

        let max = self.inner.config.max_login_attempts;
        if state.login_failures >= max {
            error!(
                session = %self.name(),
                attempts = state.login_failures,
                %code,
                "authentication failed permanently, update the credentials"
            );
            self.drop_link(state, ConnectionState::AuthFailed);
        } else {
            warn!(attempt = state.login_failures, max, %code, "login rejected");
            self.drop_link(state, ConnectionState::Disconnected);
        }
    }

    fn route_event(&self, name: &EventName, args: Value) {
        match name {
            EventName::UiInfo => self.apply_ui_info(args),
            EventName::DisposablePlan => trace!("ignoring disposable_plan event"),
            EventName::Other(other) => debug!(event = %other, "ignoring unknown event"),
        }
    }

    fn apply_ui_info(&self, body: Value) {
        match UiInfo::from_value(body) {
            Ok(info) => {
                if self.inner.cache.merge_ui_info(&info) {
                    trace!("state cache updated");
                }
            }
            Err(e) => warn!(error = %e, "malformed ui_info body"),
        }
    }

    fn apply_discovery(&self, response: &Response) {
        if !response.code.is_success() {
            warn!(code = %response.code, "discovery request failed");
            return;
        }
        match serde_json::from_value::<DiscoveryInfo>(response.response.clone()) {
            Ok(info) => {
                let update = DeviceInfo::from(info);
                if self.inner.device.send_if_modified(|device| device.merge(update)) {
                    info!(model = %self.device_info().model_or_default(), "device identity updated");
                }
            }
            Err(e) => warn!(error = %e, "malformed discovery body"),
        }
    }
}
