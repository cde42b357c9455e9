#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use amotion_api::{Error, EventSender, LinkEvent, LinkEventKind, LinkId, Transport};
use amotion_core::{ConnectionState, Credentials, Session, SessionConfig};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "tok-1";

/// What `open` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    /// Report the link open right away.
    Accept,
    /// Report a handshake failure.
    Refuse,
    /// Never report anything.
    Silent,
}

/// Maps one request frame to the frames the unit answers with.
pub type Responder = Arc<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

/// In-memory transport driven by a scripted unit.
pub struct MockTransport {
    events: EventSender,
    state: Mutex<MockState>,
}

struct MockState {
    behavior: OpenBehavior,
    responder: Option<Responder>,
    link: Option<LinkId>,
    open: bool,
    next_link: LinkId,
    sent: Vec<Value>,
    opens: usize,
    closes: usize,
}

impl MockTransport {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            state: Mutex::new(MockState {
                behavior: OpenBehavior::Accept,
                responder: Some(unit_responder(PASSWORD)),
                link: None,
                open: false,
                next_link: 0,
                sent: Vec::new(),
                opens: 0,
                closes: 0,
            }),
        }
    }

    pub fn set_behavior(&self, behavior: OpenBehavior) {
        self.state.lock().unwrap().behavior = behavior;
    }

    pub fn set_responder(&self, responder: Option<Responder>) {
        self.state.lock().unwrap().responder = responder;
    }

    pub fn sent(&self) -> Vec<Value> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_to(&self, endpoint: &str) -> Vec<Value> {
        self.sent().into_iter().filter(|f| f["endpoint"] == endpoint).collect()
    }

    pub fn opens(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn current_link(&self) -> Option<LinkId> {
        self.state.lock().unwrap().link
    }

    /// Deliver a frame from the unit on the current link.
    pub fn inject(&self, frame: Value) {
        self.inject_text(frame.to_string());
    }

    pub fn inject_text(&self, text: String) {
        let link = self.current_link().expect("no link to inject on");
        self.emit(link, LinkEventKind::Message(text));
    }

    pub fn emit(&self, link: LinkId, kind: LinkEventKind) {
        let _ = self.events.send(LinkEvent::new(link, kind));
    }

    /// The unit closes the link.
    pub fn peer_close(&self) {
        let link = {
            let mut state = self.state.lock().unwrap();
            state.open = false;
            state.link.expect("no link to close")
        };
        self.emit(
            link,
            LinkEventKind::Close {
                code: Some(1000),
                reason: "bye".into(),
            },
        );
    }

    /// Finish a handshake that `Silent` held back.
    pub fn accept_pending(&self) {
        let link = {
            let mut state = self.state.lock().unwrap();
            state.open = true;
            state.link.expect("no pending link")
        };
        self.emit(link, LinkEventKind::Open);
    }

    /// The socket fails underneath the session.
    pub fn fail(&self, reason: &str) {
        let link = {
            let mut state = self.state.lock().unwrap();
            state.open = false;
            state.link.expect("no link to fail")
        };
        self.emit(link, LinkEventKind::Error(reason.into()));
    }
}

impl Transport for MockTransport {
    fn open(&self, _endpoint: &Url) -> Result<LinkId, Error> {
        let mut state = self.state.lock().unwrap();
        state.opens += 1;
        state.next_link += 1;
        let link = state.next_link;
        state.link = Some(link);
        state.open = false;

        match state.behavior {
            OpenBehavior::Accept => {
                state.open = true;
                self.emit(link, LinkEventKind::Open);
            }
            OpenBehavior::Refuse => self.emit(link, LinkEventKind::Error("connection refused".into())),
            OpenBehavior::Silent => {}
        }
        Ok(link)
    }

    fn send(&self, text: String) -> Result<(), Error> {
        let (link, replies) = {
            let mut state = self.state.lock().unwrap();
            if !state.open {
                return Err(Error::NotConnected);
            }
            let frame: Value = serde_json::from_str(&text).unwrap();
            let replies = state.responder.as_ref().map(|r| r(&frame)).unwrap_or_default();
            state.sent.push(frame);
            (state.link.unwrap(), replies)
        };
        for reply in replies {
            self.emit(link, LinkEventKind::Message(reply.to_string()));
        }
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap();
        if state.link.take().is_some() {
            state.closes += 1;
        }
        state.open = false;
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }
}

// ── Scripted units ───────────────────────────────────────────────────

pub fn response(id: &Value, code: &str, body: Value) -> Value {
    json!({ "type": "response", "id": id, "code": code, "response": body })
}

/// Answers logins only.
pub fn auth_responder(password: &'static str) -> Responder {
    Arc::new(move |frame| login_reply(frame, password).into_iter().collect())
}

/// Answers logins, `ui_info`, `discovery`, `ping` and `control`.
pub fn unit_responder(password: &'static str) -> Responder {
    Arc::new(move |frame| {
        if let Some(reply) = login_reply(frame, password) {
            return vec![reply];
        }
        let id = &frame["id"];
        let reply = match frame["endpoint"].as_str() {
            Some("ui_info") => response(
                id,
                "OK",
                json!({
                    "unit": { "temp_ida": 21.5, "temp_oda": 12.0, "mode_current": "NORMAL" },
                    "requests": { "work_regime": "AUTO", "temp_request": 22.0 },
                    "states": { "active": { "105": { "active": true, "name": "FILTER_INTERVAL" } } }
                }),
            ),
            Some("discovery") => response(
                id,
                "OK",
                json!({ "type": "aMotion", "version": "2.4", "production_number": 1234, "board_number": "B-7" }),
            ),
            Some("control" | "ping") => response(id, "OK", Value::Null),
            _ => return Vec::new(),
        };
        vec![reply]
    })
}

fn login_reply(frame: &Value, password: &str) -> Option<Value> {
    if frame["endpoint"] != "login" {
        return None;
    }
    let id = &frame["id"];
    let args = &frame["args"];
    Some(if args.get("token").is_some() {
        if args["token"] == TOKEN {
            response(id, "OK", Value::Null)
        } else {
            response(id, "UNAUTHORIZED", Value::Null)
        }
    } else if args["password"] == password {
        response(id, "OK", json!(TOKEN))
    } else {
        response(id, "UNAUTHORIZED", Value::Null)
    })
}

// ── Session helpers ──────────────────────────────────────────────────

/// Defaults, no health monitor.
pub fn config() -> SessionConfig {
    let mut config = SessionConfig::new(
        "living-room",
        Url::parse("ws://unit.test/api/ws").unwrap(),
        Credentials::new("admin", SecretString::from(PASSWORD)),
    );
    config.health_interval = None;
    config
}

pub fn mock_session(config: SessionConfig) -> (Session, Arc<MockTransport>) {
    let mut handle = None;
    let session = Session::with_transport(config, |events| {
        let mock = Arc::new(MockTransport::new(events));
        handle = Some(Arc::clone(&mock));
        let transport: Arc<dyn Transport> = mock;
        transport
    });
    (session, handle.unwrap())
}

/// Let the dispatcher drain queued link events.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub async fn wait_for(session: &Session, target: ConnectionState) {
    let mut rx = session.watch_connection_state();
    tokio::time::timeout(Duration::from_secs(600), rx.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("session never reached {target}"))
        .unwrap();
}
