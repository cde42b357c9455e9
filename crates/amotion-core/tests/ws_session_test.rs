// End-to-end: a real `Session` over WebSocket against a local fake unit.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use amotion_core::{Command, ConnectionState, Credentials, Field, Session, SessionConfig, WorkRegime};
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Accepts one password, pushes a `ui_info` event after login and
/// forwards every `control` request to the returned channel.
async fn fake_unit() -> (Url, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (controls_tx, controls_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let controls = controls_tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(Message::Text(text))) = ws.next().await {
                    let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                    let id = frame["id"].clone();
                    let args = &frame["args"];
                    let mut replies = Vec::new();

                    match frame["endpoint"].as_str().unwrap_or_default() {
                        "login" if args["token"] == "tok-e2e" => {
                            replies.push(json!({ "type": "response", "id": id, "code": "OK", "response": null }));
                            replies.push(json!({
                                "event": "ui_info",
                                "args": { "unit": { "temp_oda": 3.5 } }
                            }));
                        }
                        "login" if args["password"] == "secret" => {
                            replies.push(json!({ "type": "response", "id": id, "code": "OK", "response": "tok-e2e" }));
                        }
                        "login" => {
                            replies.push(json!({ "type": "response", "id": id, "code": "UNAUTHORIZED", "response": null }));
                        }
                        "ui_info" => replies.push(json!({
                            "type": "response", "id": id, "code": "OK",
                            "response": { "unit": { "temp_ida": 22.5 }, "requests": { "work_regime": "VENTILATION" } }
                        })),
                        "control" => {
                            let _ = controls.send(args.clone());
                            replies.push(json!({ "type": "response", "id": id, "code": "OK", "response": null }));
                        }
                        _ => {}
                    }

                    for reply in replies {
                        if ws.send(Message::text(reply.to_string())).await.is_err() {
                            return;
                        }
                    }
                }
            });
        }
    });

    (Url::parse(&format!("ws://{addr}/api/ws")).unwrap(), controls_rx)
}

fn config(endpoint: Url, password: &str) -> SessionConfig {
    let mut cfg = SessionConfig::new("e2e", endpoint, Credentials::new("admin", SecretString::from(password)));
    cfg.health_interval = None;
    cfg.connect_poll_interval = Duration::from_millis(100);
    cfg.publish_retry_delay = Duration::from_millis(50);
    cfg
}

#[tokio::test]
async fn session_authenticates_and_tracks_state() {
    let (url, mut controls) = fake_unit().await;
    let session = Session::new(config(url, "secret"));
    let mut updates = session.subscribe();

    session.connect().await.unwrap();
    assert_eq!(session.connection_state(), ConnectionState::Authenticated);

    // Pushed right after login.
    let snap = tokio::time::timeout(Duration::from_secs(5), updates.changed()).await.unwrap().unwrap();
    assert_eq!(snap.number(Field::TempOda), Some(3.5));

    session.query_info().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while session.snapshot().number(Field::TempIda).is_none() {
            updates.changed().await;
        }
    })
    .await
    .unwrap();
    let snap = session.snapshot();
    assert_eq!(snap.number(Field::TempOda), Some(3.5));
    assert_eq!(snap.text(Field::WorkRegime), Some("VENTILATION"));

    session.send_command(&Command::set_work_regime(WorkRegime::Auto)).await.unwrap();
    let args = tokio::time::timeout(Duration::from_secs(5), controls.recv()).await.unwrap().unwrap();
    assert_eq!(args, json!({ "variables": { "work_regime": "AUTO" } }));

    session.shutdown().await;
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn wrong_password_is_reported() {
    let (url, _controls) = fake_unit().await;
    let mut cfg = config(url, "nope");
    cfg.max_login_attempts = 1;
    let session = Session::new(cfg);

    let err = session.connect().await.unwrap_err();
    assert!(err.is_terminal(), "{err}");
    assert_eq!(session.connection_state(), ConnectionState::AuthFailed);
    session.shutdown().await;
}

#[tokio::test]
async fn unreachable_unit_fails_fast() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut cfg = config(Url::parse(&format!("ws://{addr}/api/ws")).unwrap(), "secret");
    cfg.publish_attempts = 2;
    let session = Session::new(cfg);

    let err = session.ping().await.unwrap_err();
    assert!(matches!(err, amotion_core::CoreError::PublishFailed { attempts: 2, .. }), "{err}");
    session.shutdown().await;
}
