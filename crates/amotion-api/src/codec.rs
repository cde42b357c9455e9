//! Wire codec for the aMotion WebSocket protocol.
//!
//! Outbound requests are single JSON objects `{endpoint, id, args}`. The
//! unit expects `args` to be the *string* `"null"` when a request carries
//! no payload, so [`Args::Null`] serializes that way rather than as JSON
//! `null`.
//!
//! Inbound frames are classified exactly once, here, into [`Inbound`]:
//! a [`Response`] correlated to a request id, or an unsolicited
//! [`Event`](Inbound::Event). Anything else is an [`Error::Decode`].

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;

/// Request identifier, allocated by the session and echoed back by the unit.
pub type RequestId = u64;

// ── Endpoint ─────────────────────────────────────────────────────────

/// Command name identifying what an outbound request asks the unit to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Ping,
    UiInfo,
    Discovery,
    Control,
    Other(String),
}

impl Endpoint {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Login => "login",
            Self::Ping => "ping",
            Self::UiInfo => "ui_info",
            Self::Discovery => "discovery",
            Self::Control => "control",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for Endpoint {
    fn from(name: &str) -> Self {
        match name {
            "login" => Self::Login,
            "ping" => Self::Ping,
            "ui_info" => Self::UiInfo,
            "discovery" => Self::Discovery,
            "control" => Self::Control,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── Args ─────────────────────────────────────────────────────────────

/// Request arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    /// No payload. Encoded as the literal string `"null"`.
    Null,
    Payload(Value),
}

impl Serialize for Args {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_str("null"),
            Self::Payload(value) => value.serialize(serializer),
        }
    }
}

impl From<Value> for Args {
    fn from(value: Value) -> Self {
        Self::Payload(value)
    }
}

// ── Request ──────────────────────────────────────────────────────────

/// One outbound command envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub endpoint: Endpoint,
    pub id: RequestId,
    pub args: Args,
}

impl Request {
    pub fn new(endpoint: Endpoint, id: RequestId, args: Args) -> Self {
        Self { endpoint, id, args }
    }

    /// Serialize to the wire text format.
    pub fn encode(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(Error::Encode)
    }
}

// ── Inbound ──────────────────────────────────────────────────────────

/// Outcome code of a response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    Ok,
    Unauthorized,
    InvalidUser,
    Other(String),
}

impl ResponseCode {
    pub fn from_wire(code: &str) -> Self {
        match code {
            "OK" | "success" => Self::Ok,
            "UNAUTHORIZED" | "PasswordInvalid" => Self::Unauthorized,
            "INVALID_USER" | "UserNotExist" => Self::InvalidUser,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Unauthorized => f.write_str("UNAUTHORIZED"),
            Self::InvalidUser => f.write_str("INVALID_USER"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// A frame correlated to an earlier request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// `None` when the unit sent `"id": null` or omitted it.
    pub id: Option<RequestId>,
    pub code: ResponseCode,
    pub response: Value,
    pub error: Option<Value>,
}

impl Response {
    /// The response body as a string, e.g. the token returned by a login.
    pub fn body_str(&self) -> Option<&str> {
        self.response.as_str()
    }
}

/// Name of an unsolicited event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventName {
    /// Device state push; same body shape as a `ui_info` response.
    UiInfo,
    /// Disposable schedule notification; carries no state.
    DisposablePlan,
    Other(String),
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        match name {
            "ui_info" => Self::UiInfo,
            "disposable_plan" => Self::DisposablePlan,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response(Response),
    Event { name: EventName, args: Value },
}

/// Loose view of every field either frame shape may carry.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    response: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    args: Option<Value>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl Inbound {
    /// Parse one inbound text frame.
    pub fn decode(text: &str) -> Result<Self, Error> {
        let raw: RawFrame = serde_json::from_str(text).map_err(|e| Error::Decode {
            message: e.to_string(),
            frame: text.to_owned(),
        })?;

        if let Some(name) = raw.event {
            return Ok(Self::Event {
                name: EventName::from(name.as_str()),
                args: raw.args.unwrap_or(Value::Null),
            });
        }

        let Some(code) = raw.code else {
            let message = match raw.kind.as_deref() {
                Some("response") => "response frame without a code".to_owned(),
                Some(other) => format!("unrecognized frame type '{other}'"),
                None => "frame is neither a response nor an event".to_owned(),
            };
            return Err(Error::Decode {
                message,
                frame: text.to_owned(),
            });
        };

        Ok(Self::Response(Response {
            id: raw.id.as_ref().and_then(Value::as_u64),
            code: ResponseCode::from_wire(&code),
            response: raw.response.unwrap_or(Value::Null),
            error: raw.error.filter(|e| !e.is_null()),
        }))
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn null_args_encode_as_string() {
        let text = Request::new(Endpoint::Ping, 7, Args::Null).encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({ "endpoint": "ping", "id": 7, "args": "null" }));
    }

    #[test]
    fn payload_args_encode_as_object() {
        let args = Args::from(json!({ "variables": { "work_regime": "AUTO" } }));
        let text = Request::new(Endpoint::Control, 12, args).encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["endpoint"], "control");
        assert_eq!(value["args"]["variables"]["work_regime"], "AUTO");
    }

    #[test]
    fn decode_ok_response() {
        let frame = json!({ "id": 3, "code": "OK", "response": "T1", "type": "response" });
        let Inbound::Response(resp) = Inbound::decode(&frame.to_string()).unwrap() else {
            panic!("expected a response");
        };
        assert_eq!(resp.id, Some(3));
        assert!(resp.code.is_success());
        assert_eq!(resp.body_str(), Some("T1"));
    }

    #[test]
    fn decode_success_marker_and_failure_codes() {
        let code = |c: &str| {
            let frame = json!({ "id": 1, "code": c, "response": null });
            match Inbound::decode(&frame.to_string()).unwrap() {
                Inbound::Response(r) => r.code,
                Inbound::Event { .. } => panic!("expected a response"),
            }
        };
        assert_eq!(code("success"), ResponseCode::Ok);
        assert_eq!(code("UNAUTHORIZED"), ResponseCode::Unauthorized);
        assert_eq!(code("INVALID_USER"), ResponseCode::InvalidUser);
        assert_eq!(code("BUSY"), ResponseCode::Other("BUSY".into()));
    }

    #[test]
    fn decode_response_with_null_id() {
        let frame = json!({ "code": "OK", "error": null, "id": null, "response": {}, "type": "response" });
        let Inbound::Response(resp) = Inbound::decode(&frame.to_string()).unwrap() else {
            panic!("expected a response");
        };
        assert_eq!(resp.id, None);
        assert_eq!(resp.error, None);
    }

    #[test]
    fn decode_event() {
        let frame = json!({
            "event": "ui_info",
            "type": "event",
            "args": { "unit": { "temp_ida": 21.4 } }
        });
        let inbound = Inbound::decode(&frame.to_string()).unwrap();
        assert_eq!(
            inbound,
            Inbound::Event {
                name: EventName::UiInfo,
                args: json!({ "unit": { "temp_ida": 21.4 } }),
            }
        );
    }

    #[test]
    fn decode_unknown_event_name_is_kept() {
        let frame = json!({ "event": "scene_changed", "args": {} });
        let Inbound::Event { name, .. } = Inbound::decode(&frame.to_string()).unwrap() else {
            panic!("expected an event");
        };
        assert_eq!(name, EventName::Other("scene_changed".into()));
    }

    #[test]
    fn decode_rejects_unrecognized_shapes() {
        for frame in ["not json", "[1,2,3]", r#"{"type":"response","id":4}"#, r#"{"hello":1}"#] {
            let err = Inbound::decode(frame).unwrap_err();
            assert!(matches!(err, Error::Decode { .. }), "frame {frame} gave {err:?}");
        }
    }

    #[test]
    fn endpoint_names_round_trip() {
        for name in ["login", "ping", "ui_info", "discovery", "control", "scenes"] {
            assert_eq!(Endpoint::from(name).as_str(), name);
        }
    }
}
