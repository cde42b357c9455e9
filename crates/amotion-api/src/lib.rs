// amotion-api: Async Rust client for the Atrea aMotion unit (WebSocket session + onboarding HTTP)

pub mod codec;
pub mod error;
pub mod http;
pub mod models;
pub mod onboarding;
pub mod transport;
pub mod websocket;

pub use codec::{Args, Endpoint, EventName, Inbound, Request, RequestId, Response, ResponseCode};
pub use error::Error;
pub use onboarding::OnboardingClient;
pub use transport::{EventSender, LinkEvent, LinkEventKind, LinkId, Transport, TransportConfig};
pub use websocket::WsTransport;
