//! Session engine for aMotion units, between `amotion-api` and consumers.
//!
//! - **[`Session`]**: one persistent, self-healing conversation with one
//!   unit. [`connect()`](Session::connect) opens the link and logs in;
//!   commands reconnect on demand and are retried a bounded number of
//!   times, never queued.
//!
//! - **[`StateCache`]**: the last-known [`DeviceSnapshot`], merged from
//!   `ui_info` responses and pushed events alike. Survives reconnects.
//!
//! - **[`SnapshotStream`]**: subscription handle vended by the cache with
//!   `current()` / `latest()` / `changed()`.
//!
//! - **Health**: a periodic monitor reconnects unauthenticated sessions
//!   and a send watchdog drops links the unit stopped answering on.
//!
//! - **[`SessionRegistry`]**: named sessions for multi-unit consumers.

pub mod command;
pub mod config;
pub mod error;
mod health;
pub mod model;
pub mod registry;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, ControlVariables, WorkRegime};
pub use config::{Credentials, SessionConfig, endpoint_for_host};
pub use error::CoreError;
pub use model::DeviceInfo;
pub use registry::SessionRegistry;
pub use session::{ConnectionState, Session};
pub use store::{DeviceSnapshot, Field, FieldValue, SnapshotUpdate, StateCache};
pub use stream::{SnapshotStream, SnapshotWatchStream};

pub use amotion_api::{RequestId, ResponseCode};
