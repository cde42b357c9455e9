// ── Device state cache ──
//
// One snapshot of last-known unit values, overlaid by query responses
// and push events, observable through watch channels.

mod cache;
mod snapshot;

pub use cache::StateCache;
pub use snapshot::{DeviceSnapshot, Field, FieldValue, Section, SnapshotUpdate};
