use std::sync::Arc;

use amotion_api::models::UiInfo;
use chrono::Utc;
use tokio::sync::watch;

use super::snapshot::{DeviceSnapshot, SnapshotUpdate};
use crate::stream::SnapshotStream;

/// Holder of the current [`DeviceSnapshot`].
///
/// Writers merge partial updates; readers get cheap `Arc` copies that
/// never change under them. Subscribers are woken only when a value
/// actually changed.
pub struct StateCache {
    snapshot: watch::Sender<Arc<DeviceSnapshot>>,
}

impl StateCache {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(DeviceSnapshot::default()));
        Self { snapshot }
    }

    pub fn snapshot(&self) -> Arc<DeviceSnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Overlay `update`. Returns whether any value changed.
    pub fn merge(&self, update: SnapshotUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        let now = Utc::now();
        self.snapshot.send_if_modified(|current| {
            let next = Arc::make_mut(current);
            let changed = next.apply(update);
            next.touch(now);
            changed
        })
    }

    pub fn merge_ui_info(&self, info: &UiInfo) -> bool {
        self.merge(SnapshotUpdate::from_ui_info(info))
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.snapshot.subscribe())
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}
