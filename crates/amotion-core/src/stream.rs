// ── Snapshot subscriptions ──
//
// Point-in-time access plus change notification for the state cache.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::DeviceSnapshot;

/// A subscription to the device snapshot.
pub struct SnapshotStream {
    current: Arc<DeviceSnapshot>,
    receiver: watch::Receiver<Arc<DeviceSnapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(mut receiver: watch::Receiver<Arc<DeviceSnapshot>>) -> Self {
        let current = Arc::clone(&receiver.borrow_and_update());
        Self { current, receiver }
    }

    /// Snapshot seen at creation or at the last [`changed`](Self::changed).
    pub fn current(&self) -> &Arc<DeviceSnapshot> {
        &self.current
    }

    pub fn latest(&self) -> Arc<DeviceSnapshot> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Whether a change arrived that [`changed`](Self::changed) has not returned yet.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change. `None` once the cache is gone.
    pub async fn changed(&mut self) -> Option<Arc<DeviceSnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = Arc::clone(&self.receiver.borrow_and_update());
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream`. The first item is the current snapshot.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<DeviceSnapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<DeviceSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
