use tokio::sync::mpsc;
use tracing::debug;

/// Outcome of work the catalog does in the background.
///
/// These are informational; no read result ever depends on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundEvent {
    Revalidated { key: String },
    RevalidationFailed { key: String, error: String },
    AssetsCached { key: String, cached: usize, requested: usize },
}

/// Optional channel background tasks report into. Never blocks the sender.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<BackgroundEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<BackgroundEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub(crate) fn send(&self, event: BackgroundEvent) {
        if let Some(ref tx) = self.tx {
            if let Err(e) = tx.try_send(event) {
                debug!(error = %e, "Dropped background event");
            }
        }
    }
}
