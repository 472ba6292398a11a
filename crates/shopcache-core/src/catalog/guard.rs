use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag for a consumer waiting on a catalog read.
///
/// Cancelling never aborts the read itself (its cache writes and background
/// work still happen); it only stops the result from being applied.
#[derive(Debug, Clone, Default)]
pub struct RequestGuard {
    cancelled: Arc<AtomicBool>,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run `apply` with `value` unless the consumer has gone away.
    pub fn apply<T, R>(&self, value: T, apply: impl FnOnce(T) -> R) -> Option<R> {
        if self.is_cancelled() {
            None
        } else {
            Some(apply(value))
        }
    }

    /// Drive `fut` to completion, then drop its output if cancelled meanwhile.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let output = fut.await;
        self.apply(output, |output| output)
    }
}
