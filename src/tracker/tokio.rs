//! Awaitable variants of the tracker operations.
//!
//! Each one runs its blocking counterpart on Tokio's blocking pool, so a sink
//! that writes to disk never stalls the async executor. Awaiting the future
//! means the write has finished (or failed); dropping it early does not cancel
//! the write.
use crate::entry::{EntryBuilder, LineageEntry};
use crate::error::LineageError;
use crate::tracker::LineageTracker;

async fn blocking<T, F>(tracker: &LineageTracker, callback: F) -> Result<T, LineageError>
where
    T: Send + 'static,
    F: FnOnce(LineageTracker) -> Result<T, LineageError> + Send + 'static,
{
    let tracker = tracker.clone();
    ::tokio::task::spawn_blocking(move || callback(tracker)).await?
}

impl LineageTracker {
    /// Async variant of [`record`](Self::record).
    pub async fn record_async(&self, entry: EntryBuilder) -> Result<(), LineageError> {
        blocking(self, move |tracker| tracker.record(entry)).await
    }

    /// Async variant of [`record_batch`](Self::record_batch).
    pub async fn record_batch_async(
        &self,
        entries: Vec<LineageEntry>,
    ) -> Result<usize, LineageError> {
        blocking(self, move |tracker| tracker.record_batch(entries)).await
    }

    /// Async variant of [`all`](Self::all).
    pub async fn all_async(&self) -> Result<Vec<LineageEntry>, LineageError> {
        blocking(self, |tracker| Ok(tracker.all())).await
    }

    /// Async variant of [`persisted`](Self::persisted), for sinks that have to
    /// read their history back from disk.
    pub async fn persisted_async(&self) -> Result<Vec<LineageEntry>, LineageError> {
        blocking(self, |tracker| tracker.persisted()).await
    }

    /// Async variant of [`flush`](Self::flush).
    pub async fn flush_async(&self) -> Result<(), LineageError> {
        blocking(self, |tracker| tracker.flush()).await
    }
}
