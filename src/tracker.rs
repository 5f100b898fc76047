//! The append-only store of lineage entries and its query surface.
#[cfg(feature = "tokio")]
mod tokio;

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};

use glob::Pattern;

use crate::entry::{EntryBuilder, Field, LineageEntry};
use crate::error::LineageError;
use crate::options::TrackingOptions;
use crate::sink::{FileSink, FileSinkOptions, LineageSink, MemorySink};

struct Inner {
    options: TrackingOptions,
    history: Mutex<Vec<LineageEntry>>,
    sink: Box<dyn LineageSink>,
}

/// Records where every mapped value came from.
///
/// `LineageTracker` is a cheap handle: clones share the same history and sink,
/// so one tracker can be handed to many mapping calls running in parallel.
/// Appends are serialized, and a batch recorded through
/// [`record_batch`](Self::record_batch) always lands contiguously.
///
/// The in-memory history is authoritative. When the sink fails to persist a
/// batch the error is returned, but the batch stays in the history.
#[derive(Clone)]
pub struct LineageTracker {
    inner: Arc<Inner>,
}

impl LineageTracker {
    /// A tracker backed by [`MemorySink`].
    pub fn new(options: TrackingOptions) -> Self {
        Self::builder().options(options).finish()
    }

    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::new()
    }

    pub fn options(&self) -> TrackingOptions {
        self.inner.options
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.options.enable_lineage_tracking
    }

    fn history(&self) -> MutexGuard<'_, Vec<LineageEntry>> {
        self.inner.history.lock().unwrap()
    }

    /// Builds an entry and appends it. A no-op when tracking is disabled.
    pub fn record(&self, entry: EntryBuilder) -> Result<(), LineageError> {
        if !self.is_enabled() {
            tracing::trace!("Lineage tracking disabled, skipping record");
            return Ok(());
        }

        self.record_batch(vec![entry.build()?]).map(|_| ())
    }

    /// Appends a batch of entries as one contiguous block and hands it to the
    /// sink. Returns the number of entries appended.
    pub fn record_batch(&self, entries: Vec<LineageEntry>) -> Result<usize, LineageError> {
        if !self.is_enabled() {
            tracing::trace!("Lineage tracking disabled, skipping {} entries", entries.len());
            return Ok(0);
        }

        if entries.is_empty() {
            return Ok(0);
        }

        let count = entries.len();
        let mut history = self.history();
        let start = history.len();
        history.extend(entries);

        tracing::debug!("Recorded {} lineage entries ({} total)", count, history.len());

        // The lock is held across the write so the sink sees batches in the
        // same order as the history.
        self.inner
            .sink
            .persist(&history[start..])
            .map_err(|e| LineageError::Sink(self.inner.sink.name().to_string(), e))?;

        Ok(count)
    }

    /// The full history in insertion order.
    pub fn all(&self) -> Vec<LineageEntry> {
        self.history().clone()
    }

    pub fn len(&self) -> usize {
        self.history().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history().is_empty()
    }

    /// Entries derived from the given source attribute.
    pub fn by_source(&self, entity: &str, field: &str) -> Vec<LineageEntry> {
        self.filter(|entry| entry.source_entity() == entity && entry.source_field() == field)
    }

    /// Entries describing how the given target attribute was produced.
    pub fn by_target(&self, entity: &str, field: &str) -> Vec<LineageEntry> {
        self.filter(|entry| entry.target_entity() == entity && entry.target_field() == field)
    }

    /// Entries whose source or target `Entity.Field` path matches a glob
    /// pattern, e.g. `PocoX.*` or `*.Date`.
    pub fn glob(&self, pattern: &str) -> Result<Vec<LineageEntry>, LineageError> {
        let matcher = Pattern::new(pattern)?;
        let matches = |field: Field| matcher.matches(&field.path());

        Ok(self.filter(|entry| matches(entry.source()) || matches(entry.target())))
    }

    fn filter(&self, pred: impl Fn(&LineageEntry) -> bool) -> Vec<LineageEntry> {
        self.history()
            .iter()
            .filter(|entry| pred(*entry))
            .cloned()
            .collect()
    }

    /// Asks the sink to rewrite everything it holds.
    pub fn flush(&self) -> Result<(), LineageError> {
        let _history = self.history();
        self.inner
            .sink
            .flush()
            .map_err(|e| LineageError::Sink(self.inner.sink.name().to_string(), e))
    }

    /// The durable history as the sink sees it. For sinks that keep nothing
    /// outside memory this is the same as [`all`](Self::all).
    pub fn persisted(&self) -> Result<Vec<LineageEntry>, LineageError> {
        let loaded = {
            let _history = self.history();
            self.inner
                .sink
                .load()
                .map_err(|e| LineageError::Sink(self.inner.sink.name().to_string(), e))?
        };

        Ok(match loaded {
            Some(entries) => entries,
            None => self.all(),
        })
    }
}

impl Default for LineageTracker {
    fn default() -> Self {
        Self::new(TrackingOptions::default())
    }
}

impl Debug for LineageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineageTracker")
            .field("options", &self.inner.options)
            .field("sink", &self.inner.sink.name())
            .field("entries", &self.len())
            .finish()
    }
}

/// A builder for [`LineageTracker`].
pub struct TrackerBuilder {
    options: TrackingOptions,
    sink: Box<dyn LineageSink>,
}

impl TrackerBuilder {
    fn new() -> Self {
        Self {
            options: TrackingOptions::default(),
            sink: Box::new(MemorySink),
        }
    }

    pub fn options(mut self, options: TrackingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sink(mut self, sink: impl LineageSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Opens a [`FileSink`] and uses it as the sink.
    pub fn file_sink(self, options: FileSinkOptions) -> Result<Self, LineageError> {
        Ok(self.sink(FileSink::open(options)?))
    }

    pub fn finish(self) -> LineageTracker {
        LineageTracker {
            inner: Arc::new(Inner {
                options: self.options,
                history: Mutex::new(Vec::new()),
                sink: self.sink,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use camino::Utf8PathBuf;

    use super::*;
    use crate::error::SinkError;

    fn edge(source: &str, target: &str) -> EntryBuilder {
        let (se, sf) = source.split_once('.').unwrap();
        let (te, tf) = target.split_once('.').unwrap();
        LineageEntry::builder(Field::new(se, sf), "Direct mapping", Field::new(te, tf))
    }

    struct FailingSink;

    impl LineageSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn persist(&self, _: &[LineageEntry]) -> Result<(), SinkError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[test]
    fn test_empty_history() {
        let tracker = LineageTracker::default();
        assert!(tracker.all().is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_record_in_order() {
        let tracker = LineageTracker::default();
        tracker.record(edge("PocoX.Id", "PocoA.Bk")).unwrap();
        tracker.record(edge("PocoY.Code", "PocoA.Bk")).unwrap();

        let all = tracker.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].source_entity(), "PocoX");
        assert_eq!(all[1].source_entity(), "PocoY");
    }

    #[test]
    fn test_disabled_is_noop() {
        let tracker = LineageTracker::new(TrackingOptions::disabled());

        tracker.record(edge("PocoX.Id", "PocoA.Bk")).unwrap();
        let count = tracker
            .record_batch(vec![edge("PocoX.Id", "PocoA.Bk").build().unwrap()])
            .unwrap();

        assert_eq!(count, 0);
        assert!(tracker.all().is_empty());
    }

    #[test]
    fn test_invalid_entry_rejected() {
        let tracker = LineageTracker::default();
        let entry = LineageEntry::builder(Field::new("", "Id"), "rule", Field::new("PocoA", "Bk"));

        assert!(matches!(tracker.record(entry), Err(LineageError::Entry(_))));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_queries() {
        let tracker = LineageTracker::default();
        tracker.record(edge("PocoX.Id", "PocoA.Bk")).unwrap();
        tracker.record(edge("PocoX.Name", "PocoA.NamedCode")).unwrap();
        tracker.record(edge("PocoY.PocoYDate", "PocoA.Date")).unwrap();

        assert_eq!(tracker.by_source("PocoX", "Id").len(), 1);
        assert_eq!(tracker.by_target("PocoA", "Date").len(), 1);
        assert!(tracker.by_target("PocoA", "Missing").is_empty());

        assert_eq!(tracker.glob("PocoX.*").unwrap().len(), 2);
        assert_eq!(tracker.glob("*.Date").unwrap().len(), 1);
        assert!(matches!(tracker.glob("[").unwrap_err(), LineageError::Pattern(_)));
    }

    #[test]
    fn test_sink_failure_keeps_history() {
        let tracker = LineageTracker::builder().sink(FailingSink).finish();

        let err = tracker.record(edge("PocoX.Id", "PocoA.Bk")).unwrap_err();
        assert!(matches!(err, LineageError::Sink(name, SinkError::Io(_)) if name == "failing"));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_concurrent_batches_stay_contiguous() {
        let tracker = LineageTracker::default();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = tracker.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        let batch = (0..3)
                            .map(|f| {
                                edge(&format!("S{i}.F{f}"), &format!("T{i}.F{f}"))
                                    .build()
                                    .unwrap()
                            })
                            .collect();
                        tracker.record_batch(batch).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let all = tracker.all();
        assert_eq!(all.len(), 8 * 25 * 3);

        for chunk in all.chunks(3) {
            let entity = chunk[0].source_entity();
            assert!(chunk.iter().all(|entry| entry.source_entity() == entity));
            let fields: Vec<_> = chunk.iter().map(|entry| entry.source_field()).collect();
            assert_eq!(fields, ["F0", "F1", "F2"]);
        }
    }

    #[test]
    fn test_file_sink_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("lineage.json")).unwrap();

        let first = LineageTracker::builder()
            .file_sink(FileSinkOptions::new(&path).append(true))
            .unwrap()
            .finish();
        first.record(edge("PocoX.Id", "PocoA.Bk")).unwrap();
        drop(first);

        let second = LineageTracker::builder()
            .file_sink(FileSinkOptions::new(&path).append(true))
            .unwrap()
            .finish();
        second.record(edge("PocoY.Code", "PocoA.Bk")).unwrap();

        assert_eq!(second.all().len(), 1);

        let persisted = second.persisted().unwrap();
        let sources: Vec<_> = persisted.iter().map(|entry| entry.source_entity()).collect();
        assert_eq!(sources, ["PocoX", "PocoY"]);
    }

    #[test]
    fn test_persisted_without_append_drops_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("lineage.json")).unwrap();

        let first = LineageTracker::builder()
            .file_sink(FileSinkOptions::new(&path))
            .unwrap()
            .finish();
        first.record(edge("PocoX.Id", "PocoA.Bk")).unwrap();
        drop(first);

        let second = LineageTracker::builder()
            .file_sink(FileSinkOptions::new(&path))
            .unwrap()
            .finish();

        assert!(second.all().is_empty());
        assert!(second.persisted().unwrap().is_empty());
    }

    #[test]
    fn test_persisted_falls_back_to_memory() {
        let tracker = LineageTracker::default();
        tracker.record(edge("PocoX.Id", "PocoA.Bk")).unwrap();
        tracker.flush().unwrap();
        assert_eq!(tracker.persisted().unwrap(), tracker.all());
    }
}
