//! Runs mappers and makes sure the tracker only ever sees results that were
//! successfully produced.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use uuid::Uuid;

use crate::entry::{Field, LineageEntry};
use crate::error::{LineageError, MapError, MissingSourceError};
use crate::mapper::{Mapper, TrackableMapper};
use crate::source::{Sources, short_type_name};
use crate::tracker::LineageTracker;

/// Rule recorded for entries produced without field-level knowledge.
pub const GENERIC_RULE: &str = "Generic Mapping Rule";
/// Field name recorded when the orchestrator cannot tell which field was used.
pub const UNKNOWN_FIELD: &str = "Unknown Field";

/// The output of one mapping unit.
///
/// A mapping unit goes `Created → Mapped → Tracked`. Once mapped, the value
/// is valid whether or not tracking succeeded; the tracking outcome is kept
/// next to it for the caller to inspect.
#[derive(Debug)]
#[must_use]
pub struct Mapped<R> {
    pub value: R,
    /// Number of entries appended, or why tracking failed.
    pub lineage: Result<usize, LineageError>,
}

impl<R> Mapped<R> {
    pub fn is_tracked(&self) -> bool {
        self.lineage.is_ok()
    }

    pub fn into_value(self) -> R {
        self.value
    }
}

/// Unique per-call label of the form `<Type>_<8 hex chars>`.
fn instance_label(entity: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}_{}", entity, &id[..8])
}

/// Invokes mappers against a single [`LineageTracker`].
///
/// Transform errors are never caught: they come back as
/// [`MapError::Transform`] holding the transform's own error, and nothing is
/// recorded for that call. A [`MissingSourceError`] raised by the transform
/// comes back as [`MapError::MissingSource`].
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    tracker: LineageTracker,
}

impl Orchestrator {
    pub fn new(tracker: LineageTracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &LineageTracker {
        &self.tracker
    }

    fn check_nulls(&self, sources: &Sources) -> Result<(), MissingSourceError> {
        if !self.tracker.options().throw_on_null_sources {
            return Ok(());
        }

        match sources.first_null() {
            Some(info) => Err(MissingSourceError::new(info.entity)),
            None => Ok(()),
        }
    }

    /// Runs an arbitrary transform, then records one coarse entry per
    /// non-null source. The transform may record precise field-level entries
    /// on the tracker itself before returning.
    pub fn map<R, F>(&self, sources: &Sources, transform: F) -> Result<Mapped<R>, MapError>
    where
        F: FnOnce(&Sources) -> anyhow::Result<R>,
    {
        self.check_nulls(sources)?;

        let value = transform(sources).map_err(MapError::from_transform)?;
        let lineage = self.track_generic::<R>(sources);

        Ok(self.finish(value, lineage))
    }

    fn track_generic<R>(&self, sources: &Sources) -> Result<usize, LineageError> {
        if !self.tracker.is_enabled() {
            return Ok(0);
        }

        let target = short_type_name::<R>();

        let entries = sources
            .iter()
            .filter(|info| !info.is_null)
            .map(|info| {
                LineageEntry::builder(
                    Field::new(info.entity, UNKNOWN_FIELD),
                    GENERIC_RULE,
                    Field::new(target, UNKNOWN_FIELD),
                )
                .source_system(instance_label(info.entity))
                .target_system(instance_label(target))
                .build()
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.tracker.record_batch(entries)
    }

    /// Runs a plain mapper. Nothing is recorded.
    pub fn run<M: Mapper>(&self, mapper: &M, sources: &Sources) -> Result<M::Output, MapError> {
        self.check_nulls(sources)?;
        mapper.map(sources).map_err(MapError::from_transform)
    }

    /// Runs a trackable mapper: `map` first, then `track` with the same
    /// sources and the produced value.
    pub fn run_tracked<M>(
        &self,
        mapper: &M,
        sources: &Sources,
    ) -> Result<Mapped<M::Output>, MapError>
    where
        M: TrackableMapper,
    {
        self.check_nulls(sources)?;

        let value = mapper.map(sources).map_err(MapError::from_transform)?;
        let lineage = mapper.track(sources, &value, &self.tracker);

        Ok(self.finish(value, lineage))
    }

    /// Runs a trackable mapper over many source sets in parallel.
    ///
    /// Results come back in input order. Each call's entries are contiguous in
    /// the history, though calls may land in any order.
    pub fn run_batch<M>(
        &self,
        mapper: &M,
        batch: &[Sources],
    ) -> Vec<Result<Mapped<M::Output>, MapError>>
    where
        M: TrackableMapper,
        M::Output: Send,
    {
        batch
            .par_iter()
            .map(|sources| self.run_tracked(mapper, sources))
            .collect()
    }

    fn finish<R>(&self, value: R, lineage: Result<usize, LineageError>) -> Mapped<R> {
        if let Err(e) = &lineage {
            tracing::warn!(
                "Mapped {} but failed to track lineage: {}",
                short_type_name::<R>(),
                e
            );
        }

        Mapped { value, lineage }
    }
}
