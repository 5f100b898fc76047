//! Mapper capabilities: plain transformation, and transformation paired with
//! field-level lineage.

use crate::entry::{EntryBuilder, Field, LineageEntry};
use crate::error::{EntryError, LineageError};
use crate::source::{Entity, Sources};
use crate::tracker::LineageTracker;

/// Transforms a set of sources into one result.
///
/// `map` must be a pure function of its inputs. Any closure of the shape
/// `Fn(&Sources) -> anyhow::Result<R>` is a `Mapper` as well.
pub trait Mapper: Send + Sync {
    type Output;

    fn map(&self, sources: &Sources) -> anyhow::Result<Self::Output>;
}

impl<F, R> Mapper for F
where
    F: Fn(&Sources) -> anyhow::Result<R> + Send + Sync,
{
    type Output = R;

    fn map(&self, sources: &Sources) -> anyhow::Result<R> {
        self(sources)
    }
}

/// A [`Mapper`] that can also describe, field by field, how it produced a
/// result.
pub trait TrackableMapper: Mapper {
    /// Emits one entry per `(source field → target field)` pair the
    /// transformation used. Called only after [`map`](Mapper::map) succeeded,
    /// with the same sources and the produced result.
    ///
    /// Returning an error discards everything written to `recorder`.
    fn lineage(
        &self,
        sources: &Sources,
        result: &Self::Output,
        recorder: &mut Recorder,
    ) -> Result<(), LineageError>;

    /// Runs [`lineage`](Self::lineage) and appends its entries to `tracker` as
    /// one contiguous batch. Nothing is appended when it fails.
    ///
    /// The tracker does not deduplicate: tracking the same result twice
    /// appends two equivalent batches.
    fn track(
        &self,
        sources: &Sources,
        result: &Self::Output,
        tracker: &LineageTracker,
    ) -> Result<usize, LineageError> {
        if !tracker.is_enabled() {
            return Ok(0);
        }

        let mut recorder = Recorder::new();
        self.lineage(sources, result, &mut recorder)?;
        recorder.commit(tracker)
    }
}

/// Collects the entries of a single tracking call before they are appended.
#[derive(Debug, Default)]
pub struct Recorder {
    entries: Vec<LineageEntry>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: EntryBuilder) -> Result<(), EntryError> {
        self.entries.push(entry.build()?);
        Ok(())
    }

    /// Records every row of a mapping table, letting `decorate` fill in the
    /// metadata shared by all rows (systems, validation flags, tags).
    pub fn record_mappings<F>(
        &mut self,
        mappings: &[FieldMapping],
        decorate: F,
    ) -> Result<(), EntryError>
    where
        F: Fn(EntryBuilder) -> EntryBuilder,
    {
        for mapping in mappings {
            self.record(decorate(mapping.entry()))?;
        }
        Ok(())
    }

    pub fn entries(&self) -> &[LineageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn commit(self, tracker: &LineageTracker) -> Result<usize, LineageError> {
        tracker.record_batch(self.entries)
    }
}

/// One row of a mapper's field mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source_entity: &'static str,
    pub source_field: &'static str,
    pub rule: &'static str,
    pub target_entity: &'static str,
    pub target_field: &'static str,
    pub source_description: Option<&'static str>,
    pub target_description: Option<&'static str>,
}

impl FieldMapping {
    /// A row between two declared entities. Field names are checked against
    /// the entities' declared fields in debug builds.
    pub fn between<S, T>(
        source_field: &'static str,
        rule: &'static str,
        target_field: &'static str,
    ) -> Self
    where
        S: Entity,
        T: Entity,
    {
        debug_assert!(
            S::has_field(source_field),
            "{} has no field {}",
            S::NAME,
            source_field
        );
        debug_assert!(
            T::has_field(target_field),
            "{} has no field {}",
            T::NAME,
            target_field
        );

        Self {
            source_entity: S::NAME,
            source_field,
            rule,
            target_entity: T::NAME,
            target_field,
            source_description: None,
            target_description: None,
        }
    }

    pub fn describe(mut self, source: &'static str, target: &'static str) -> Self {
        self.source_description = Some(source);
        self.target_description = Some(target);
        self
    }

    pub fn entry(&self) -> EntryBuilder {
        let mut entry = LineageEntry::builder(
            Field::new(self.source_entity, self.source_field),
            self.rule,
            Field::new(self.target_entity, self.target_field),
        );
        if let Some(description) = self.source_description {
            entry = entry.source_description(description);
        }
        if let Some(description) = self.target_description {
            entry = entry.target_description(description);
        }
        entry
    }
}
