//! Pluggable persistence backends for lineage entries.
//!
//! A sink is handed each batch of entries right after the tracker appends it
//! to its in-memory history. The history stays authoritative: a failing sink
//! never removes entries from the tracker.
mod file;

use crate::entry::LineageEntry;
use crate::error::SinkError;

pub use self::file::{FileSink, FileSinkOptions, read_entries};

pub trait LineageSink: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Durably stores a batch of newly appended entries. Batches arrive in the
    /// order the tracker appended them.
    fn persist(&self, entries: &[LineageEntry]) -> Result<(), SinkError>;

    /// Rewrites everything the sink holds.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Materializes the durable history, or `None` when the sink keeps nothing
    /// outside process memory.
    fn load(&self) -> Result<Option<Vec<LineageEntry>>, SinkError> {
        Ok(None)
    }
}

/// The default sink. Stores nothing; the tracker's own history is the only
/// copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemorySink;

impl LineageSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn persist(&self, _: &[LineageEntry]) -> Result<(), SinkError> {
        Ok(())
    }
}
