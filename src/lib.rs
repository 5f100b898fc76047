#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod entry;
mod error;
mod mapper;
mod options;
mod orchestrator;
pub mod sink;
mod source;
mod tracker;

#[cfg(test)]
mod fixtures;

pub use crate::entry::{EntryBuilder, Field, LineageEntry};
pub use crate::error::*;
pub use crate::mapper::{FieldMapping, Mapper, Recorder, TrackableMapper};
pub use crate::options::TrackingOptions;
pub use crate::orchestrator::{GENERIC_RULE, Mapped, Orchestrator, UNKNOWN_FIELD};
pub use crate::sink::{FileSink, FileSinkOptions, LineageSink, MemorySink};
pub use crate::source::{Entity, SourceInfo, Sources};
pub use crate::tracker::{LineageTracker, TrackerBuilder};

/// Installs a `tracing` subscriber that prints to stderr, filtered by
/// `RUST_LOG` (defaults to `info`).
#[cfg(feature = "logging")]
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
