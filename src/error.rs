use camino::Utf8PathBuf;
use thiserror::Error;

/// A source object of an expected type was absent (or null) in the supplied
/// source collection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Missing required source '{entity}'")]
pub struct MissingSourceError {
    pub entity: String,
}

impl MissingSourceError {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
        }
    }
}

/// A required attribute of a lineage entry was left empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Lineage entry attribute '{0}' must not be empty")]
pub struct EntryError(pub &'static str);

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Couldn't persist lineage entries.\n{0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't (de)serialize lineage entries.\n{0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("File sink path must not be empty")]
    EmptyPath,

    #[error("File sink path '{0}' is a directory")]
    PathIsDirectory(Utf8PathBuf),

    #[error("Parent directory of '{0}' does not exist")]
    MissingParent(Utf8PathBuf),

    #[error("File sink path '{0}' is read-only")]
    ReadOnly(Utf8PathBuf),

    #[error("Invalid tracking options.\n{0}")]
    Options(String),
}

#[derive(Debug, Error)]
pub enum LineageError {
    #[error(transparent)]
    MissingSource(#[from] MissingSourceError),

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error("Lineage sink '{0}': {1}")]
    Sink(String, SinkError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[cfg(feature = "tokio")]
    #[error("Lineage task failed to complete.\n{0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failure of a single mapping unit before any result was produced.
#[derive(Debug, Error)]
pub enum MapError {
    /// The transform itself failed; the inner error is passed through as-is.
    #[error(transparent)]
    Transform(anyhow::Error),

    #[error(transparent)]
    MissingSource(#[from] MissingSourceError),
}

impl MapError {
    /// Wraps a transform error, lifting a missing source out of it so callers
    /// can match on it the same way as on a null source.
    pub(crate) fn from_transform(error: anyhow::Error) -> Self {
        match error.downcast::<MissingSourceError>() {
            Ok(missing) => Self::MissingSource(missing),
            Err(error) => Self::Transform(error),
        }
    }
}
