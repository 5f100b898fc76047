use std::fs;
use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::{Utf8Path, Utf8PathBuf};

use crate::entry::LineageEntry;
use crate::error::{ConfigurationError, LineageError, SinkError};
use crate::sink::LineageSink;

/// Settings for [`FileSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkOptions {
    /// Location of the JSON array.
    pub path: Utf8PathBuf,
    /// Keep entries already stored at `path` and write new ones after them.
    pub append: bool,
    /// Remove any pre-existing file before the first write. Wins over `append`.
    pub delete_on_startup: bool,
}

impl FileSinkOptions {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: false,
            delete_on_startup: false,
        }
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn delete_on_startup(mut self, delete: bool) -> Self {
        self.delete_on_startup = delete;
        self
    }

    fn check(&self) -> Result<(), ConfigurationError> {
        let path = &self.path;

        if path.as_str().trim().is_empty() {
            return Err(ConfigurationError::EmptyPath);
        }

        if path.is_dir() {
            return Err(ConfigurationError::PathIsDirectory(path.clone()));
        }

        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
            && !parent.is_dir()
        {
            return Err(ConfigurationError::MissingParent(path.clone()));
        }

        if let Ok(meta) = fs::metadata(path)
            && meta.permissions().readonly()
        {
            return Err(ConfigurationError::ReadOnly(path.clone()));
        }

        Ok(())
    }
}

/// Stores the history as a single JSON array.
///
/// Every write replaces the whole file: the array is serialized next to the
/// target as `<path>.tmp` and renamed over it, so readers never see a
/// truncated array.
///
/// One sink owns its path for the lifetime of the process. Two sinks pointed
/// at the same file overwrite each other's entries.
#[derive(Debug)]
pub struct FileSink {
    path: Utf8PathBuf,
    /// Everything the file should contain after the next successful write.
    written: Mutex<Vec<LineageEntry>>,
    /// Whether the file on disk belongs to this session. Until then it may
    /// still hold a previous session's entries that will be replaced.
    synced: AtomicBool,
}

impl FileSink {
    pub fn open(options: FileSinkOptions) -> Result<Self, LineageError> {
        options.check()?;

        let FileSinkOptions {
            path,
            append,
            delete_on_startup,
        } = options;

        let sink_err = |e: SinkError| LineageError::Sink(path.to_string(), e);

        let written = if delete_on_startup {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| sink_err(e.into()))?;
                tracing::info!("Deleted lineage file {}", path);
            }
            Vec::new()
        } else if append {
            let existing = read_entries(&path).map_err(sink_err)?;
            tracing::info!(
                "Loaded {} existing lineage entries from {}",
                existing.len(),
                path
            );
            existing
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            written: Mutex::new(written),
            synced: AtomicBool::new(append && !delete_on_startup),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn temp_path(&self) -> Utf8PathBuf {
        let mut name = self.path.file_name().unwrap_or("lineage").to_string();
        name.push_str(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomic(&self, entries: &[LineageEntry]) -> Result<(), SinkError> {
        let temp = self.temp_path();
        let json = serde_json::to_vec_pretty(entries)?;

        let result = (|| -> io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }

        Ok(result?)
    }
}

impl LineageSink for FileSink {
    fn name(&self) -> &str {
        self.path.as_str()
    }

    fn persist(&self, entries: &[LineageEntry]) -> Result<(), SinkError> {
        let mut written = self.written.lock().unwrap();
        // Keep the batch even if the write fails, the next write retries it.
        written.extend_from_slice(entries);
        self.write_atomic(&written)?;
        self.synced.store(true, Ordering::Release);

        tracing::debug!(
            "Wrote {} lineage entries ({} new) to {}",
            written.len(),
            entries.len(),
            self.path
        );

        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let written = self.written.lock().unwrap();
        self.write_atomic(&written)?;
        self.synced.store(true, Ordering::Release);
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<LineageEntry>>, SinkError> {
        let written = self.written.lock().unwrap();
        if !self.synced.load(Ordering::Acquire) {
            return Ok(Some(written.clone()));
        }
        read_entries(&self.path).map(Some)
    }
}

/// Reads a JSON array of entries written by [`FileSink`]. A missing or empty
/// file yields no entries, an entry with an empty required attribute fails
/// like malformed JSON.
pub fn read_entries(path: impl AsRef<Utf8Path>) -> Result<Vec<LineageEntry>, SinkError> {
    let path = path.as_ref();

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(serde_json::from_str(&text)?)
}
