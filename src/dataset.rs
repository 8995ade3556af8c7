//! Loads category word lists from the data directory.
//!
//! Layout: `<data_dir>/<topic>.json` holds the base list for a topic and
//! `<data_dir>/extra/<topic>.{txt,json,csv}` are merged on top. Files that
//! are missing contribute nothing; files that cannot be read or parsed are
//! skipped with a warning.

use std::path::{Path, PathBuf};

use derive_more::{Display, Error};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::words::{ALL_TOPICS, WordSets};

/// Name of the directory holding additional lists.
pub const EXTRA_DIR: &str = "extra";

/// Reads datasets from a directory on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLoader {
    data_dir: PathBuf,
}

impl DatasetLoader {
    /// Creates a loader rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory of additional lists.
    pub fn extra_dir(&self) -> PathBuf {
        self.data_dir.join(EXTRA_DIR)
    }

    /// Creates the extra directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the directory cannot be created.
    #[instrument(skip(self), fields(dir = %self.data_dir.display()))]
    pub fn ensure_dirs(&self) -> Result<(), DatasetError> {
        let extra = self.extra_dir();
        if extra.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(&extra).map_err(|e| {
            DatasetError::new(format!(
                "Failed to create dataset directory {}: {}",
                extra.display(),
                e
            ))
        })?;
        info!(path = %extra.display(), "Created extra dataset directory");
        Ok(())
    }

    /// Reads every entry listed for `topic`, base list first.
    #[instrument(skip(self))]
    pub fn load_topic(&self, topic: &str) -> Vec<String> {
        let mut entries = Vec::new();

        let base = self.data_dir.join(format!("{topic}.json"));
        if base.is_file() {
            entries.extend(from_json(&base));
        } else {
            debug!(path = %base.display(), "No base list");
        }

        let extra = self.extra_dir();
        for extension in ["txt", "json", "csv"] {
            let path = extra.join(format!("{topic}.{extension}"));
            if path.is_file() {
                let found = match extension {
                    "txt" => from_txt(&path),
                    "json" => from_json(&path),
                    _ => from_csv(&path),
                };
                debug!(path = %path.display(), count = found.len(), "Merged extra list");
                entries.extend(found);
            }
        }
        entries
    }

    /// Loads every known topic.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] only if the directory layout cannot be
    /// created; unreadable files are skipped.
    #[instrument(skip(self), fields(dir = %self.data_dir.display()))]
    pub fn load_all(&self) -> Result<WordSets, DatasetError> {
        self.ensure_dirs()?;
        let mut sets = WordSets::new();
        for topic in ALL_TOPICS {
            sets.insert(topic, self.load_topic(topic));
        }
        info!(sizes = ?sets.sizes(), "Datasets loaded");
        Ok(sets)
    }
}

fn read(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .map_err(|e| warn!(path = %path.display(), error = %e, "Skipping unreadable dataset file"))
        .ok()
}

/// A JSON array; strings and numbers are kept, anything else is dropped.
fn from_json(path: &Path) -> Vec<String> {
    let Some(raw) = read(path) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Ok(_) => {
            warn!(path = %path.display(), "Dataset file is not a JSON array");
            Vec::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping malformed JSON dataset");
            Vec::new()
        }
    }
}

/// One entry per line.
fn from_txt(path: &Path) -> Vec<String> {
    read(path)
        .map(|raw| {
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// First column of each line.
fn from_csv(path: &Path) -> Vec<String> {
    read(path)
        .map(|raw| {
            raw.lines()
                .filter_map(|line| line.split(',').next())
                .map(str::trim)
                .filter(|cell| !cell.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Dataset error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Dataset error: {} at {}:{}", message, file, line)]
pub struct DatasetError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DatasetError {
    /// Creates a new dataset error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
