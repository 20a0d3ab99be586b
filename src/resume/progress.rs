//! Checkpoint persistence for completed series
//!
//! Implements atomic file writes and advisory locking around the progress
//! artifact of one source/target pair.

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current checkpoint schema version
const SCHEMA_VERSION: &str = "1.0.0";

/// Maximum allowed checkpoint file size (10 MB) to prevent memory exhaustion
pub const MAX_STATE_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Identity of a migration for checkpoint purposes.
///
/// Derived from the pair of endpoints; two different pairs always map to two
/// different artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    source: String,
    target: String,
}

impl ProgressKey {
    /// Create a key for `source` migrating into `target`
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Source endpoint
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Target endpoint
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Artifact file name, `progress_<source>_<target>.json`.
    ///
    /// Both components are percent-escaped (including `_`), which keeps the
    /// mapping injective and free of path separators.
    pub fn file_name(&self) -> String {
        format!(
            "progress_{}_{}.json",
            escape_component(&self.source),
            escape_component(&self.target)
        )
    }
}

/// Percent-escape every byte outside `[A-Za-z0-9.-]`
pub(crate) fn escape_component(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            escaped.push(byte as char);
        } else {
            let _ = write!(escaped, "%{byte:02X}");
        }
    }
    escaped
}

/// Set of series names fully processed for one [`ProgressKey`].
///
/// Membership only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointSet {
    completed: BTreeSet<String>,
}

impl CheckpointSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `series` is already completed
    pub fn contains(&self, series: &str) -> bool {
        self.completed.contains(series)
    }

    /// Mark `series` as completed. Returns `false` if it already was.
    pub fn insert(&mut self, series: impl Into<String>) -> bool {
        self.completed.insert(series.into())
    }

    /// Number of completed series
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    /// Whether no series is completed yet
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Completed series in name order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.completed.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CheckpointSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            completed: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// On-disk representation of a checkpoint set
#[derive(Debug, Serialize, Deserialize)]
struct ProgressDocument {
    schema_version: String,
    source: String,
    target: String,
    completed: BTreeSet<String>,
    updated_at: i64,
}

/// File-backed store of checkpoint sets, one artifact per [`ProgressKey`]
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at `dir`
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path for `key`
    pub fn path_for(&self, key: &ProgressKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Load the checkpoint set for `key`, or an empty set if none was saved.
    ///
    /// Nothing is written when the artifact is absent. A present but
    /// unreadable, malformed or foreign artifact is an error.
    pub fn load_or_default(&self, key: &ProgressKey) -> Result<CheckpointSet, ResumeError> {
        let path = self.path_for(key);
        debug!(path = %path.display(), "Loading checkpoint set");

        if !path.exists() {
            info!(path = %path.display(), "No checkpoint found, starting fresh");
            return Ok(CheckpointSet::new());
        }

        let lock_file = open_lock_file(&path)?;
        let lock = RwLock::new(lock_file);
        let _guard = lock
            .read()
            .map_err(|e| ResumeError::LockError(format!("Failed to acquire read lock: {e}")))?;

        let metadata = std::fs::metadata(&path).map_err(|e| ResumeError::IoError(e.to_string()))?;
        if metadata.len() > MAX_STATE_FILE_SIZE {
            return Err(ResumeError::StateTooLarge {
                size: metadata.len(),
                max: MAX_STATE_FILE_SIZE,
            });
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| ResumeError::IoError(e.to_string()))?;

        let document: ProgressDocument = serde_json::from_str(&contents).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to deserialize checkpoint");
            ResumeError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        if document.schema_version != SCHEMA_VERSION {
            return Err(ResumeError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found: document.schema_version,
            });
        }

        if document.source != key.source || document.target != key.target {
            return Err(ResumeError::Corrupt {
                path,
                reason: format!(
                    "checkpoint belongs to {} -> {}, expected {} -> {}",
                    document.source, document.target, key.source, key.target
                ),
            });
        }

        info!(
            completed = document.completed.len(),
            "Checkpoint loaded successfully"
        );

        Ok(CheckpointSet {
            completed: document.completed,
        })
    }

    /// Persist `set` for `key`, replacing any previous artifact.
    ///
    /// Writes a temp file in the same directory, syncs it, then renames it
    /// over the target so readers only ever see a whole document.
    pub fn save(&self, key: &ProgressKey, set: &CheckpointSet) -> Result<(), ResumeError> {
        let path = self.path_for(key);
        debug!(
            path = %path.display(),
            completed = set.len(),
            "Saving checkpoint set"
        );

        std::fs::create_dir_all(&self.dir).map_err(|e| ResumeError::IoError(e.to_string()))?;

        let document = ProgressDocument {
            schema_version: SCHEMA_VERSION.to_string(),
            source: key.source.clone(),
            target: key.target.clone(),
            completed: set.completed.clone(),
            updated_at: chrono::Utc::now().timestamp_millis(),
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| ResumeError::SerializationError(e.to_string()))?;

        let lock_file = open_lock_file(&path)?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| ResumeError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| ResumeError::IoError(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| ResumeError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| ResumeError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| ResumeError::IoError(format!("Failed to sync temp file: {e}")))?;
        temp_file
            .persist(&path)
            .map_err(|e| ResumeError::IoError(format!("Failed to persist temp file: {e}")))?;

        // Make the rename itself durable
        if let Err(e) = sync_directory(&self.dir) {
            warn!(
                dir = %self.dir.display(),
                error = %e,
                "Failed to sync checkpoint directory"
            );
        }

        info!(
            path = %path.display(),
            completed = set.len(),
            "Checkpoint saved"
        );
        Ok(())
    }
}

fn sync_directory(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

fn open_lock_file(path: &Path) -> Result<std::fs::File, ResumeError> {
    let lock_path = path.with_extension("lock");
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| ResumeError::LockError(format!("Failed to create lock file: {e}")))
}

/// Errors related to checkpoint state
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// Schema version mismatch
    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version
        expected: String,
        /// Found schema version
        found: String,
    },

    /// Checkpoint file too large
    #[error("checkpoint file too large: {size} bytes (max: {max} bytes)")]
    StateTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// Artifact exists but cannot be trusted
    #[error("corrupt checkpoint {}: {reason}", path.display())]
    Corrupt {
        /// Artifact path
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}
