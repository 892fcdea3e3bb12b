//! File-backed store for analysis records.
//!
//! The whole store is one JSON array in `analyses.json`, newest record first.
//! There is no cache: every call reads the document from disk, so each
//! operation sees the latest persisted state. Writes replace the document
//! atomically through a temp file in the same directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};
use tempfile::NamedTempFile;

use crate::analysis_record::AnalysisRecord;
use crate::store_error::StoreError;

/// Name of the backing document inside the documents directory.
pub const STORAGE_FILE_NAME: &str = "analyses.json";

const EMPTY_DOCUMENT: &[u8] = b"[]";

/// Handle to the analyses document. Open one per process and share it.
///
/// Read-modify-write operations (`save`, `delete`, `clear`) are serialized
/// through an internal lock, so concurrent saves through the same handle do
/// not lose each other's updates. Reads are lock-free; the atomic rename
/// means they always observe a complete document.
///
/// ```no_run
/// use analysis_store::analysis_store::AnalysisStore;
/// use analysis_store::analysis_record::{AnalysisRecord, AnalysisStatus};
///
/// let store = AnalysisStore::init("/data/user/0/app/files")?;
/// let record = AnalysisRecord::new(
///     AnalysisRecord::timestamp_id(),
///     "2024-02-16",
///     "Granola",
///     "file://b.jpg",
///     "Compliant",
///     AnalysisStatus::Completed,
///     true,
/// );
/// store.save(record)?;
/// assert_eq!(store.list().len(), 1);
/// # Ok::<(), analysis_store::store_error::StoreError>(())
/// ```
#[derive(Debug)]
pub struct AnalysisStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AnalysisStore {
    /// Opens the store in the app's private documents directory, creating
    /// the directory and an empty document if they do not exist yet.
    pub fn init(documents_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = documents_dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| StoreError::Bootstrap {
            path: dir.to_path_buf(),
            source,
        })?;

        Self::with_file(dir.join(STORAGE_FILE_NAME))
    }

    /// Opens the store backed by an explicit file path.
    pub fn with_file(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        store.ensure_ready()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the backing document as an empty array if it is absent.
    ///
    /// Never clobbers an existing file: if another caller creates it first,
    /// that document is kept.
    pub(crate) fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }

        let bootstrap_err = |source: io::Error| StoreError::Bootstrap {
            path: self.path.clone(),
            source,
        };

        let tmp = self.staged_temp_file(EMPTY_DOCUMENT).map_err(bootstrap_err)?;
        match tmp.persist_noclobber(&self.path) {
            Ok(_) => {
                self.sync_parent_dir().map_err(bootstrap_err)?;
                info!("Created analyses document at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(bootstrap_err(e.error)),
        }
    }

    /// Reads every record, newest first, surfacing read and parse failures.
    pub fn try_list(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        self.ensure_ready()?;

        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Reads every record, newest first.
    ///
    /// An unreadable or corrupt document is reported through the log and
    /// treated as an empty store. Use [`AnalysisStore::try_list`] to observe
    /// the failure.
    pub fn list(&self) -> Vec<AnalysisRecord> {
        match self.try_list() {
            Ok(records) => records,
            Err(e) => {
                error!("Error getting analyses: {e}");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<AnalysisRecord> {
        self.list().into_iter().find(|record| record.id == id)
    }

    /// Stores `record` as the newest entry, replacing any record with the
    /// same id.
    ///
    /// A document that cannot be read fails the save rather than being
    /// overwritten.
    pub fn save(&self, record: AnalysisRecord) -> Result<AnalysisRecord, StoreError> {
        record.validate()?;

        let _guard = self.lock();
        let mut records = self.try_list().map_err(StoreError::into_write_failure)?;
        records.retain(|existing| existing.id != record.id);
        records.insert(0, record.clone());
        self.write_document(&records)?;

        debug!("Saved analysis {} ({} stored)", record.id, records.len());
        Ok(record)
    }

    /// Removes the record with `id`. Returns whether one was removed;
    /// deleting an unknown id is not an error.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock();
        let mut records = self.try_list().map_err(StoreError::into_write_failure)?;
        let before = records.len();
        records.retain(|existing| existing.id != id);
        let removed = records.len() != before;
        self.write_document(&records)?;

        debug!("Deleted analysis {id}: removed={removed}");
        Ok(removed)
    }

    /// Removes every record.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.write_document(&[])?;
        info!("Cleared analyses document at {}", self.path.display());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, a panicked writer leaves nothing to repair.
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_document(&self, records: &[AnalysisRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_vec(records).map_err(StoreError::Serialize)?;

        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let tmp = self.staged_temp_file(&json).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        self.sync_parent_dir().map_err(write_err)?;
        Ok(())
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Flushes the directory entry so the rename itself survives power loss.
    #[cfg(unix)]
    fn sync_parent_dir(&self) -> io::Result<()> {
        fs::File::open(self.parent_dir())?.sync_all()
    }

    // Directories cannot be opened as files on Windows; NTFS journals the rename.
    #[cfg(not(unix))]
    fn sync_parent_dir(&self) -> io::Result<()> {
        Ok(())
    }

    /// Writes `bytes` to a synced temp file beside the document, ready to be
    /// renamed over it. The temp file is removed if it is dropped unpersisted.
    fn staged_temp_file(&self, bytes: &[u8]) -> io::Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }
}
