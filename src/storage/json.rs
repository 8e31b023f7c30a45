use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions, rename, write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use log::{debug, warn};
use serde_json::to_string_pretty;
use uuid::Uuid;

use crate::storage::{KeyValueStore, StorageError};

pub const DEFAULT_MAX_BACKUPS: usize = 5;

/// Key/value store kept as a single JSON object on disk.
///
/// Every `set` rewrites the whole file: the new content goes to a temp file,
/// the previous file is copied into `backups/`, and the temp file is renamed
/// over the original while an exclusive lock is held on `<file>.lock`.
pub struct JsonFileStore {
    path: PathBuf,
    max_backups: usize,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| StorageError::ParseFailed {
                path: self.path.clone(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json =
            to_string_pretty(entries).map_err(|e| StorageError::SerializeFailed { source: e })?;

        let unique_temp = format!("{}.tmp.{}", self.path.display(), Uuid::new_v4());
        let temp_path = PathBuf::from(&unique_temp);
        write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let result = self
            .create_backup()
            .and_then(|_| self.cleanup_old_backups())
            .and_then(|_| {
                rename(&temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
                    path: self.path.clone(),
                    source: e,
                })
            });

        if result.is_err() {
            if let Err(e) = fs::remove_file(&temp_path) {
                warn!("Could not remove temp file {}: {}", temp_path.display(), e);
            }
        }
        result
    }

    fn lock(&self) -> Result<File, StorageError> {
        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;
        Ok(lock_file)
    }

    fn ensure_parent_dir(&self) -> Result<(), StorageError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| StorageError::SaveFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })
            }
            _ => Ok(()),
        }
    }

    fn create_backup(&self) -> Result<u64, StorageError> {
        let file_exists = fs::exists(&self.path).map_err(|e| StorageError::BackupFailed {
            path: self.path.clone(),
            source: e,
        })?;
        if !file_exists || self.max_backups == 0 {
            return Ok(0);
        }

        let backups_dir = self.get_backup_dir();
        fs::create_dir_all(&backups_dir).map_err(|e| StorageError::BackupFailed {
            path: backups_dir,
            source: e,
        })?;

        let backup_path = self.get_backup_path();
        let bytes = fs::copy(&self.path, &backup_path).map_err(|e| StorageError::BackupFailed {
            path: backup_path.clone(),
            source: e,
        })?;
        debug!("Backed up {} bytes to {}", bytes, backup_path.display());
        Ok(bytes)
    }

    fn cleanup_old_backups(&self) -> Result<(), StorageError> {
        let backup_dir = self.get_backup_dir();
        let backup_dir_exists =
            fs::exists(&backup_dir).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        if !backup_dir_exists {
            return Ok(());
        }

        let prefix = format!("{}-", self.backup_stem());
        let mut file_entries = fs::read_dir(&backup_dir)
            .map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?
            .flatten()
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();

        file_entries.sort();

        let number_of_files_to_delete = file_entries.len().saturating_sub(self.max_backups);
        for file_path in &file_entries[0..number_of_files_to_delete] {
            debug!("Removing old backup {}", file_path.display());
            fs::remove_file(file_path).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        }

        Ok(())
    }

    fn get_backup_dir(&self) -> PathBuf {
        let parent_store_path = self.path.parent().unwrap_or(Path::new("."));
        parent_store_path.join("backups")
    }

    fn backup_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("store"))
    }

    fn get_backup_path(&self) -> PathBuf {
        // Zero-padded nanoseconds keep lexical order equal to age order.
        let nanos = jiff::Timestamp::now().as_nanosecond();
        let filename = format!("{}-{:020}.json", self.backup_stem(), nanos);
        self.get_backup_dir().join(filename)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut entries = self.read_entries()?;
        Ok(entries.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_parent_dir()?;
        let lock_file = self.lock()?;

        // An unreadable file is replaced; the backup step keeps a copy of it.
        let mut entries = match self.read_entries() {
            Err(StorageError::ParseFailed { path, source }) => {
                warn!(
                    "Replacing unreadable store {}: {}",
                    path.display(),
                    source
                );
                BTreeMap::new()
            }
            other => other?,
        };
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)?;

        FileExt::unlock(&lock_file).map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        debug!(
            "Wrote key '{}' ({} bytes) to {}",
            key,
            value.len(),
            self.path.display()
        );
        Ok(())
    }
}
