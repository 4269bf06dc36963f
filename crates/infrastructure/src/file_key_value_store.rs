use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use shopdesk_application::KeyValueStore;
use shopdesk_core::{AppError, AppResult};
use tracing::{debug, warn};

/// Key-value store persisted as one JSON object file.
///
/// The file is read once when opened. Every write rewrites the whole file
/// through a sibling temp file and a rename, so a crash mid-write leaves the
/// previous contents intact. Memory only changes once the write succeeded.
pub struct FileKeyValueStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// Opens the store at `path`; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(values) => values,
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "state file is unreadable; starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read state file '{}': {error}",
                    path.display()
                )));
            }
        };

        debug!(path = %path.display(), keys = values.len(), "opened state file");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|error| {
                AppError::Internal(format!(
                    "failed to create state directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        let encoded = serde_json::to_vec_pretty(values).map_err(|error| {
            AppError::Internal(format!("failed to encode state file: {error}"))
        })?;

        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        fs::write(&temp_path, encoded).map_err(|error| {
            AppError::Internal(format!(
                "failed to write state file '{}': {error}",
                temp_path.display()
            ))
        })?;
        fs::rename(&temp_path, &self.path).map_err(|error| {
            AppError::Internal(format!(
                "failed to replace state file '{}': {error}",
                self.path.display()
            ))
        })
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = values.clone();
        next.insert(key.to_owned(), value.to_owned());
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if !values.contains_key(key) {
            return Ok(());
        }

        let mut next = values.clone();
        next.remove(key);
        self.persist(&next)?;
        *values = next;
        Ok(())
    }
}
