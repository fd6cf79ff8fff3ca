//! Durable storage for [`Preferences`].
//!
//! One TOML file holds the whole triple. Writes go to a uniquely named
//! temporary sibling that is then renamed over the file, so a reader never
//! sees a half-written row and concurrent writers never share a temp file.
//! Subscribers receive normalized snapshots: an empty city name is reported as
//! [`crate::model::DEFAULT_CITY`] no matter what is on disk.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::{error::StorageError, model::Preferences, updates::Updates};

/// File name of the preference store inside the data directory.
pub const STORE_FILE_NAME: &str = "preferences.toml";

#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    tx: watch::Sender<Preferences>,
    write_lock: Mutex<()>,
}

impl PreferenceStore {
    /// Open the store at `path`. A missing or unreadable file yields defaults.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let initial = match read_file(&path).await {
            Ok(Some(prefs)) => prefs.normalized(),
            Ok(None) => {
                debug!(path = %path.display(), "no stored preferences, using defaults");
                Preferences::default()
            }
            Err(err) => {
                warn!(error = %err, "failed to read preferences, using defaults");
                Preferences::default()
            }
        };

        let (tx, _) = watch::channel(initial);
        Self {
            path,
            tx,
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the preference file, for hosts to report.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upsert all three fields as a single write.
    ///
    /// The city name is stored as given, including empty.
    pub async fn save(
        &self,
        city_name: &str,
        is_dark_theme: bool,
        fetch_by_location: bool,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let prefs = Preferences::new(city_name, is_dark_theme, fetch_by_location);
        self.write_locked(prefs).await
    }

    /// Apply `edit` to the latest snapshot and save the result.
    pub async fn update<F>(&self, edit: F) -> Result<Preferences, StorageError>
    where
        F: FnOnce(&mut Preferences),
    {
        let _guard = self.write_lock.lock().await;
        let mut prefs = self.current();
        edit(&mut prefs);
        self.write_locked(prefs.clone()).await?;
        Ok(prefs.normalized())
    }

    /// Subscribe to snapshots: the current one first, then one per change.
    pub fn observe(&self) -> Updates<Preferences> {
        Updates::new(self.tx.subscribe())
    }

    /// Latest normalized snapshot.
    pub fn current(&self) -> Preferences {
        self.tx.borrow().clone()
    }

    /// Re-read the file, publishing the result if it differs from the
    /// current snapshot. Returns whether anything was published.
    pub async fn reload(&self) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let prefs = read_file(&self.path)
            .await?
            .unwrap_or_default()
            .normalized();
        Ok(self.publish(prefs))
    }

    async fn write_locked(&self, prefs: Preferences) -> Result<(), StorageError> {
        let encoded = toml::to_string_pretty(&prefs)?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, encoded.as_bytes()))
            .await
            .map_err(|e| StorageError::io(&self.path, std::io::Error::other(e)))??;

        debug!(
            city = %prefs.city_name,
            dark = prefs.is_dark_theme,
            by_location = prefs.fetch_by_location,
            "preferences saved"
        );

        self.publish(prefs.normalized());
        Ok(())
    }

    fn publish(&self, prefs: Preferences) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == prefs {
                false
            } else {
                *current = prefs;
                true
            }
        })
    }
}

/// Write `contents` to a fresh temp file next to `path`, then rename it into place.
fn replace_file(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .map_err(|e| StorageError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|e| StorageError::io(parent, e))?;
    tmp.write_all(contents)
        .map_err(|e| StorageError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}

async fn read_file(path: &Path) -> Result<Option<Preferences>, StorageError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(toml::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}
