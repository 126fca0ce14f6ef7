//! On-disk record store
//!
//! The library is a directory with one folder per record:
//!
//! ```text
//! <library>/
//!   Anime-CowboyBebop-0/
//!     data.json
//!     assets/cover.jpg
//!   Book-Dune-9780441172719/
//!     data.json
//!     assets/
//! ```
//!
//! [`RecordStore`] is the only writer of `data.json`; files under `assets/`
//! are written by the [`AssetResolver`].

mod assets;
mod identity;

pub use assets::{AssetResolver, ResolvedAssets};
pub use identity::{
    identity_prefix, slug, FolderId, FolderNameResolver, IdentityAllocator, IdentityArena,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::record::Record;

/// Record document file name inside a record folder
pub const DATA_FILE: &str = "data.json";

/// Image folder name inside a record folder
pub const ASSETS_DIR: &str = "assets";

/// A change to the library that views should pick up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryChange {
    Saved(FolderId),
    Updated { from: FolderId, to: FolderId },
    Deleted(Vec<FolderId>),
    Imported(Vec<FolderId>),
}

/// Receives notifications after successful store mutations
pub trait StoreObserver: Send + Sync {
    fn library_changed(&self, change: &LibraryChange);
}

/// Result of a successful save or update
#[derive(Debug)]
pub struct SaveOutcome {
    /// Folder the record now lives in
    pub id: FolderId,
    /// Images that could not be stored; the record itself was written
    pub asset_failures: Vec<Error>,
}

/// Directory-of-documents record store
#[derive(Clone)]
pub struct RecordStore {
    root: PathBuf,
    assets: AssetResolver,
    observer: Option<Arc<dyn StoreObserver>>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("root", &self.root)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RecordStore {
    /// Open (and create if needed) a library at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            assets: AssetResolver::new(),
            observer: None,
        })
    }

    /// Set the observer notified after each successful mutation
    pub fn with_observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replace the asset resolver (e.g. to use a configured HTTP client)
    pub fn with_asset_resolver(mut self, assets: AssetResolver) -> Self {
        self.assets = assets;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn asset_resolver(&self) -> &AssetResolver {
        &self.assets
    }

    /// Folder of a record
    pub fn record_dir(&self, id: &FolderId) -> PathBuf {
        self.root.join(id.as_str())
    }

    pub fn contains(&self, id: &FolderId) -> bool {
        self.record_dir(id).join(DATA_FILE).is_file()
    }

    /// Identities of every record folder, sorted by category, slug and suffix
    pub fn list(&self) -> Result<Vec<FolderId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            match name.parse::<FolderId>() {
                Ok(id) if entry.path().join(DATA_FILE).is_file() => ids.push(id),
                Ok(_) => tracing::debug!("Skipping {} (no {})", name, DATA_FILE),
                Err(_) => tracing::debug!("Skipping foreign folder {}", name),
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Read one record
    pub fn read(&self, id: &FolderId) -> Result<Record> {
        read_record(&self.record_dir(id)).map_err(|e| match e {
            Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Error::RecordNotFound(id.to_string())
            }
            other => other,
        })
    }

    /// Read every record that parses; broken ones are logged and skipped
    pub fn read_all(&self) -> Result<Vec<(FolderId, Record)>> {
        let mut records = Vec::new();
        for id in self.list()? {
            match self.read(&id) {
                Ok(record) => records.push((id, record)),
                Err(e) => tracing::warn!("Cannot read {}: {}", id, e),
            }
        }
        Ok(records)
    }

    /// Create a new record folder.
    ///
    /// Fails with `AlreadyExists` if the target folder is already present. A
    /// record with an alternate name is also refused when any folder already
    /// carries its name or its alternate name. Images that cannot be stored are reported without failing the save.
    pub async fn save(&self, mut record: Record) -> Result<SaveOutcome> {
        record.validate().map_err(Error::InvalidRecord)?;
        record.normalize();

        let mut arena = IdentityArena::scan(&self.root)?;
        if let Some(alternate) = FolderNameResolver::alternate_prefix(&record) {
            let primary = FolderNameResolver::prefix(&record);
            if let Some(taken) = [primary, alternate].into_iter().find(|p| arena.count(p) > 0) {
                return Err(Error::AlreadyExists(taken));
            }
        }
        let id = FolderNameResolver::resolve(&record, &mut arena)?;
        let dir = self.record_dir(&id);

        fs::create_dir(&dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => Error::AlreadyExists(id.to_string()),
            _ => Error::WriteFailed {
                path: dir.clone(),
                source: e,
            },
        })?;
        let assets_dir = dir.join(ASSETS_DIR);
        if let Err(source) = fs::create_dir(&assets_dir) {
            let _ = fs::remove_dir_all(&dir);
            return Err(Error::WriteFailed {
                path: assets_dir,
                source,
            });
        }

        let resolved = self.assets.resolve(record.images(), &dir).await;
        record.set_images(resolved.paths);

        if let Err(e) = write_record(&dir, &record) {
            let _ = fs::remove_dir_all(&dir);
            return Err(e);
        }

        tracing::info!("Saved {}", id);
        self.notify(LibraryChange::Saved(id.clone()));
        Ok(SaveOutcome {
            id,
            asset_failures: resolved.failures,
        })
    }

    /// Rewrite an existing record, moving its folder if its name changed.
    ///
    /// A failed rename aborts before anything is written. Newly submitted
    /// images are stored next; their failures are soft. The update succeeds
    /// when `data.json` is written.
    pub async fn update(&self, mut record: Record, prior: &FolderId) -> Result<SaveOutcome> {
        record.validate().map_err(Error::InvalidRecord)?;
        record.normalize();

        if !self.contains(prior) {
            return Err(Error::RecordNotFound(prior.to_string()));
        }

        let id = if FolderNameResolver::needs_rename(prior, &record) {
            let mut arena = IdentityArena::scan(&self.root)?;
            let next = FolderNameResolver::resolve(&record, &mut arena)?;
            let from = self.record_dir(prior);
            let to = self.record_dir(&next);
            if to.exists() {
                return Err(Error::AlreadyExists(next.to_string()));
            }
            fs::rename(&from, &to).map_err(|source| Error::RenameFailed {
                from: prior.to_string(),
                to: next.to_string(),
                source,
            })?;
            tracing::info!("Renamed {} -> {}", prior, next);
            next
        } else {
            prior.clone()
        };

        let dir = self.record_dir(&id);
        let resolved = self.assets.resolve(record.images(), &dir).await;
        record.set_images(resolved.paths);
        write_record(&dir, &record)?;

        tracing::info!("Updated {}", id);
        self.notify(LibraryChange::Updated {
            from: prior.clone(),
            to: id.clone(),
        });
        Ok(SaveOutcome {
            id,
            asset_failures: resolved.failures,
        })
    }

    /// Delete record folders.
    ///
    /// Each folder is removed independently; the returned list holds one
    /// `RemovalFailed` per folder that could not be removed.
    pub fn delete(&self, ids: &[FolderId]) -> Vec<Error> {
        let mut removed = Vec::new();
        let mut failures = Vec::new();

        for id in ids {
            match fs::remove_dir_all(self.record_dir(id)) {
                Ok(()) => removed.push(id.clone()),
                Err(source) => {
                    tracing::warn!("Failed to delete {}: {}", id, source);
                    failures.push(Error::RemovalFailed {
                        id: id.to_string(),
                        source,
                    });
                }
            }
        }

        if !removed.is_empty() {
            tracing::info!("Deleted {} record(s)", removed.len());
            self.notify(LibraryChange::Deleted(removed));
        }
        failures
    }

    pub(crate) fn notify(&self, change: LibraryChange) {
        if let Some(ref observer) = self.observer {
            observer.library_changed(&change);
        }
    }
}

/// Parse `data.json` from a record folder
pub fn read_record(dir: &Path) -> Result<Record> {
    let content = fs::read_to_string(dir.join(DATA_FILE))?;
    Ok(serde_json::from_str(&content)?)
}

/// Serialize a record into `dir/data.json`
pub fn write_record(dir: &Path, record: &Record) -> Result<()> {
    let path = dir.join(DATA_FILE);
    let json = serde_json::to_string_pretty(record)?;
    fs::write(&path, json).map_err(|source| Error::WriteFailed { path, source })
}
