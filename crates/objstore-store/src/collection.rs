//! Generic per-org collections persisted as JSON files.
//!
//! Each `(collection, org)` pair lives in its own file,
//! `{root}/file-collections/{name}-{org}.json`, shaped
//! `{"version": N, "items": [...]}`. A file written with a different
//! `version`, or one that cannot be parsed, is discarded and the collection
//! starts over empty. There is no migration.
//!
//! Every load-modify-save sequence holds the org file's mutex, so callers on
//! one process never interleave on the same file.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Directory under the store root that holds every collection file.
pub const COLLECTIONS_DIR: &str = "file-collections";

/// Errors from collection persistence.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("collection io error: {0}")]
    Io(#[from] io::Error),

    #[error("collection serialization error: {0}")]
    Serialization(String),
}

pub type CollectionResult<T> = Result<T, CollectionError>;

/// Whether a [`FileCollection::mutate`] closure changed the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation<R> {
    /// Persist the modified items, then return the value.
    Save(R),
    /// Leave the file untouched.
    Discard(R),
}

#[derive(Serialize, Deserialize)]
struct CollectionFile<T> {
    version: u32,
    items: Vec<T>,
}

/// A typed collection of items, one JSON file per org.
pub struct FileCollection<T> {
    name: String,
    dir: PathBuf,
    version: u32,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    _items: PhantomData<fn() -> T>,
}

impl<T> FileCollection<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(root: impl AsRef<Path>, name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            dir: root.as_ref().join(COLLECTIONS_DIR),
            version,
            locks: Mutex::new(HashMap::new()),
            _items: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the file backing `org`.
    pub fn path(&self, org: i64) -> PathBuf {
        self.dir.join(format!("{}-{org}.json", self.name))
    }

    /// All items matching `pred`, in stored order.
    pub fn find(&self, org: i64, pred: impl Fn(&T) -> bool) -> CollectionResult<Vec<T>> {
        let lock = self.org_lock(org);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load(org)?.into_iter().filter(|item| pred(item)).collect())
    }

    pub fn find_first(&self, org: i64, pred: impl Fn(&T) -> bool) -> CollectionResult<Option<T>> {
        let lock = self.org_lock(org);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load(org)?.into_iter().find(|item| pred(item)))
    }

    pub fn insert(&self, org: i64, item: T) -> CollectionResult<()> {
        self.mutate(org, |items| {
            items.push(item);
            Ok::<_, CollectionError>(Mutation::Save(()))
        })
    }

    /// Apply `f` to the first item matching `pred`. Returns `false` if none did.
    pub fn update(&self, org: i64, pred: impl Fn(&T) -> bool, f: impl FnOnce(&mut T)) -> CollectionResult<bool> {
        self.mutate(org, |items| {
            Ok::<_, CollectionError>(match items.iter_mut().find(|item| pred(item)) {
                Some(item) => {
                    f(item);
                    Mutation::Save(true)
                }
                None => Mutation::Discard(false),
            })
        })
    }

    /// Remove every item matching `pred`; returns how many were removed.
    pub fn delete(&self, org: i64, pred: impl Fn(&T) -> bool) -> CollectionResult<usize> {
        self.mutate(org, |items| {
            let before = items.len();
            items.retain(|item| !pred(item));
            let removed = before - items.len();
            Ok::<_, CollectionError>(if removed > 0 {
                Mutation::Save(removed)
            } else {
                Mutation::Discard(0)
            })
        })
    }

    /// Load, modify and (if asked to) save the org's items under its lock.
    ///
    /// An error from `f` leaves the file untouched.
    pub fn mutate<R, E>(
        &self,
        org: i64,
        f: impl FnOnce(&mut Vec<T>) -> Result<Mutation<R>, E>,
    ) -> Result<R, E>
    where
        E: From<CollectionError>,
    {
        let lock = self.org_lock(org);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut items = self.load(org)?;
        match f(&mut items)? {
            Mutation::Save(value) => {
                self.save(org, &items)?;
                Ok(value)
            }
            Mutation::Discard(value) => Ok(value),
        }
    }

    fn org_lock(&self, org: i64) -> Arc<Mutex<()>> {
        // The map only ever gains entries, so a poisoned guard is still usable.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(org).or_default())
    }

    fn load(&self, org: i64) -> CollectionResult<Vec<T>> {
        let path = self.path(org);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<CollectionFile<T>>(&data) {
            Ok(file) if file.version == self.version => {
                debug!(collection = %self.name, org, items = file.items.len(), "loaded collection");
                Ok(file.items)
            }
            Ok(file) => {
                warn!(
                    collection = %self.name,
                    org,
                    found = file.version,
                    expected = self.version,
                    "collection version mismatch, starting empty"
                );
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(collection = %self.name, org, error = %e, "unreadable collection file, starting empty");
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, org: i64, items: &[T]) -> CollectionResult<()> {
        fs::create_dir_all(&self.dir)?;
        let file = CollectionFile {
            version: self.version,
            items: items.to_vec(),
        };
        let data = serde_json::to_vec_pretty(&file).map_err(|e| CollectionError::Serialization(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written file.
        let path = self.path(org);
        let tmp = path.with_extension("json.tmp");
        {
            let mut out = fs::File::create(&tmp)?;
            out.write_all(&data)?;
            out.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(collection = %self.name, org, items = items.len(), "saved collection");
        Ok(())
    }
}

impl<T> std::fmt::Debug for FileCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCollection")
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("version", &self.version)
            .finish()
    }
}
