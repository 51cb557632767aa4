use std::path::{Path, PathBuf};
use std::sync::Arc;

use objstore_kinds::KindRegistry;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::file::FileObjectStore;
use crate::resolver::{CatalogResolver, DatasourceEntry, ReferenceResolver};
use crate::sql::{SqliteObjectStore, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_MAX_SEARCH_LIMIT};
use crate::traits::ObjectStore;

/// Which storage engine to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    File,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file. `:memory:` opens a private in-memory database.
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".objstore/objects.db"),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory that will hold `file-collections/`.
    pub root: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".objstore"),
        }
    }
}

/// Catalog the reference resolver checks references against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Installed plugin ids.
    pub plugins: Vec<String>,
    pub datasources: Vec<DatasourceEntry>,
}

impl ResolverConfig {
    pub fn build(&self) -> CatalogResolver {
        let resolver = self
            .datasources
            .iter()
            .cloned()
            .fold(CatalogResolver::new(), CatalogResolver::with_datasource);
        self.plugins
            .iter()
            .fold(resolver, |r, id| r.with_plugin(id.as_str()))
    }
}

/// Configuration for an object store process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    /// Upper bound on the page size of a search.
    pub max_search_limit: usize,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub sqlite: SqliteConfig,
    pub file: FileConfig,
    pub resolver: ResolverConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            max_search_limit: DEFAULT_MAX_SEARCH_LIMIT,
            log_level: "info".to_string(),
            sqlite: SqliteConfig::default(),
            file: FileConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Read a TOML config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text).map_err(|e| match e {
            StoreError::Config(msg) => StoreError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> StoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.max_search_limit == 0 {
            return Err(StoreError::Config("max_search_limit must be at least 1".into()));
        }
        match self.backend {
            Backend::Sqlite if self.sqlite.path.as_os_str().is_empty() => {
                Err(StoreError::Config("sqlite.path must not be empty".into()))
            }
            Backend::File if self.file.root.as_os_str().is_empty() => {
                Err(StoreError::Config("file.root must not be empty".into()))
            }
            _ => Ok(()),
        }
    }
}

/// Open the configured engine.
pub fn open_store(
    config: &StoreConfig,
    kinds: Arc<KindRegistry>,
    resolver: Arc<dyn ReferenceResolver>,
) -> StoreResult<Box<dyn ObjectStore>> {
    config.validate()?;
    let store: Box<dyn ObjectStore> = match config.backend {
        Backend::Sqlite if config.sqlite.path.as_os_str() == ":memory:" => Box::new(
            SqliteObjectStore::open_in_memory(kinds, resolver)?.with_max_search_limit(config.max_search_limit),
        ),
        Backend::Sqlite => Box::new(
            SqliteObjectStore::open(&config.sqlite.path, config.sqlite.busy_timeout_ms, kinds, resolver)?
                .with_max_search_limit(config.max_search_limit),
        ),
        Backend::File => Box::new(
            FileObjectStore::open(&config.file.root, kinds, resolver)?.with_max_search_limit(config.max_search_limit),
        ),
    };
    Ok(store)
}
