//! Singer registry and its JSON file store.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AppError, AppResult};

/// A singer the library knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Singer {
    /// Stable key (also the `singer` column of cataloged songs).
    pub key: String,
    /// Display name.
    pub name: String,
    /// Portrait image path.
    #[serde(default)]
    pub image: Option<PathBuf>,
    /// Folder holding the singer's audio files.
    pub folder: PathBuf,
}

/// Fields accepted when registering a singer.
#[derive(Debug, Clone)]
pub struct NewSinger {
    pub key: String,
    pub name: String,
    pub image: Option<PathBuf>,
    /// Defaults to `<audio_root>/<key>`.
    pub folder: Option<PathBuf>,
}

/// Singer storage format for JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct SingerFile {
    singers: Vec<Singer>,
}

/// Trait for singer registry operations.
pub trait SingerRegistry: Send + Sync {
    /// Find a singer by key.
    fn find(&self, key: &str) -> AppResult<Option<Singer>>;

    /// All singers, ordered by key.
    fn list(&self) -> AppResult<Vec<Singer>>;

    /// Register a new singer and create its folder.
    fn add(&self, singer: NewSinger) -> AppResult<Singer>;

    /// Find a singer or fail with NotFound.
    fn get(&self, key: &str) -> AppResult<Singer> {
        self.find(key)?
            .ok_or_else(|| AppError::singer_not_found(key))
    }
}

/// JSON file-based singer registry.
#[derive(Debug)]
pub struct JsonSingerRegistry {
    file_path: PathBuf,
    audio_root: PathBuf,
    /// In-memory cache for fast reads.
    cache: RwLock<BTreeMap<String, Singer>>,
}

impl JsonSingerRegistry {
    /// Create a new registry backed by `file_path`, placing new singer folders
    /// under `audio_root`.
    pub fn new(file_path: impl AsRef<Path>, audio_root: impl AsRef<Path>) -> AppResult<Self> {
        let registry = Self {
            file_path: file_path.as_ref().to_path_buf(),
            audio_root: audio_root.as_ref().to_path_buf(),
            cache: RwLock::new(BTreeMap::new()),
        };

        registry.load()?;

        Ok(registry)
    }

    /// Load singers from file into cache.
    fn load(&self) -> AppResult<()> {
        if !self.file_path.exists() {
            tracing::info!(
                path = %self.file_path.display(),
                "Singers file not found, starting fresh"
            );
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.file_path)?;
        let stored: SingerFile = serde_json::from_str(&content)?;

        let mut cache = self.cache.write();
        cache.clear();
        for singer in stored.singers {
            cache.insert(singer.key.clone(), singer);
        }

        tracing::info!(count = cache.len(), "Loaded singers from file");
        Ok(())
    }

    /// Save singers from cache to file.
    fn save(&self) -> AppResult<()> {
        let cache = self.cache.read();
        let stored = SingerFile {
            singers: cache.values().cloned().collect(),
        };

        let content = serde_json::to_string_pretty(&stored)?;

        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.file_path)?;

        tracing::debug!(
            path = %self.file_path.display(),
            count = cache.len(),
            "Saved singers to file"
        );
        Ok(())
    }
}

impl SingerRegistry for JsonSingerRegistry {
    fn find(&self, key: &str) -> AppResult<Option<Singer>> {
        let cache = self.cache.read();
        Ok(cache.get(key).cloned())
    }

    fn list(&self) -> AppResult<Vec<Singer>> {
        let cache = self.cache.read();
        Ok(cache.values().cloned().collect())
    }

    fn add(&self, new: NewSinger) -> AppResult<Singer> {
        if new.name.trim().is_empty() {
            return Err(AppError::Validation("Singer name cannot be empty".to_string()));
        }

        let singer = Singer {
            folder: new
                .folder
                .unwrap_or_else(|| self.audio_root.join(&new.key)),
            key: new.key,
            name: new.name.trim().to_string(),
            image: new.image,
        };

        {
            let mut cache = self.cache.write();
            if cache.contains_key(&singer.key) {
                return Err(AppError::Conflict(format!(
                    "Singer '{}' already exists",
                    singer.key
                )));
            }
            std::fs::create_dir_all(&singer.folder)?;
            cache.insert(singer.key.clone(), singer.clone());
        }

        self.save()?;
        tracing::info!(
            singer = %singer.key,
            folder = %singer.folder.display(),
            "Registered singer"
        );
        Ok(singer)
    }
}

/// Thread-safe handle to a singer registry.
pub type SharedSingerRegistry = Arc<dyn SingerRegistry>;
