//! Application configuration management.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Global configuration instance.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Default upload size limit (50 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const DEFAULT_SESSION_IDLE_SECS: u64 = 6 * 60 * 60;
const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Path to the SQLite catalog.
    pub database_path: PathBuf,
    /// Root folder holding one sub-folder per singer.
    pub audio_root: PathBuf,
    /// Path to the singer registry JSON file.
    pub singers_file: PathBuf,
    /// Folder singer portraits are served from.
    pub images_root: PathBuf,
    /// Largest accepted upload body, in bytes.
    pub max_upload_bytes: usize,
    /// Seconds a session may stay untouched before it is dropped.
    pub session_idle_secs: u64,
    /// Most sessions kept in memory.
    pub max_sessions: usize,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json or pretty).
    pub log_format: LogFormat,
    /// Allowed CORS origins (comma-separated, or * for all).
    pub cors_origins: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable colored output.
    Pretty,
    /// JSON structured logging for production.
    Json,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if a numeric variable is set but cannot be parsed.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16");

        let database_path = PathBuf::from(
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "./database.db".to_string()),
        );

        let audio_root =
            PathBuf::from(std::env::var("AUDIO_ROOT").unwrap_or_else(|_| "./audio".to_string()));

        let singers_file = PathBuf::from(
            std::env::var("SINGERS_FILE").unwrap_or_else(|_| "./data/singers.json".to_string()),
        );

        let images_root =
            PathBuf::from(std::env::var("IMAGES_ROOT").unwrap_or_else(|_| "./images".to_string()));

        let max_upload_bytes = std::env::var("MAX_UPLOAD_BYTES")
            .map(|v| {
                v.parse::<usize>()
                    .expect("MAX_UPLOAD_BYTES must be a valid integer")
            })
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let session_idle_secs = std::env::var("SESSION_IDLE_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .expect("SESSION_IDLE_SECS must be a valid integer")
            })
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS);

        let max_sessions = std::env::var("MAX_SESSIONS")
            .map(|v| v.parse::<usize>().expect("MAX_SESSIONS must be a valid integer"))
            .unwrap_or(DEFAULT_MAX_SESSIONS);

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port,
            database_path,
            audio_root,
            singers_file,
            images_root,
            max_upload_bytes,
            session_idle_secs,
            max_sessions,
            log_level,
            log_format,
            cors_origins,
        }
    }

    /// Validate the configuration, creating missing directories.
    ///
    /// # Errors
    /// Returns an error if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio_root.exists() && !self.audio_root.is_dir() {
            return Err(ConfigError::AudioRootNotDirectory(
                self.audio_root.display().to_string(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidUploadLimit);
        }

        if self.max_sessions == 0 {
            return Err(ConfigError::InvalidSessionLimit);
        }

        let parents = [
            Some(self.audio_root.as_path()),
            Some(self.images_root.as_path()),
            self.database_path.parent(),
            self.singers_file.parent(),
        ];

        for dir in parents.into_iter().flatten() {
            if dir.as_os_str().is_empty() || dir.exists() {
                continue;
            }
            std::fs::create_dir_all(dir).map_err(|e| {
                ConfigError::DataDirectoryCreationFailed(dir.display().to_string(), e)
            })?;
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Audio root is not a directory: {0}")]
    AudioRootNotDirectory(String),

    #[error("MAX_UPLOAD_BYTES must be greater than zero")]
    InvalidUploadLimit,

    #[error("MAX_SESSIONS must be greater than zero")]
    InvalidSessionLimit,

    #[error("Failed to create data directory '{0}': {1}")]
    DataDirectoryCreationFailed(String, std::io::Error),
}

/// Initialize the global configuration.
///
/// Should be called once at application startup.
pub fn init() -> &'static Config {
    CONFIG.get_or_init(|| {
        dotenvy::dotenv().ok();
        Config::from_env()
    })
}
