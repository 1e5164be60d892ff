use std::env;
use std::path::PathBuf;

/// Runtime configuration for the gallery
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Database connection string (default: "sqlite://gallery.db?mode=rwc")
    pub database_url: String,

    /// Directory holding uploaded images (default: "output")
    pub upload_dir: PathBuf,

    /// Maximum upload size in bytes (default: 16 MB)
    pub max_file_size: usize,

    /// Lowercase extensions accepted for upload
    pub allowed_extensions: Vec<String>,

    /// Probes the allocator makes before giving up (default: 1000)
    pub max_allocation_attempts: u32,
}

pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://gallery.db?mode=rwc".to_string(),
            upload_dir: PathBuf::from("output"),
            max_file_size: 16 * 1024 * 1024, // 16 MB
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            max_allocation_attempts: 1000,
        }
    }
}

impl GalleryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            allowed_extensions: env::var("ALLOWED_EXTENSIONS")
                .ok()
                .map(|v| parse_extension_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or(default.allowed_extensions),

            max_allocation_attempts: env::var("MAX_ALLOCATION_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default.max_allocation_attempts),
        }
    }

    /// Create config for local development and tests: in-memory database,
    /// uploads under the given directory
    pub fn development(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            upload_dir: upload_dir.into(),
            ..Self::default()
        }
    }
}

fn parse_extension_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
