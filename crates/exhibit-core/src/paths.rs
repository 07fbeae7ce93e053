use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const EXHIBIT_DIR: &str = ".exhibit";
pub const CACHE_DIR: &str = "cache";
pub const MEDIA_DIR: &str = "media";
pub const CONFIG_FILE: &str = "config.yaml";
pub const CACHE_DB_FILE: &str = "cache.redb";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `~/.exhibit`, or `None` when no home directory can be resolved.
pub fn default_base_dir() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(EXHIBIT_DIR))
}

pub fn default_config_path() -> Option<PathBuf> {
    default_base_dir().map(|b| b.join(CONFIG_FILE))
}

pub fn default_cache_dir() -> Option<PathBuf> {
    default_base_dir().map(|b| b.join(CACHE_DIR))
}

/// File backing one cached record.
///
/// Keys are built by the crate (`table_<uuid>`, `tenants`, ...) but are
/// sanitised anyway so a foreign key can never escape the cache directory.
pub fn record_path(cache_dir: &Path, key: &str) -> PathBuf {
    cache_dir.join(format!("{}.json", sanitize_key(key)))
}

pub fn media_path(cache_dir: &Path, key: &str) -> PathBuf {
    cache_dir.join(MEDIA_DIR).join(sanitize_key(key))
}

pub fn cache_db_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(CACHE_DB_FILE)
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
