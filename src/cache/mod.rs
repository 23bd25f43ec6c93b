//! Access to npm's local package cache.
//!
//! The checksum resolver only needs two lookups from the cache, expressed by
//! [`PackageCache`]. [`Cacache`] implements them over npm's on-disk
//! `_cacache` directory.

mod cacache;

use std::path::PathBuf;

pub use cacache::Cacache;

/// Errors that can occur while looking something up in the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No index entry exists for the key.
    #[error("no cache index entry for '{0}'")]
    EntryNotFound(String),

    /// No content is stored under the integrity.
    #[error("no cached content for integrity '{0}'")]
    ContentNotFound(String),

    /// The integrity is not an `algorithm-base64digest` string.
    #[error("invalid integrity '{0}'")]
    InvalidIntegrity(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The two cache lookups needed to find a dependency's tarball.
pub trait PackageCache {
    /// Returns the integrity stored under an index key such as `name@version`.
    fn resolve_index_entry(&self, key: &str) -> Result<String, CacheError>;

    /// Returns the path of the content stored under an integrity.
    fn resolve_tarball_path(&self, integrity: &str) -> Result<PathBuf, CacheError>;
}
