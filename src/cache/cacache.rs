//! Reader for npm's `_cacache` content-addressable store.
//!
//! Layout:
//!
//! - `index-v5/ab/cd/<rest>` - bucket files named by the SHA-256 of the key.
//!   Each line is `<sha1 of json>\t<json>`; the last entry for a key wins.
//! - `content-v2/<algo>/ab/cd/<rest>` - blobs named by the hex form of their
//!   integrity digest.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{CacheError, PackageCache};

const INDEX_DIR: &str = "index-v5";
const CONTENT_DIR: &str = "content-v2";

#[derive(Debug, Deserialize)]
struct IndexEntry {
    key: String,
    integrity: Option<String>,
}

/// An npm `_cacache` directory.
#[derive(Debug, Clone)]
pub struct Cacache {
    root: PathBuf,
}

impl Cacache {
    /// Opens the cache rooted at `root` (the `_cacache` directory itself).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, key: &str) -> PathBuf {
        let hashed = hex::encode(Sha256::digest(key.as_bytes()));
        sharded(&self.root.join(INDEX_DIR), &hashed)
    }

    fn content_path(&self, integrity: &str) -> Result<PathBuf, CacheError> {
        let invalid = || CacheError::InvalidIntegrity(integrity.to_string());

        // Multiple hashes may be listed; any of them names the same content.
        let first = integrity.split_whitespace().next().ok_or_else(invalid)?;
        let (algorithm, digest) = first.split_once('-').ok_or_else(invalid)?;
        let digest = digest.split('?').next().unwrap_or_default();
        let bytes = STANDARD.decode(digest).map_err(|_| invalid())?;
        if algorithm.is_empty() || bytes.is_empty() {
            return Err(invalid());
        }

        Ok(sharded(
            &self.root.join(CONTENT_DIR).join(algorithm),
            &hex::encode(bytes),
        ))
    }
}

impl PackageCache for Cacache {
    fn resolve_index_entry(&self, key: &str) -> Result<String, CacheError> {
        let bucket = self.bucket_path(key);
        let content = match fs::read_to_string(&bucket) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::EntryNotFound(key.to_string()))
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: bucket.display().to_string(),
                    source,
                })
            }
        };

        parse_bucket(&content)
            .filter(|entry| entry.key == key)
            .last()
            .and_then(|entry| entry.integrity)
            .ok_or_else(|| CacheError::EntryNotFound(key.to_string()))
    }

    fn resolve_tarball_path(&self, integrity: &str) -> Result<PathBuf, CacheError> {
        let path = self.content_path(integrity)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(CacheError::ContentNotFound(integrity.to_string()))
        }
    }
}

/// Splits a hex name into the `ab/cd/rest` directory shards cacache uses.
fn sharded(base: &Path, hex_name: &str) -> PathBuf {
    if hex_name.len() < 5 {
        return base.join(hex_name);
    }
    base.join(&hex_name[..2])
        .join(&hex_name[2..4])
        .join(&hex_name[4..])
}

/// Yields the well-formed entries of a bucket file, oldest first.
fn parse_bucket(content: &str) -> impl Iterator<Item = IndexEntry> + '_ {
    content.lines().filter_map(|line| {
        let (hash, json) = line.split_once('\t')?;
        if hex::encode(Sha1::digest(json.as_bytes())) != hash {
            debug!("skipping corrupt cache index entry");
            return None;
        }
        serde_json::from_str(json).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const INTEGRITY: &str = "sha512-3q2+7w==";

    fn write_entry(cache: &Cacache, key: &str, integrity: Option<&str>) {
        let bucket = cache.bucket_path(key);
        fs::create_dir_all(bucket.parent().unwrap()).unwrap();
        let entry = json!({"key": key, "integrity": integrity, "time": 0}).to_string();
        let hash = hex::encode(Sha1::digest(entry.as_bytes()));
        let mut content = fs::read_to_string(&bucket).unwrap_or_default();
        content.push_str(&format!("\n{}\t{}", hash, entry));
        fs::write(&bucket, content).unwrap();
    }

    fn write_content(cache: &Cacache, integrity: &str, data: &[u8]) -> PathBuf {
        let path = cache.content_path(integrity).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_content_path_layout() {
        let cache = Cacache::new("/cache");
        assert_eq!(cache.root(), Path::new("/cache"));
        // 3q2+7w== decodes to de ad be ef
        let path = cache.content_path(INTEGRITY).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/cache/content-v2/sha512/de/ad/beef")
        );
    }

    #[test]
    fn test_content_path_uses_first_hash() {
        let cache = Cacache::new("/cache");
        let path = cache
            .content_path("sha512-3q2+7w== sha1-AAAA")
            .unwrap();
        assert!(path.starts_with("/cache/content-v2/sha512"));
    }

    #[test]
    fn test_content_path_rejects_garbage() {
        let cache = Cacache::new("/cache");
        for bad in ["", "nodash", "sha512-!!!", "-3q2+7w=="] {
            assert!(
                matches!(cache.content_path(bad), Err(CacheError::InvalidIntegrity(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_resolve_tarball_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cacache::new(dir.path());
        let written = write_content(&cache, INTEGRITY, b"tarball");

        assert_eq!(cache.resolve_tarball_path(INTEGRITY).unwrap(), written);
        assert!(matches!(
            cache.resolve_tarball_path("sha1-AAAAAA=="),
            Err(CacheError::ContentNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_index_entry_last_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cacache::new(dir.path());
        write_entry(&cache, "lodash@4.17.21", Some("sha512-old"));
        write_entry(&cache, "lodash@4.17.21", Some("sha512-new"));

        assert_eq!(
            cache.resolve_index_entry("lodash@4.17.21").unwrap(),
            "sha512-new"
        );
    }

    #[test]
    fn test_resolve_index_entry_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cacache::new(dir.path());
        write_entry(&cache, "gone@1.0.0", Some("sha512-x"));
        write_entry(&cache, "gone@1.0.0", None);

        assert!(matches!(
            cache.resolve_index_entry("gone@1.0.0"),
            Err(CacheError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_index_entry_missing_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cacache::new(dir.path());
        assert!(matches!(
            cache.resolve_index_entry("never@1.0.0"),
            Err(CacheError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_entries_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cacache::new(dir.path());
        write_entry(&cache, "a@1.0.0", Some("sha512-good"));

        let bucket = cache.bucket_path("a@1.0.0");
        let mut content = fs::read_to_string(&bucket).unwrap();
        content.push_str("\ndeadbeef\t{\"key\":\"a@1.0.0\",\"integrity\":\"sha512-bad\"}");
        fs::write(&bucket, content).unwrap();

        assert_eq!(cache.resolve_index_entry("a@1.0.0").unwrap(), "sha512-good");
    }

    #[test]
    fn test_index_then_content_round() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cacache::new(dir.path());
        write_entry(&cache, "react@18.2.0", Some(INTEGRITY));
        let written = write_content(&cache, INTEGRITY, b"react");

        let integrity = cache.resolve_index_entry("react@18.2.0").unwrap();
        assert_eq!(cache.resolve_tarball_path(&integrity).unwrap(), written);
    }
}
