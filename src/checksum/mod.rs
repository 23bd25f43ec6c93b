//! Checksum resolution for cached npm tarballs.
//!
//! A dependency's checksums are computed from the tarball npm stored in its
//! cache. The tarball is found by integrity; when npm did not report one, the
//! integrity is first looked up in the cache index by `name@version`.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use md5::Md5;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::cache::{CacheError, PackageCache};

/// Hex-encoded digests of a dependency tarball.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Checksums {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

/// Errors that can occur while computing a dependency's checksums.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to hash {path}: {source}")]
    Hash {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Computes MD5, SHA-1 and SHA-256 of a file in one pass.
pub fn hash_file(path: &Path) -> io::Result<Checksums> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut md5 = Md5::new();
    let mut sha1 = Sha1::new();
    let mut sha256 = Sha256::new();

    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        md5.update(&buffer[..read]);
        sha1.update(&buffer[..read]);
        sha256.update(&buffer[..read]);
    }

    Ok(Checksums {
        md5: hex::encode(md5.finalize()),
        sha1: hex::encode(sha1.finalize()),
        sha256: hex::encode(sha256.finalize()),
    })
}

/// Resolves a dependency's tarball through `cache` and hashes it.
///
/// # Arguments
///
/// * `cache` - The npm cache to look the tarball up in
/// * `name` - Package name
/// * `version` - Installed version
/// * `integrity` - The integrity npm reported, or empty
///
/// # Errors
///
/// Fails when the index has no `name@version` entry (only consulted for an
/// empty integrity), when no tarball is stored under the integrity, or when
/// the tarball cannot be read.
///
/// # Example
///
/// ```ignore
/// use npm_buildinfo::cache::Cacache;
/// use npm_buildinfo::checksum::calculate_checksums;
///
/// let cache = Cacache::new("/home/me/.npm/_cacache");
/// let sums = calculate_checksums(&cache, "lodash", "4.17.21", "")?;
/// println!("{}", sums.sha256);
/// ```
pub fn calculate_checksums(
    cache: &dyn PackageCache,
    name: &str,
    version: &str,
    integrity: &str,
) -> Result<Checksums, ChecksumError> {
    let integrity = if integrity.is_empty() {
        cache.resolve_index_entry(&format!("{}@{}", name, version))?
    } else {
        integrity.to_string()
    };

    let path = cache.resolve_tarball_path(&integrity)?;
    hash_file(&path).map_err(|source| ChecksumError::Hash {
        path: path.display().to_string(),
        source,
    })
}
