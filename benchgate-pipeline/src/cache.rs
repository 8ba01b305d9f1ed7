//! Dependency cache keys and the local cache store.
//!
//! The key is `<platform>-cargo-<digest>` where the digest covers every
//! `Cargo.lock` under the workspace. Any lockfile change, or a different
//! platform, yields a different key.

use crate::error::CacheError;
use crate::workflow::Platform;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCKFILE: &str = "Cargo.lock";

/// Cache key for `platform` given a lockfile digest.
pub fn cache_key(platform: &Platform, lockfile_digest: &str) -> String {
    format!("{platform}-cargo-{lockfile_digest}")
}

/// Hex SHA-256 over the digests of every `Cargo.lock` below `root`, taken
/// in sorted path order. Empty when there is no lockfile. `target` and
/// hidden directories are not searched.
pub fn lockfile_digest(root: &Path) -> Result<String, CacheError> {
    let mut lockfiles = Vec::new();
    collect_lockfiles(root, &mut lockfiles)?;
    if lockfiles.is_empty() {
        return Ok(String::new());
    }
    lockfiles.sort();

    let mut combined = Sha256::new();
    for path in &lockfiles {
        let contents = fs::read(path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        combined.update(Sha256::digest(&contents));
    }
    debug!(root = %root.display(), files = lockfiles.len(), "hashed lockfiles");
    Ok(format!("{:x}", combined.finalize()))
}

fn collect_lockfiles(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CacheError> {
    let io = |source| CacheError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io)? {
        let entry = entry.map_err(io)?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if entry.file_type().map_err(io)?.is_dir() {
            if !name.starts_with('.') && name != "target" {
                collect_lockfiles(&path, out)?;
            }
        } else if name == LOCKFILE {
            out.push(path);
        }
    }
    Ok(())
}

/// Result of a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// An entry exists for the key.
    Hit,
    /// No entry for the key.
    Miss,
}

/// Marker-file cache under a local directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Cache rooted at `dir` (created on first save).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Marker path for `key`: a single component inside `dir`. Characters
    /// outside `[A-Za-z0-9._-]` become `_`, and a leading dot gets a `_`
    /// prefix.
    fn entry(&self, key: &str) -> PathBuf {
        let mut name: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
                _ => '_',
            })
            .collect();
        if name.is_empty() || name.starts_with('.') {
            name.insert(0, '_');
        }
        self.dir.join(name)
    }

    /// Look up `key`.
    pub fn restore(&self, key: &str) -> CacheOutcome {
        if self.entry(key).is_file() {
            CacheOutcome::Hit
        } else {
            CacheOutcome::Miss
        }
    }

    /// Record `key`.
    pub fn save(&self, key: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.entry(key);
        fs::write(&path, chrono::Utc::now().to_rfc3339())
            .map_err(|source| CacheError::Io { path, source })
    }
}
