use moka::sync::Cache;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::fs;
use tracing::debug;

/// How long cached file metadata is trusted before a full re-read.
const DEFAULT_STALENESS: Duration = Duration::from_secs(3600);

/// Validator metadata for a served file.
#[derive(Clone, Debug)]
pub struct FileMeta {
    /// Hex-encoded SHA-256 of the file contents, used as the HTTP validator.
    pub digest: String,
    /// Filesystem modification time at the last full read.
    pub modified: SystemTime,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    meta: FileMeta,
    verified_at: Instant,
}

/// Content-hash cache over the served files.
///
/// One entry per distinct path ever served, overwritten on every full
/// re-read and never explicitly evicted. Metadata is trusted for the
/// staleness window; the body is always read from disk so responses never
/// serve stale bytes. Concurrent readers racing on the same path may each
/// perform a redundant read.
pub struct ContentCache {
    entries: Cache<PathBuf, CacheEntry>,
    staleness: Duration,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::with_staleness(DEFAULT_STALENESS)
    }

    pub fn with_staleness(staleness: Duration) -> Self {
        Self {
            entries: Cache::builder().max_capacity(100_000).build(),
            staleness,
        }
    }

    /// Cached metadata for `path`, if the entry is still within the
    /// staleness window. Does not touch the filesystem, so callers that
    /// only need a validator decision can skip the body read entirely.
    pub fn fresh_meta(&self, path: &Path) -> Option<FileMeta> {
        let entry = self.entries.get(path)?;
        (entry.verified_at.elapsed() <= self.staleness).then(|| entry.meta)
    }

    /// Read `path` and return its bytes plus validator metadata.
    ///
    /// A fresh entry reuses the cached digest and modification time while
    /// still reading the current bytes; a stale or missing entry triggers a
    /// full read-stat-hash and overwrites the entry. Read failures are
    /// returned to the caller without evicting whatever entry other readers
    /// may be using.
    pub async fn resolve(&self, path: &Path) -> std::io::Result<(Vec<u8>, FileMeta)> {
        if let Some(meta) = self.fresh_meta(path) {
            let bytes = fs::read(path).await?;
            return Ok((bytes, meta));
        }

        let bytes = fs::read(path).await?;
        let modified = fs::metadata(path).await?.modified()?;
        let meta = FileMeta {
            digest: hex_digest(&bytes),
            modified,
        };
        debug!(path = %path.display(), digest = %meta.digest, "content cache refreshed");
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                meta: meta.clone(),
                verified_at: Instant::now(),
            },
        );
        Ok((bytes, meta))
    }

    /// Number of paths currently cached.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn validator_is_stable_within_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.txt", "one");
        let cache = ContentCache::new();

        let (bytes, first) = cache.resolve(&path).await.unwrap();
        assert_eq!(bytes, b"one");

        // Metadata stays cached even though the bytes on disk changed.
        std::fs::write(&path, "two").unwrap();
        let (bytes, second) = cache.resolve(&path).await.unwrap();
        assert_eq!(second.digest, first.digest);
        assert_eq!(bytes, b"two");
    }

    #[tokio::test]
    async fn validator_refreshes_once_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.txt", "one");
        let cache = ContentCache::with_staleness(Duration::ZERO);

        let (_, first) = cache.resolve(&path).await.unwrap();
        std::fs::write(&path, "two").unwrap();
        let (bytes, second) = cache.resolve(&path).await.unwrap();

        assert_ne!(second.digest, first.digest);
        assert_eq!(bytes, b"two");
    }

    #[tokio::test]
    async fn read_failure_leaves_the_entry_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.txt", "one");
        let cache = ContentCache::new();

        let (_, meta) = cache.resolve(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(cache.resolve(&path).await.is_err());
        let cached = cache.fresh_meta(&path).expect("entry must survive the failed read");
        assert_eq!(cached.digest, meta.digest);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new();
        let err = cache.resolve(&dir.path().join("nope.txt")).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
