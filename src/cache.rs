//! Directory-backed response cache.
//!
//! One JSON file per request identity (URL plus all query parameters). The
//! directory outlives a run, so a second run within the TTL reuses bodies
//! without touching the network.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::Result;

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub params: Vec<(String, String)>,
    /// URL the response was finally served from, after redirects.
    pub response_url: String,
    pub status: u16,
    pub body: String,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.stored_at).to_std() {
            Ok(age) => age <= ttl,
            // Stored "in the future" (clock skew): treat as just stored.
            Err(_) => true,
        }
    }
}

pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub async fn open(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        debug!("Response cache at {} (ttl {:?})", dir.display(), ttl);
        Ok(ResponseCache { dir, ttl })
    }

    /// Cache key for a request. Parameter order does not matter.
    pub fn key(url: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        hash_field(&mut hasher, url);
        for (name, value) in sorted {
            hash_field(&mut hasher, name);
            hash_field(&mut hasher, value);
        }
        format!("{:x}", hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Return the stored response when one exists and is still fresh.
    ///
    /// Stale or unreadable entries count as a miss and are removed.
    pub async fn get(&self, url: &str, params: &[(String, String)]) -> Result<Option<CacheEntry>> {
        let path = self.path_for(&Self::key(url, params));
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", path.display(), e);
                self.remove(&path).await;
                return Ok(None);
            }
        };

        if !entry.is_fresh(self.ttl, Utc::now()) {
            debug!("Cache entry for {} expired", url);
            self.remove(&path).await;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Store `entry`, replacing any previous response for the same request.
    ///
    /// Each writer stages into its own temporary file and renames it into
    /// place, so concurrent runs sharing the directory never see a partial
    /// entry.
    pub async fn insert(&self, entry: &CacheEntry) -> Result<()> {
        let path = self.path_for(&Self::key(&entry.url, &entry.params));
        let body = serde_json::to_vec(entry)?;
        let staged = tempfile::Builder::new()
            .prefix(".entry-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?
            .into_temp_path();
        fs::write(&staged, body).await?;
        staged.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Delete every stored entry.
    pub async fn clear(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }

    async fn remove(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            debug!("Could not remove cache entry {}: {}", path.display(), e);
        }
    }
}

/// Length-prefixed, so field boundaries cannot shift between requests.
fn hash_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn entry(url: &str, params: Vec<(String, String)>, stored_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            url: url.to_string(),
            params,
            response_url: url.to_string(),
            status: 200,
            body: "<html></html>".to_string(),
            stored_at,
        }
    }

    #[test]
    fn test_key_ignores_param_order() {
        let a = ResponseCache::key("https://github.com/search", &params(&[("q", "rust"), ("type", "wikis")]));
        let b = ResponseCache::key("https://github.com/search", &params(&[("type", "wikis"), ("q", "rust")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_depends_on_every_param() {
        let a = ResponseCache::key("https://github.com/search", &params(&[("q", "rust"), ("type", "wikis")]));
        let b = ResponseCache::key("https://github.com/search", &params(&[("q", "rust"), ("type", "issues")]));
        let c = ResponseCache::key("https://github.com/search", &params(&[("q", "rust")]));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_key_keeps_field_boundaries() {
        let url = "https://github.com/search";
        assert_ne!(
            ResponseCache::key(url, &params(&[("a", "b=c")])),
            ResponseCache::key(url, &params(&[("a=b", "c")]))
        );
        assert_ne!(
            ResponseCache::key("https://github.com/a", &params(&[("b", "c")])),
            ResponseCache::key("https://github.com/ab", &params(&[("", "c")]))
        );
    }

    #[test]
    fn test_freshness() {
        let now = Utc::now();
        let ttl = Duration::from_secs(300);
        let e = entry("https://github.com/a/b", vec![], now - chrono::Duration::seconds(299));
        assert!(e.is_fresh(ttl, now));
        let e = entry("https://github.com/a/b", vec![], now - chrono::Duration::seconds(301));
        assert!(!e.is_fresh(ttl, now));
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), Duration::from_secs(60)).await.unwrap();
        let stored = entry(
            "https://github.com/search",
            params(&[("q", "rust"), ("type", "repositories")]),
            Utc::now(),
        );
        cache.insert(&stored).await.unwrap();

        let hit = cache
            .get(
                "https://github.com/search",
                &params(&[("type", "repositories"), ("q", "rust")]),
            )
            .await
            .unwrap();
        assert_eq!(hit, Some(stored));
        assert!(cache
            .get("https://github.com/search", &params(&[("q", "go")]))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_stale_entry_is_a_miss_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), Duration::from_secs(60)).await.unwrap();
        let stale = entry(
            "https://github.com/a/b",
            vec![],
            Utc::now() - chrono::Duration::seconds(120),
        );
        cache.insert(&stale).await.unwrap();

        assert!(cache.get("https://github.com/a/b", &[]).await.unwrap().is_none());
        let path = cache.path_for(&ResponseCache::key("https://github.com/a/b", &[]));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), Duration::from_secs(60)).await.unwrap();
        let path = cache.path_for(&ResponseCache::key("https://github.com/a/b", &[]));
        std::fs::write(&path, b"not json").unwrap();

        assert!(cache.get("https://github.com/a/b", &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let stored = entry("https://github.com/a/b", vec![], Utc::now());
        {
            let cache = ResponseCache::open(dir.path(), Duration::from_secs(60)).await.unwrap();
            cache.insert(&stored).await.unwrap();
        }
        let cache = ResponseCache::open(dir.path(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("https://github.com/a/b", &[]).await.unwrap(), Some(stored));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_share_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(ResponseCache::open(dir.path(), Duration::from_secs(60)).await.unwrap());
        let second = Arc::new(ResponseCache::open(dir.path(), Duration::from_secs(60)).await.unwrap());
        let mut stored = entry("https://github.com/search", params(&[("q", "rust")]), Utc::now());
        stored.body = "x".repeat(200 * 1024);
        let stored = Arc::new(stored);

        for _ in 0..50 {
            let writers: Vec<_> = [first.clone(), second.clone()]
                .into_iter()
                .map(|cache| {
                    let stored = stored.clone();
                    tokio::spawn(async move { cache.insert(&stored).await })
                })
                .collect();
            for writer in writers {
                writer.await.unwrap().unwrap();
            }
        }

        let hit = first.get("https://github.com/search", &params(&[("q", "rust")])).await.unwrap();
        assert_eq!(hit.as_ref(), Some(stored.as_ref()));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), Duration::from_secs(60)).await.unwrap();
        cache
            .insert(&entry("https://github.com/a/b", vec![], Utc::now()))
            .await
            .unwrap();
        cache.clear().await.unwrap();
        assert!(cache.get("https://github.com/a/b", &[]).await.unwrap().is_none());
    }
}
