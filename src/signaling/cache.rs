//! On-disk endpoint cache: `./.SignalingCache_v0`, CSV, capped at 32 entries.
//!
//! Grounded in `original_source/src/source/signaling/signaling_fsm.c`'s
//! channel-endpoint cache and the teacher's own append-then-rewrite style
//! used by `external_ip_mapper` for its discovered-mapping file (the same
//! "corrupt file, start clean" recovery strategy is used here).

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const MAX_ENTRIES: usize = 32;
const CACHE_HEADER_FIELDS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Viewer,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "Master",
            Role::Viewer => "Viewer",
        }
    }

    fn parse(s: &str) -> Option<Role> {
        match s {
            "Master" => Some(Role::Master),
            "Viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub channel_name: String,
    pub role: Role,
    pub region: String,
    pub channel_arn: String,
    pub https_endpoint: String,
    pub wss_endpoint: String,
    pub creation_ts_epoch_seconds: u64,
}

impl CacheEntry {
    fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}\n",
            self.channel_name,
            self.role.as_str(),
            self.region,
            self.channel_arn,
            self.https_endpoint,
            self.wss_endpoint,
            self.creation_ts_epoch_seconds,
        )
    }

    fn parse_line(line: &str) -> Option<CacheEntry> {
        let fields: Vec<&str> = line.splitn(CACHE_HEADER_FIELDS, ',').collect();
        if fields.len() != CACHE_HEADER_FIELDS {
            return None;
        }
        let role = Role::parse(fields[1])?;
        let creation_ts_epoch_seconds = fields[6].trim_end().parse::<u64>().ok()?;
        Some(CacheEntry {
            channel_name: fields[0].to_owned(),
            role,
            region: fields[2].to_owned(),
            channel_arn: fields[3].to_owned(),
            https_endpoint: fields[4].to_owned(),
            wss_endpoint: fields[5].to_owned(),
            creation_ts_epoch_seconds,
        })
    }
}

/// A handle on the cache file. Every mutating call reads, mutates, and
/// rewrites the whole file; at 32 entries max this is cheap and keeps the
/// on-disk format always fully materialized (append-then-rewrite per spec).
pub struct SignalingCache {
    path: PathBuf,
}

impl SignalingCache {
    pub fn new(path: impl AsRef<Path>) -> SignalingCache {
        SignalingCache { path: path.as_ref().to_path_buf() }
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("./.SignalingCache_v0")
    }

    /// Loads every entry currently on disk. A corrupt line anywhere in the
    /// file invalidates the whole file: it's deleted and an empty cache is
    /// returned, matching the "invalid lines cause the file to be deleted"
    /// rule rather than silently dropping just the bad line.
    async fn load_all(&self) -> Vec<CacheEntry> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        let mut entries = Vec::new();
        for line in contents.lines() {
            if line.is_empty() {
                continue;
            }
            match CacheEntry::parse_line(line) {
                Some(entry) => entries.push(entry),
                None => {
                    let _ = fs::remove_file(&self.path).await;
                    return Vec::new();
                }
            }
        }
        entries
    }

    async fn write_all(&self, entries: &[CacheEntry]) -> std::io::Result<()> {
        let mut buf = String::new();
        for entry in entries {
            buf.push_str(&entry.to_line());
        }
        let tmp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        fs::rename(&tmp_path, &self.path).await
    }

    /// Looks up the freshest entry matching (channel, region, role), if any.
    pub async fn load(&self, channel_name: &str, region: &str, role: Role) -> Option<CacheEntry> {
        self.load_all()
            .await
            .into_iter()
            .filter(|e| e.channel_name == channel_name && e.region == region && e.role == role)
            .max_by_key(|e| e.creation_ts_epoch_seconds)
    }

    /// Saves an entry, replacing any existing one with the same
    /// (channel, region, role) key, evicting the oldest entry if the cache
    /// is full and the key is new. Invariant #9: a `load` immediately after
    /// `save` for the same key returns exactly what was saved, unless a
    /// later `save` for that key overwrote it first.
    pub async fn save(&self, entry: CacheEntry) -> std::io::Result<()> {
        let mut entries = self.load_all().await;
        entries.retain(|e| !(e.channel_name == entry.channel_name && e.region == entry.region && e.role == entry.role));

        if entries.len() >= MAX_ENTRIES {
            if let Some((oldest_idx, _)) = entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.creation_ts_epoch_seconds)
            {
                entries.remove(oldest_idx);
            }
        }
        entries.push(entry);
        self.write_all(&entries).await
    }

    pub async fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod cache_test {
    use super::*;

    fn tmp_cache() -> (SignalingCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".SignalingCache_v0");
        (SignalingCache::new(path), dir)
    }

    fn sample(channel: &str, ts: u64) -> CacheEntry {
        CacheEntry {
            channel_name: channel.to_owned(),
            role: Role::Master,
            region: "us-west-2".to_owned(),
            channel_arn: "arn:aws:example".to_owned(),
            https_endpoint: "https://example.test".to_owned(),
            wss_endpoint: "wss://example.test".to_owned(),
            creation_ts_epoch_seconds: ts,
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (cache, _dir) = tmp_cache();
        let entry = sample("chan-a", 1000);
        cache.save(entry.clone()).await.unwrap();
        let loaded = cache.load("chan-a", "us-west-2", Role::Master).await.unwrap();
        assert_eq!(loaded, entry);
    }

    #[tokio::test]
    async fn save_overwrites_same_key() {
        let (cache, _dir) = tmp_cache();
        cache.save(sample("chan-a", 1000)).await.unwrap();
        let newer = sample("chan-a", 2000);
        cache.save(newer.clone()).await.unwrap();
        let loaded = cache.load("chan-a", "us-west-2", Role::Master).await.unwrap();
        assert_eq!(loaded, newer);
    }

    #[tokio::test]
    async fn load_misses_return_none() {
        let (cache, _dir) = tmp_cache();
        assert!(cache.load("nope", "us-west-2", Role::Master).await.is_none());
    }

    #[tokio::test]
    async fn cap_evicts_oldest_entry() {
        let (cache, _dir) = tmp_cache();
        for i in 0..MAX_ENTRIES {
            cache.save(sample(&format!("chan-{i}"), i as u64)).await.unwrap();
        }
        cache.save(sample("chan-new", MAX_ENTRIES as u64)).await.unwrap();
        assert!(cache.load("chan-0", "us-west-2", Role::Master).await.is_none());
        assert!(cache.load("chan-new", "us-west-2", Role::Master).await.is_some());
    }

    #[tokio::test]
    async fn corrupt_file_is_deleted_and_treated_as_empty() {
        let (cache, _dir) = tmp_cache();
        fs::write(&cache.path, b"not,enough,fields\n").await.unwrap();
        assert!(cache.load("chan-a", "us-west-2", Role::Master).await.is_none());
        assert!(fs::metadata(&cache.path).await.is_err());
    }
}
