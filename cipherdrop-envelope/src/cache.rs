//! Time-boxed cache of decrypted downloads.
//!
//! Decrypted file bytes held for re-download get the same lifetime
//! discipline as the activated private key: an explicit, revocable cache
//! with a TTL, cleared on deactivation — not incidental page state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    plaintext: std::sync::Arc<Vec<u8>>,
    inserted_at: Instant,
}

/// Expiring in-memory cache of opened file contents, keyed by file id.
pub struct OpenFileCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl OpenFileCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn insert(&self, file_id: impl Into<String>, plaintext: Vec<u8>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            file_id.into(),
            CacheEntry {
                plaintext: std::sync::Arc::new(plaintext),
                inserted_at: Instant::now(),
            },
        );
    }

    /// Returns the cached plaintext if present and not expired. An expired
    /// entry is dropped on access.
    pub fn get(&self, file_id: &str) -> Option<std::sync::Arc<Vec<u8>>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(file_id) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                Some(std::sync::Arc::clone(&entry.plaintext))
            }
            Some(_) => {
                entries.remove(file_id);
                None
            }
            None => None,
        }
    }

    pub fn remove(&self, file_id: &str) {
        self.entries.lock().unwrap().remove(file_id);
    }

    /// Drops every entry. Call alongside key deactivation.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Drops entries past their TTL without touching live ones.
    pub fn purge_expired(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, e| e.inserted_at.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Default for OpenFileCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let cache = OpenFileCache::default();
        cache.insert("f1", b"hello".to_vec());

        assert_eq!(cache.get("f1").unwrap().as_slice(), b"hello");
        cache.remove("f1");
        assert!(cache.get("f1").is_none());
    }

    #[test]
    fn expired_entries_are_dropped_on_access() {
        let cache = OpenFileCache::new(Duration::from_millis(0));
        cache.insert("f1", b"hello".to_vec());

        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("f1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let cache = OpenFileCache::default();
        cache.insert("f1", vec![1]);
        cache.insert("f2", vec![2]);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_keeps_live_entries() {
        let cache = OpenFileCache::new(Duration::from_secs(60));
        cache.insert("f1", vec![1]);
        cache.purge_expired();
        assert_eq!(cache.len(), 1);
    }
}
