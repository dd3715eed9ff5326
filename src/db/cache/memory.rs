use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::CacheBackend;
use crate::error::AppResult;

enum Slot {
    Value(String),
    Index(HashSet<String>),
}

struct Entry {
    slot: Slot,
    expires_at: Instant,
}

impl Entry {
    fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process cache backend used when no Redis URL is configured.
///
/// Entries expire lazily: an expired entry is dropped the next time its key
/// is touched. Good enough for a single-instance deployment and for tests;
/// it shares nothing across processes.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn expires_at(ttl: u64) -> Instant {
        Instant::now() + Duration::from_secs(ttl)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(Entry {
                slot: Slot::Value(value),
                ..
            }) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                slot: Slot::Value(value),
                expires_at: Self::expires_at(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn index_add(&self, set_key: &str, member: &str, ttl: u64) -> AppResult<()> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(set_key.to_string())
            .and_modify(|entry| {
                // A leftover value or an expired set is replaced outright.
                let stale = entry.expired() || !matches!(entry.slot, Slot::Index(_));
                if stale {
                    entry.slot = Slot::Index(HashSet::new());
                }
            })
            .or_insert_with(|| Entry {
                slot: Slot::Index(HashSet::new()),
                expires_at: Self::expires_at(ttl),
            });

        entry.expires_at = Self::expires_at(ttl);
        if let Slot::Index(members) = &mut entry.slot {
            members.insert(member.to_string());
        }
        Ok(())
    }

    async fn index_members(&self, set_key: &str) -> AppResult<Vec<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(set_key) {
            Some(entry) if entry.expired() => {
                entries.remove(set_key);
                Ok(Vec::new())
            }
            Some(Entry {
                slot: Slot::Index(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }
}
