use crate::error::CacheError;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// The four remote lookups. Each one gets its own durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// Display name -> account record.
    Summoner,
    /// Account id -> account record.
    Account,
    /// Account id -> recent match list.
    MatchList,
    /// Match id -> match record with participants.
    Match,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Summoner,
        Operation::Account,
        Operation::MatchList,
        Operation::Match,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Operation::Summoner => "summoners.json",
            Operation::Account => "accounts.json",
            Operation::MatchList => "matches.json",
            Operation::Match => "players.json",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Summoner => "summoner",
            Operation::Account => "account",
            Operation::MatchList => "match-list",
            Operation::Match => "match",
        };
        f.write_str(name)
    }
}

/// Key -> raw successful result, consulted before any live lookup.
///
/// Entries are never evicted or expired. Implementations must tolerate
/// concurrent readers and writers.
pub trait ResponseCache: Send + Sync {
    fn get(&self, op: Operation, key: &str) -> Option<Value>;

    fn put(&self, op: Operation, key: &str, value: Value) -> Result<(), CacheError>;

    fn len(&self, op: Operation) -> usize;

    fn is_empty(&self) -> bool {
        Operation::ALL.iter().all(|op| self.len(*op) == 0)
    }
}

/// Non-durable cache, used by tests and `--no-cache` runs.
#[derive(Default)]
pub struct MemoryCache {
    stores: [DashMap<String, Value>; 4],
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, op: Operation, key: &str) -> Option<Value> {
        self.stores[op.index()].get(key).map(|v| v.value().clone())
    }

    fn put(&self, op: Operation, key: &str, value: Value) -> Result<(), CacheError> {
        self.stores[op.index()].insert(key.to_string(), value);
        Ok(())
    }

    fn len(&self, op: Operation) -> usize {
        self.stores[op.index()].len()
    }
}

struct FileStore {
    path: PathBuf,
    entries: DashMap<String, Value>,
    /// Serializes rewrites of `path`.
    write_lock: Mutex<()>,
}

impl FileStore {
    fn open(path: PathBuf) -> Result<Self, CacheError> {
        let entries = DashMap::new();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
                Ok(map) => {
                    for (key, value) in map {
                        entries.insert(key, value);
                    }
                    debug!(path = %path.display(), entries = entries.len(), "loaded cache store");
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "unreadable cache store, starting empty"
                    );
                }
            }
        }

        Ok(Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    fn persist(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot: BTreeMap<String, Value> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let data = serde_json::to_vec(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// One JSON file per [`Operation`] under a cache directory.
///
/// Every store is loaded eagerly and rewritten in full on each `put`, so a
/// successful lookup is durable before the caller sees it.
pub struct FileCache {
    dir: PathBuf,
    stores: Vec<FileStore>,
}

impl FileCache {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let stores = Operation::ALL
            .iter()
            .map(|op| FileStore::open(dir.join(op.file_name())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dir, stores })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ResponseCache for FileCache {
    fn get(&self, op: Operation, key: &str) -> Option<Value> {
        self.stores[op.index()]
            .entries
            .get(key)
            .map(|v| v.value().clone())
    }

    fn put(&self, op: Operation, key: &str, value: Value) -> Result<(), CacheError> {
        let store = &self.stores[op.index()];
        store.entries.insert(key.to_string(), value);
        store.persist()
    }

    fn len(&self, op: Operation) -> usize {
        self.stores[op.index()].entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = FileCache::open(dir.path()).unwrap();
            cache
                .put(Operation::Match, "42", json!({"participantIdentities": []}))
                .unwrap();
            cache
                .put(Operation::Summoner, "voyboy", json!({"accountId": "acc-1"}))
                .unwrap();
        }

        let cache = FileCache::open(dir.path()).unwrap();
        assert_eq!(
            cache.get(Operation::Summoner, "voyboy"),
            Some(json!({"accountId": "acc-1"}))
        );
        assert!(cache.get(Operation::Match, "42").is_some());
        assert_eq!(cache.len(Operation::Account), 0);
        assert!(dir.path().join("players.json").exists());
    }

    #[test]
    fn stores_are_keyed_per_operation() {
        let cache = MemoryCache::new();
        cache.put(Operation::Account, "x", json!({"name": "X"})).unwrap();
        assert!(cache.get(Operation::Summoner, "x").is_none());
        assert!(!cache.is_empty());
    }

    #[test]
    fn corrupt_store_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("matches.json"), b"{not json").unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        assert_eq!(cache.len(Operation::MatchList), 0);
        cache.put(Operation::MatchList, "a", json!({"matches": []})).unwrap();
        assert_eq!(cache.len(Operation::MatchList), 1);
    }
}
