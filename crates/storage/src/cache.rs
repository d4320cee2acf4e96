// SPDX-License-Identifier: MIT

//! TTL-bounded out-of-core cache (spec.md §6 "World snapshot cache",
//! "Mutation record (durable + cache)"). Two backends: an in-memory map for
//! tests and single-process runs, and a filesystem-backed one that writes a
//! JSON value plus a `.expires` sidecar holding the epoch-ms deadline,
//! giving the same "absent store degrades gracefully" texture spec.md §4.6
//! asks of the cycle mutex without pulling in a new database dependency.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::StorageError;

/// A TTL-bounded key/value cache. Implementations are free to evict eagerly
/// or lazily (on read); callers must treat an expired key the same as an
/// absent one.
pub trait Cache: Send + Sync {
    fn set_json(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StorageError>;
    fn get_json(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed convenience methods layered over the object-safe JSON core.
pub trait CacheExt: Cache {
    fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), StorageError> {
        let json = serde_json::to_value(value).map_err(|source| StorageError::Serde {
            key: key.to_string(),
            source,
        })?;
        self.set_json(key, json, ttl)
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(json) = self.get_json(key)? else {
            return Ok(None);
        };
        let value = serde_json::from_value(json).map_err(|source| StorageError::Serde {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(value))
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

struct Entry {
    value: Value,
    expires_at_ms: u64,
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// In-memory cache backend. Used in tests and by single-process runs that
/// don't care about surviving a restart.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for InMemoryCache {
    fn set_json(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StorageError> {
        self.entries.lock().insert(
            key.to_string(),
            Entry { value, expires_at_ms: now_ms() + ttl.as_millis() as u64 },
        );
        Ok(())
    }

    fn get_json(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if entry.expires_at_ms <= now_ms() {
            entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Filesystem-backed cache: `{dir}/{key}.json` holds the value, a sibling
/// `{dir}/{key}.expires` holds the epoch-ms deadline as plain text.
/// Survives process restarts; read/delete a stale entry lazily.
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(key)))
    }

    fn expires_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.expires", sanitize(key)))
    }
}

/// Cache keys contain `:` (e.g. `ws:snapshot:300`); replace path-hostile
/// characters so the filesystem backend can use the key directly.
fn sanitize(key: &str) -> String {
    key.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io { path: path.display().to_string(), source }
}

impl Cache for FsCache {
    fn set_json(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StorageError> {
        let value_path = self.value_path(key);
        let expires_path = self.expires_path(key);
        let text = serde_json::to_string(&value)
            .map_err(|source| StorageError::Serde { key: key.to_string(), source })?;
        std::fs::write(&value_path, text).map_err(|e| io_err(&value_path, e))?;
        let deadline = now_ms() + ttl.as_millis() as u64;
        std::fs::write(&expires_path, deadline.to_string()).map_err(|e| io_err(&expires_path, e))?;
        Ok(())
    }

    fn get_json(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let value_path = self.value_path(key);
        let expires_path = self.expires_path(key);

        let deadline: u64 = match std::fs::read_to_string(&expires_path) {
            Ok(raw) => raw.trim().parse().unwrap_or(0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&expires_path, e)),
        };
        if deadline <= now_ms() {
            let _ = std::fs::remove_file(&value_path);
            let _ = std::fs::remove_file(&expires_path);
            return Ok(None);
        }

        match std::fs::read_to_string(&value_path) {
            Ok(text) => {
                let value = serde_json::from_str(&text)
                    .map_err(|source| StorageError::Serde { key: key.to_string(), source })?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&value_path, e)),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _ = std::fs::remove_file(self.value_path(key));
        let _ = std::fs::remove_file(self.expires_path(key));
        Ok(())
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
