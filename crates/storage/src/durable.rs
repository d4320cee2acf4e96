// SPDX-License-Identifier: MIT

//! The durable store: mutation records, their source text, the hash-used
//! set, and checkpoint blobs (spec.md §6). Unlike [`crate::cache::Cache`],
//! writes here are meant to survive a crash between write and the next
//! read — the filesystem backend `fsync`s after every write for that
//! reason. A missing durable backend degrades to "absent checkpoint" /
//! "no known hashes yet", never to an error, matching the cycle mutex's
//! documented degrade-to-non-enforcing behavior in spec.md §4.6.

use std::collections::{HashMap, HashSet};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::StorageError;

/// Durable key/value storage plus a set primitive for the hash-used
/// deduplication set (spec.md §4.5 step 11, §6).
pub trait DurableStore: Send + Sync {
    fn set_json(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StorageError>;
    fn get_json(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Add `member` to the set named `key`; returns `true` if it was not
    /// already present.
    fn sadd(&self, key: &str, member: &str) -> Result<bool, StorageError>;

    /// Is `member` present in the set named `key`?
    fn sismember(&self, key: &str, member: &str) -> Result<bool, StorageError>;

    /// Atomic `SET key value NX EX ttl`: write only if the key is absent or
    /// already expired. Returns `true` if this call won the write. This is
    /// the primitive behind the cross-process cycle mutex (spec.md §4.6).
    fn set_json_nx(&self, key: &str, value: Value, ttl: Duration) -> Result<bool, StorageError>;
}

pub trait DurableStoreExt: DurableStore {
    fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_value(value)
            .map_err(|source| StorageError::Serde { key: key.to_string(), source })?;
        self.set_json(key, json, ttl)
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(json) = self.get_json(key)? else {
            return Ok(None);
        };
        let value = serde_json::from_value(json)
            .map_err(|source| StorageError::Serde { key: key.to_string(), source })?;
        Ok(Some(value))
    }
}

impl<D: DurableStore + ?Sized> DurableStoreExt for D {}

struct Entry {
    value: Value,
    expires_at_ms: Option<u64>,
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// In-memory durable store. Tests and single-process ephemeral runs; a
/// restart loses everything, which is fine since spec.md §4.6 only
/// requires the cycle mutex to *degrade* gracefully without a backing
/// store, not to persist across a process with none configured.
#[derive(Default)]
pub struct InMemoryDurableStore {
    entries: Mutex<HashMap<String, Entry>>,
    sets: Mutex<HashMap<String, HashSet<String>>>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for InMemoryDurableStore {
    fn set_json(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StorageError> {
        let expires_at_ms = ttl.map(|d| now_ms() + d.as_millis() as u64);
        self.entries.lock().insert(key.to_string(), Entry { value, expires_at_ms });
        Ok(())
    }

    fn get_json(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if entry.expires_at_ms.is_some_and(|deadline| deadline <= now_ms()) {
            entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn sadd(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        Ok(self.sets.lock().entry(key.to_string()).or_default().insert(member.to_string()))
    }

    fn sismember(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        Ok(self.sets.lock().get(key).is_some_and(|set| set.contains(member)))
    }

    fn set_json_nx(&self, key: &str, value: Value, ttl: Duration) -> Result<bool, StorageError> {
        let mut entries = self.entries.lock();
        let vacant = match entries.get(key) {
            Some(entry) => entry.expires_at_ms.is_some_and(|deadline| deadline <= now_ms()),
            None => true,
        };
        if !vacant {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry { value, expires_at_ms: Some(now_ms() + ttl.as_millis() as u64) });
        Ok(true)
    }
}

/// Filesystem-backed durable store. Values live at `{dir}/{key}.json` with
/// an `.expires` sidecar when a TTL is set; sets live at
/// `{dir}/sets/{key}.json` as a JSON array, rewritten whole on every
/// mutation (set sizes here are small: one hash-used set, bounded
/// mutation counts).
pub struct FsDurableStore {
    dir: PathBuf,
}

impl FsDurableStore {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(dir.join("sets"))?;
        Ok(Self { dir })
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(key)))
    }

    fn expires_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.expires", sanitize(key)))
    }

    fn set_path(&self, key: &str) -> PathBuf {
        self.dir.join("sets").join(format!("{}.json", sanitize(key)))
    }

    fn read_set(&self, key: &str) -> Result<HashSet<String>, StorageError> {
        let path = self.set_path(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|source| StorageError::Serde { key: key.to_string(), source }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    fn write_set(&self, key: &str, set: &HashSet<String>) -> Result<(), StorageError> {
        let path = self.set_path(key);
        let text = serde_json::to_string(set)
            .map_err(|source| StorageError::Serde { key: key.to_string(), source })?;
        write_durable(&path, &text)
    }
}

fn sanitize(key: &str) -> String {
    key.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io { path: path.display().to_string(), source }
}

/// Write `text` to `path` and `fsync` before returning, so a crash right
/// after a durable write can't observe a half-written file.
fn write_durable(path: &Path, text: &str) -> Result<(), StorageError> {
    let mut file = std::fs::File::create(path).map_err(|e| io_err(path, e))?;
    file.write_all(text.as_bytes()).map_err(|e| io_err(path, e))?;
    file.sync_all().map_err(|e| io_err(path, e))?;
    Ok(())
}

impl DurableStore for FsDurableStore {
    fn set_json(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StorageError> {
        let value_path = self.value_path(key);
        let text = serde_json::to_string(&value)
            .map_err(|source| StorageError::Serde { key: key.to_string(), source })?;
        write_durable(&value_path, &text)?;

        let expires_path = self.expires_path(key);
        match ttl {
            Some(ttl) => {
                let deadline = now_ms() + ttl.as_millis() as u64;
                write_durable(&expires_path, &deadline.to_string())?;
            }
            None => {
                let _ = std::fs::remove_file(&expires_path);
            }
        }
        Ok(())
    }

    fn get_json(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let expires_path = self.expires_path(key);
        match std::fs::read_to_string(&expires_path) {
            Ok(raw) => {
                let deadline: u64 = raw.trim().parse().unwrap_or(0);
                if deadline <= now_ms() {
                    let _ = std::fs::remove_file(self.value_path(key));
                    let _ = std::fs::remove_file(&expires_path);
                    return Ok(None);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&expires_path, e)),
        }

        let value_path = self.value_path(key);
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

    fn sadd(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        let mut set = self.read_set(key)?;
        let inserted = set.insert(member.to_string());
        if inserted {
            self.write_set(key, &set)?;
        }
        Ok(inserted)
    }

    fn sismember(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        Ok(self.read_set(key)?.contains(member))
    }

    fn set_json_nx(&self, key: &str, value: Value, ttl: Duration) -> Result<bool, StorageError> {
        // Hold an OS advisory lock on a dedicated guard file for the
        // duration of the check-and-set so two `morphicd` processes racing
        // on the same cycle-lock key can't both win.
        let guard_path = self.dir.join(format!("{}.guard", sanitize(key)));
        let guard_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&guard_path)
            .map_err(|e| io_err(&guard_path, e))?;
        fs2::FileExt::lock_exclusive(&guard_file).map_err(|e| io_err(&guard_path, e))?;

        let result = (|| {
            if self.get_json(key)?.is_some() {
                return Ok(false);
            }
            self.set_json(key, value, Some(ttl))?;
            Ok(true)
        })();

        let _ = fs2::FileExt::unlock(&guard_file);
        result
    }
}

#[cfg(test)]
#[path = "durable_tests.rs"]
mod tests;
