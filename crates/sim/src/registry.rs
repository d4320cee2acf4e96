// SPDX-License-Identifier: MIT

//! Trait Registry (spec.md §4.4): a canonical-name-keyed table of behavior
//! modules with atomic copy-on-write snapshotting, per-family file
//! retention, and source retention. Writes (`register`, `unregister`) swap
//! in a whole new map; a snapshot handed out before a write stays valid and
//! unaffected by writes that come after it (spec.md §8 "Snapshot
//! stability").

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::traitlang::ast::Module;

/// One registered trait family: its current compiled class, retained
/// source text, and the bounded history of mutation file paths that wrote
/// to it (spec.md §4.4 "family file retention").
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub canonical_name: String,
    pub class_name: String,
    pub module: Arc<Module>,
    pub source: Option<String>,
    /// Oldest first; bounded to `max_versions_kept` entries.
    pub file_paths: Vec<String>,
}

type Entries = Arc<HashMap<String, Arc<RegistryEntry>>>;

/// Atomic copy-on-write map plus a monotonic version counter. Readers call
/// [`Registry::snapshot`] once and iterate the returned `Arc` without
/// observing any writes that happen after the call.
pub struct Registry {
    state: Mutex<(Entries, u64)>,
    max_versions_kept: usize,
}

impl Registry {
    pub fn new(max_versions_kept: u32) -> Self {
        Self {
            state: Mutex::new((Arc::new(HashMap::new()), 0)),
            max_versions_kept: max_versions_kept.max(1) as usize,
        }
    }

    /// Current monotonic version. Increments on every `register`/`unregister`.
    pub fn version(&self) -> u64 {
        self.state.lock().1
    }

    /// A stable point-in-time view of the whole table.
    pub fn snapshot(&self) -> Entries {
        Arc::clone(&self.state.lock().0)
    }

    pub fn get(&self, canonical_name: &str) -> Option<Arc<RegistryEntry>> {
        self.state.lock().0.get(canonical_name).cloned()
    }

    pub fn get_source(&self, canonical_name: &str) -> Option<String> {
        self.state.lock().0.get(canonical_name).and_then(|e| e.source.clone())
    }

    /// Install `module`/`class_name` as the current class for
    /// `canonical_name`, pushing `file_path` onto the family's retention
    /// list. Returns file paths evicted by the `max_trait_versions_kept`
    /// bound (spec.md §4.4); the caller (Patcher) deletes them from disk.
    pub fn register(
        &self,
        canonical_name: &str,
        class_name: &str,
        module: Module,
        file_path: String,
    ) -> Vec<String> {
        let mut guard = self.state.lock();
        let mut entries = (*guard.0).clone();

        let mut file_paths = entries
            .get(canonical_name)
            .map(|e| e.file_paths.clone())
            .unwrap_or_default();
        let source = entries.get(canonical_name).and_then(|e| e.source.clone());

        file_paths.push(file_path);
        let mut evicted = Vec::new();
        while file_paths.len() > self.max_versions_kept {
            evicted.push(file_paths.remove(0));
        }

        entries.insert(
            canonical_name.to_string(),
            Arc::new(RegistryEntry {
                canonical_name: canonical_name.to_string(),
                class_name: class_name.to_string(),
                module: Arc::new(module),
                source,
                file_paths,
            }),
        );

        guard.0 = Arc::new(entries);
        guard.1 += 1;
        evicted
    }

    /// Attach source text to an already-registered family without bumping
    /// the version counter (spec.md §4.4 `register_source`). No-op if the
    /// family isn't registered yet.
    pub fn register_source(&self, canonical_name: &str, source: String) {
        let mut guard = self.state.lock();
        let Some(entry) = guard.0.get(canonical_name) else {
            return;
        };
        let mut updated = (**entry).clone();
        updated.source = Some(source);
        let mut entries = (*guard.0).clone();
        entries.insert(canonical_name.to_string(), Arc::new(updated));
        guard.0 = Arc::new(entries);
    }

    /// Remove a family entirely (spec.md §4.9 Mutation Rollback). Returns
    /// the removed entry's current file paths so the caller can delete
    /// them, and `None` if the family wasn't registered.
    pub fn unregister(&self, canonical_name: &str) -> Option<Vec<String>> {
        let mut guard = self.state.lock();
        let mut entries = (*guard.0).clone();
        let removed = entries.remove(canonical_name)?;
        guard.0 = Arc::new(entries);
        guard.1 += 1;
        Some(removed.file_paths.clone())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
