// SPDX-License-Identifier: MIT

use std::time::Duration;

use yare::parameterized;

use super::*;

fn roundtrip<C: Cache>(cache: &C) {
    cache.set("k1", &42u32, Duration::from_secs(60)).unwrap();
    let got: Option<u32> = cache.get("k1").unwrap();
    assert_eq!(got, Some(42));
}

#[parameterized(
    in_memory = { 0 },
    filesystem = { 1 },
)]
fn roundtrips_across_backends(backend: u8) {
    match backend {
        0 => roundtrip(&InMemoryCache::new()),
        _ => {
            let dir = tempfile::tempdir().unwrap();
            roundtrip(&FsCache::new(dir.path()).unwrap());
        }
    }
}

#[test]
fn expired_entry_reads_as_absent() {
    let cache = InMemoryCache::new();
    cache.set_json("k", serde_json::json!(1), Duration::from_millis(0)).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(cache.get_json("k").unwrap(), None);
}

#[test]
fn fs_cache_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = FsCache::new(dir.path()).unwrap();
        cache.set("persisted", &"value", Duration::from_secs(60)).unwrap();
    }
    let reopened = FsCache::new(dir.path()).unwrap();
    let got: Option<String> = reopened.get("persisted").unwrap();
    assert_eq!(got.as_deref(), Some("value"));
}

#[test]
fn delete_removes_entry() {
    let cache = InMemoryCache::new();
    cache.set_json("k", serde_json::json!("v"), Duration::from_secs(60)).unwrap();
    cache.delete("k").unwrap();
    assert_eq!(cache.get_json("k").unwrap(), None);
}
