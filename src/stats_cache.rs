//! Time-bounded local cache for provider responses. One JSON file holds all
//! entries, keyed by request URL; each entry records when it was fetched and
//! expires after the TTL the caller passes in. Entries are plain re-fetchable
//! payloads, so last-writer-wins on concurrent updates is acceptable.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "nba_props";
const CACHE_FILE: &str = "stats_cache.json";

static CACHE: Mutex<Option<StatsCacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StatsCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    fetched_at: u64,
}

/// Fresh cached body for the key, or None if absent/expired.
pub fn lookup(key: &str, ttl: Duration) -> Option<String> {
    let mut guard = CACHE.lock().expect("stats cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    let entry = cache.entries.get(key)?;
    let now = system_time_to_secs(SystemTime::now())?;
    if now.saturating_sub(entry.fetched_at) > ttl.as_secs() {
        return None;
    }
    Some(entry.body.clone())
}

pub fn store(key: &str, body: &str) {
    let mut guard = CACHE.lock().expect("stats cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.version = CACHE_VERSION;
    cache.entries.insert(
        key.to_string(),
        CacheEntry {
            body: body.to_string(),
            fetched_at: system_time_to_secs(SystemTime::now()).unwrap_or_default(),
        },
    );
    let _ = save_cache_file(cache);
}

/// Drop every entry, on disk and in memory.
pub fn clear() -> Result<()> {
    let mut guard = CACHE.lock().expect("stats cache lock poisoned");
    *guard = Some(StatsCacheFile {
        version: CACHE_VERSION,
        entries: HashMap::new(),
    });
    if let Some(path) = cache_path() {
        if path.exists() {
            fs::remove_file(&path).context("remove stats cache")?;
        }
    }
    Ok(())
}

fn load_cache_file() -> StatsCacheFile {
    let Some(path) = cache_path() else {
        return StatsCacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return StatsCacheFile::default();
    };
    let cache = serde_json::from_str::<StatsCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return StatsCacheFile::default();
    }
    cache
}

fn save_cache_file(cache: &StatsCacheFile) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize stats cache")?;
    fs::write(&tmp, json).context("write stats cache")?;
    fs::rename(&tmp, &path).context("swap stats cache")?;
    Ok(())
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}
