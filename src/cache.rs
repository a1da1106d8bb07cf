//! Durable request-signature to response store.
//!
//! Responses are grouped by category (`pull`, `reviews`, `user`, ...) and kept
//! in one JSON record file. Nothing is written until [`ResponseCache::flush`]
//! is called, so a crashed run leaves the previous file intact. Downloaded
//! files are stored next to it, named by the SHA-256 of their content.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ReleaseNotesError, Result};

const FILES_CATEGORY: &str = "files";

/// Keyed record file of raw API responses
#[derive(Debug)]
pub struct ResponseCache {
    path: Option<PathBuf>,
    entries: Map<String, Value>,
    dirty: bool,
}

impl ResponseCache {
    /// Load the cache at `path`; an unreadable file starts an empty cache.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Map<String, Value>>(&text) {
                Ok(entries) => {
                    debug!("Loaded cache from {}", path.display());
                    entries
                }
                Err(e) => {
                    warn!("Failed to parse cache {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) => {
                debug!("No cache at {}: {}", path.display(), e);
                Map::new()
            }
        };
        ResponseCache {
            path: Some(path),
            entries,
            dirty: false,
        }
    }

    /// A cache that is never written to disk
    pub fn in_memory() -> Self {
        ResponseCache {
            path: None,
            entries: Map::new(),
            dirty: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, category: &str, key: &str) -> Option<&Value> {
        self.entries.get(category)?.as_object()?.get(key)
    }

    pub fn insert(&mut self, category: &str, key: &str, value: Value) {
        let slot = self
            .entries
            .entry(category.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(map) = slot {
            map.insert(key.to_string(), value);
        }
        self.dirty = true;
    }

    /// Return the cached response, or call `fetch` and remember its result.
    ///
    /// Errors from `fetch` are not cached, so re-running the step retries.
    pub fn get_or_fetch<F>(&mut self, category: &str, key: &str, fetch: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        if let Some(hit) = self.get(category, key) {
            debug!("cache hit {}/{}", category, key);
            return Ok(hit.clone());
        }
        debug!("cache miss {}/{}", category, key);
        let value = fetch()?;
        self.insert(category, key, value.clone());
        Ok(value)
    }

    /// Directory holding downloaded files
    pub fn downloads_dir(&self) -> Option<PathBuf> {
        let parent = self.path.as_ref()?.parent()?;
        Some(parent.join("ghapicache-downloads"))
    }

    /// Previously downloaded content of `url`, if it is still on disk
    pub fn cached_file(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let (Some(dir), Some(name)) = (
            self.downloads_dir(),
            self.get(FILES_CATEGORY, url).and_then(Value::as_str),
        ) else {
            return Ok(None);
        };
        let file = dir.join(name);
        if !file.exists() {
            return Ok(None);
        }
        debug!("Loading {} from cached file {}", url, file.display());
        Ok(Some(fs::read(file)?))
    }

    /// Store downloaded `content` for `url`, named by its content hash.
    pub fn store_file(&mut self, url: &str, content: &[u8], ext: Option<&str>) -> Result<()> {
        let hash = format!("{:x}", Sha256::digest(content));
        let ext = match ext {
            Some(ext) => format!(".{}", ext.rsplit('.').next().unwrap_or(ext)),
            None => url_extension(url),
        };
        let name = format!("{}{}", hash, ext);

        if let Some(dir) = self.downloads_dir() {
            fs::create_dir_all(&dir)?;
            let file = dir.join(&name);
            if !file.exists() {
                fs::write(&file, content)?;
            }
        }
        self.insert(FILES_CATEGORY, url, Value::String(name));
        Ok(())
    }

    /// Write the cache file if anything changed since the last flush.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let Some(path) = &self.path else {
            self.dirty = false;
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&self.entries)?)?;
        fs::rename(&tmp, path)?;
        info!("Saved cache to {}", path.display());
        self.dirty = false;
        Ok(())
    }

    /// Forget every entry and delete the cache file.
    pub fn purge(&mut self) -> Result<()> {
        self.entries.clear();
        self.dirty = false;
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)?;
                info!("Deleted cache file {}", path.display());
            }
        }
        Ok(())
    }
}

/// Anything holding fetched data in memory until it is flushed
pub trait Flush {
    fn flush(&mut self) -> Result<()>;
}

impl Flush for ResponseCache {
    fn flush(&mut self) -> Result<()> {
        ResponseCache::flush(self)
    }
}

/// Flush every store, then return `result` unchanged.
///
/// Stores are flushed on failure too, so a rerun starts from what was
/// already fetched. A flush error replaces `result` only when it was `Ok`.
pub fn flush_all<T, E>(
    result: std::result::Result<T, E>,
    stores: &mut [&mut dyn Flush],
) -> std::result::Result<T, E>
where
    E: From<ReleaseNotesError>,
{
    let mut flushed = Ok(());
    for store in stores.iter_mut() {
        if let Err(e) = store.flush() {
            warn!("Failed to save fetched data: {}", e);
            if flushed.is_ok() {
                flushed = Err(e);
            }
        }
    }
    let value = result?;
    flushed?;
    Ok(value)
}

fn url_extension(url: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or("");
    match file.rfind('.') {
        Some(idx) if idx > 0 => file[idx..].to_string(),
        _ => String::new(),
    }
}
