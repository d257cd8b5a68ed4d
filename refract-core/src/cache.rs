// Process-lifetime memoization of transformed output, keyed by source path

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default client cache lifetime: one year in seconds
pub const DEFAULT_MAX_AGE_SECS: u64 = 31_536_000;

/// A cached transform result: response body plus the headers it was stored
/// with (including the caching headers injected at population time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

/// Shared in-memory cache of transformed output.
///
/// Keys are resolved source paths. Entries live for the process lifetime:
/// no eviction, no size bound, no TTL, no invalidation when the underlying
/// file changes. Correctness for long-running processes depends on sources
/// being immutable post-deploy.
///
/// Concurrent first-requests for the same key may each compute and each
/// store; the last write wins. Both writes hold identical content for the
/// same source file, so the race costs duplicate work, not correctness.
/// The lock is held only for the map operation itself, never across I/O.
#[derive(Debug, Default)]
pub struct TransformCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<CacheEntry> {
        self.entries.read().get(path).cloned()
    }

    pub fn store(&self, path: PathBuf, entry: CacheEntry) {
        self.entries.write().insert(path, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Inject the standard caching headers at cache-population time.
///
/// `Expires` is the absolute date `max_age` seconds from now, matching the
/// `Cache-Control: public, max-age=N` directive; `Last-Modified` is the
/// source file's mtime captured at load.
pub fn caching_headers(
    headers: &mut HashMap<String, String>,
    max_age: u64,
    modified: Option<SystemTime>,
) {
    let expires = SystemTime::now() + Duration::from_secs(max_age);
    headers.insert("Expires".to_string(), httpdate::fmt_http_date(expires));
    headers.insert(
        "Cache-Control".to_string(),
        format!("public, max-age={max_age}"),
    );
    if let Some(mtime) = modified {
        headers.insert(
            "Last-Modified".to_string(),
            httpdate::fmt_http_date(mtime),
        );
    }
}
