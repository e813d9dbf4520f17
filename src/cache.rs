//! Response cache with per-resource expiry windows.
//!
//! Entries are checked lazily on read; there is no background sweep.

use indexmap::IndexMap;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

pub const DOGS_WINDOW: Duration = Duration::from_secs(30 * 60);
pub const REFERENCE_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// The three REST collections the dashboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Resource {
    Dogs,
    Breeds,
    RescueTypes,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Dogs, Resource::Breeds, Resource::RescueTypes];

    /// Cache key and URL path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Dogs => "dogs",
            Resource::Breeds => "breeds",
            Resource::RescueTypes => "rescue-types",
        }
    }

    /// Reference lists change far less often than animal records.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Resource::Dogs)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    fetched_at: Instant,
}

/// Diagnostics for one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryStatus {
    pub has_data: bool,
    pub is_valid: bool,
    pub age: Duration,
    pub duration: Duration,
    /// Element count when the payload is a JSON array.
    pub count: Option<usize>,
}

pub struct ResponseCache {
    entries: IndexMap<Resource, CacheEntry>,
    dogs_window: Duration,
    reference_window: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_windows(DOGS_WINDOW, REFERENCE_WINDOW)
    }

    pub fn with_windows(dogs_window: Duration, reference_window: Duration) -> Self {
        Self {
            entries: IndexMap::new(),
            dogs_window,
            reference_window,
        }
    }

    pub fn expiry(&self, key: Resource) -> Duration {
        if key.is_reference() {
            self.reference_window
        } else {
            self.dogs_window
        }
    }

    /// Payload for `key` if present and younger than its expiry window.
    pub fn get(&self, key: Resource) -> Option<&Value> {
        let entry = self.entries.get(&key)?;
        if entry.fetched_at.elapsed() < self.expiry(key) {
            debug!("Using cached data for: {}", key);
            Some(&entry.payload)
        } else {
            debug!("Cached data for {} has expired", key);
            None
        }
    }

    pub fn set(&mut self, key: Resource, payload: Value) {
        self.set_at(key, payload, Instant::now());
    }

    pub(crate) fn set_at(&mut self, key: Resource, payload: Value, fetched_at: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                payload,
                fetched_at,
            },
        );
        debug!("Cached data for: {}", key);
    }

    pub fn invalidate(&mut self, key: Resource) {
        if self.entries.shift_remove(&key).is_some() {
            info!("Cleared cache for: {}", key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        info!("API cache cleared");
    }

    /// True when at least one entry holds data inside its window.
    pub fn has_valid_entry(&self) -> bool {
        self.status().values().any(|s| s.has_data && s.is_valid)
    }

    pub fn status(&self) -> IndexMap<Resource, EntryStatus> {
        self.entries
            .iter()
            .map(|(key, entry)| {
                let age = entry.fetched_at.elapsed();
                let duration = self.expiry(*key);
                let status = EntryStatus {
                    has_data: !entry.payload.is_null(),
                    is_valid: age < duration,
                    age,
                    duration,
                    count: entry.payload.as_array().map(Vec::len),
                };
                (*key, status)
            })
            .collect()
    }
}
