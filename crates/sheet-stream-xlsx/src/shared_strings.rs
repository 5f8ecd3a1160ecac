//! Lazily indexed shared string table
//!
//! The shared string part of a large workbook can hold millions of items, so it
//! is never parsed up front. The first lookup copies the part to a temporary
//! file and records the byte span of every `<si>` item; after that each miss
//! costs one seek plus one bounded read. Resolved strings are kept in a bounded
//! LRU cache.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use once_cell::sync::OnceCell;

use crate::archive::PackageArchive;
use crate::error::XlsxResult;
use crate::scan::{ElementPattern, ScanOptions, Span};
use crate::store::IndexedPart;
use crate::text::item_text;

/// Default number of strings kept in the cache
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

/// Snapshot of the table's cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to read the temporary copy
    pub misses: u64,
    /// Times the offset index was built (0 or 1)
    pub index_builds: u64,
    /// Strings currently cached
    pub cached: usize,
    pub capacity: usize,
    /// Items in the part, 0 until the index exists
    pub total_strings: usize,
    /// Rough heap footprint of the index plus cached strings
    pub estimated_bytes: usize,
}

/// The package's shared string table.
///
/// Cheap to create: nothing is read until [`SharedStringTable::get`],
/// [`SharedStringTable::len`] or [`SharedStringTable::warm_up`] is called.
pub struct SharedStringTable {
    archive: Arc<dyn PackageArchive>,
    path: Option<String>,
    options: ScanOptions,
    indexed: OnceCell<IndexedPart>,
    cache: Mutex<LruCache<usize, String>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    index_builds: AtomicU64,
}

impl SharedStringTable {
    /// Create a table over `path`, or an always-empty table when `path` is `None`
    pub fn new(archive: Arc<dyn PackageArchive>, path: Option<String>, options: ScanOptions) -> Self {
        Self::with_capacity(archive, path, options, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a table with a custom cache capacity (at least 1)
    pub fn with_capacity(
        archive: Arc<dyn PackageArchive>,
        path: Option<String>,
        options: ScanOptions,
        capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            archive,
            path: path.filter(|p| !p.is_empty()),
            options,
            indexed: OnceCell::new(),
            cache: Mutex::new(LruCache::new(capacity)),
            capacity: capacity.get(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            index_builds: AtomicU64::new(0),
        }
    }

    /// Check whether the package has a shared string part at all
    pub fn has_shared_strings(&self) -> bool {
        self.path.is_some()
    }

    /// Resolve a 0-based string id.
    ///
    /// Unknown ids and packages without shared strings yield an empty string.
    /// Errors only come from reading the part or its temporary copy.
    pub fn get(&self, id: usize) -> XlsxResult<String> {
        if let Some(value) = self.lock_cache().get(&id).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let Some(part) = self.part()? else {
            return Ok(String::new());
        };

        let Some(markup) = part.read_unit(id)? else {
            return Ok(String::new());
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = item_text(&markup);
        self.lock_cache().put(id, value.clone());
        Ok(value)
    }

    /// Number of items in the part (builds the index)
    pub fn len(&self) -> XlsxResult<usize> {
        Ok(self.part()?.map_or(0, |part| part.index().len()))
    }

    pub fn is_empty(&self) -> XlsxResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Preload ids `0..count` (clamped to the number of items)
    pub fn warm_up(&self, count: usize) -> XlsxResult<()> {
        let count = count.min(self.len()?);
        for id in 0..count {
            self.get(id)?;
        }
        Ok(())
    }

    /// Drop every cached string
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Evict least recently used strings until at most `keep` remain
    pub fn trim_cache(&self, keep: usize) {
        let mut cache = self.lock_cache();
        while cache.len() > keep {
            if cache.pop_lru().is_none() {
                break;
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (cached, cached_bytes) = {
            let cache = self.lock_cache();
            let bytes = cache
                .iter()
                .map(|(_, s)| s.capacity() + std::mem::size_of::<(usize, String)>())
                .sum::<usize>();
            (cache.len(), bytes)
        };
        let total_strings = self.indexed.get().map_or(0, |part| part.index().len());

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            index_builds: self.index_builds.load(Ordering::Relaxed),
            cached,
            capacity: self.capacity,
            total_strings,
            estimated_bytes: total_strings * std::mem::size_of::<Span>() + cached_bytes,
        }
    }

    /// The indexed copy of the part, built on first use
    fn part(&self) -> XlsxResult<Option<&IndexedPart>> {
        let Some(path) = self.path.as_deref() else {
            return Ok(None);
        };
        let part = self.indexed.get_or_try_init(|| {
            IndexedPart::build(
                &*self.archive,
                path,
                ElementPattern::shared_item(),
                &self.options,
            )
            .map(|part| {
                self.index_builds.fetch_add(1, Ordering::Relaxed);
                part
            })
        })?;
        Ok(Some(part))
    }

    fn lock_cache(&self) -> MutexGuard<'_, LruCache<usize, String>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SharedStringTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStringTable")
            .field("path", &self.path)
            .field("indexed", &self.indexed.get().is_some())
            .field("stats", &self.stats())
            .finish()
    }
}
