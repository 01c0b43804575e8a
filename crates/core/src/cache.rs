//! Content-addressed cache for extraction results.
//!
//! Keys are SHA-256 digests over the input bytes and the serialized
//! [`ExtractionParams`], so the same file extracted with a different method,
//! language or resolution is a different entry. The cache itself is a
//! bounded LRU; callers own synchronization.

use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::pages::{Extraction, ExtractionParams};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash input bytes together with the parameters that shape the output.
pub fn cache_key(bytes: &[u8], params: &ExtractionParams) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
    // Struct fields serialize in declaration order, which keeps this stable.
    let params = serde_json::to_vec(params).unwrap_or_default();
    hasher.update(&params);
    CacheKey(format!("{:x}", hasher.finalize()))
}

/// Bounded least-recently-used map from [`CacheKey`] to [`Extraction`].
pub struct ExtractionCache {
    entries: LruCache<CacheKey, Extraction>,
}

impl ExtractionCache {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ExtractionCache {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up an entry, marking it as most recently used.
    pub fn get(&mut self, key: &CacheKey) -> Option<&Extraction> {
        self.entries.get(key)
    }

    /// Insert an entry, evicting the least recently used one when full.
    pub fn insert(&mut self, key: CacheKey, extraction: Extraction) {
        self.entries.put(key, extraction);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl fmt::Debug for ExtractionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
