use crate::frame::{DecodeError, DecodedFrame};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Default cache budget: 512 MiB of decoded pixel data.
pub const DEFAULT_CACHE_BUDGET: usize = 512 * 1024 * 1024;

/// Key for one decoded slice: (series identifier, slice index).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub series: String,
    pub index: usize,
}

impl CacheKey {
    pub fn new(series: impl Into<String>, index: usize) -> Self {
        Self {
            series: series.into(),
            index,
        }
    }
}

struct CacheEntry {
    frame: Arc<DecodedFrame>,
    bytes: usize,
}

struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    /// LRU order: front = oldest, back = most recently used.
    order: Vec<CacheKey>,
    total_bytes: usize,
}

/// Bounded decode cache for single-slice viewing.
///
/// All operations serialize on one mutex so the touch-then-possibly-evict
/// bookkeeping is strictly ordered. The byte budget counts pixel buffers
/// only (width × height × 2 per frame); a single entry larger than the
/// whole budget is still inserted and becomes the next eviction candidate.
pub struct FrameCache {
    inner: Mutex<CacheInner>,
    budget: usize,
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCache {
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_CACHE_BUDGET)
    }

    pub fn with_budget(budget: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: Vec::new(),
                total_bytes: 0,
            }),
            budget,
        }
    }

    /// Cached frame for `key`, decoding and inserting on a miss. A hit
    /// marks the entry most recently used. Decode errors propagate and
    /// leave the cache untouched.
    pub fn get_or_decode(
        &self,
        key: &CacheKey,
        decode: impl FnOnce() -> Result<DecodedFrame, DecodeError>,
    ) -> Result<Arc<DecodedFrame>, DecodeError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = inner.entries.get(key) {
            let frame = Arc::clone(&entry.frame);
            Self::touch(&mut inner, key);
            return Ok(frame);
        }

        let frame = Arc::new(decode()?);
        Self::insert_locked(&mut inner, self.budget, key.clone(), Arc::clone(&frame));
        Ok(frame)
    }

    /// Insert an already decoded frame (prefetch path).
    pub fn insert(&self, key: CacheKey, frame: DecodedFrame) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Self::insert_locked(&mut inner, self.budget, key, Arc::new(frame));
    }

    /// Existence check that does not disturb LRU order.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.contains_key(key)
    }

    /// Evict every entry belonging to one series.
    pub fn clear_series(&self, series: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let keys: Vec<CacheKey> = inner
            .entries
            .keys()
            .filter(|key| key.series == series)
            .cloned()
            .collect();
        for key in &keys {
            if let Some(entry) = inner.entries.remove(key) {
                inner.total_bytes -= entry.bytes;
            }
        }
        inner.order.retain(|key| key.series != series);
    }

    /// Current pixel-byte total across all entries.
    pub fn total_bytes(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.total_bytes
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn touch(inner: &mut CacheInner, key: &CacheKey) {
        inner.order.retain(|k| k != key);
        inner.order.push(key.clone());
    }

    fn insert_locked(
        inner: &mut CacheInner,
        budget: usize,
        key: CacheKey,
        frame: Arc<DecodedFrame>,
    ) {
        let bytes = frame.byte_len();
        if let Some(previous) = inner.entries.remove(&key) {
            inner.total_bytes -= previous.bytes;
            inner.order.retain(|k| k != &key);
        }

        // Evict oldest-first until the new entry fits or nothing is left.
        while inner.total_bytes + bytes > budget && !inner.order.is_empty() {
            let oldest = inner.order.remove(0);
            if let Some(evicted) = inner.entries.remove(&oldest) {
                inner.total_bytes -= evicted.bytes;
                log::debug!("evicted {}#{}", oldest.series, oldest.index);
            }
        }

        inner.total_bytes += bytes;
        inner.entries.insert(key.clone(), CacheEntry { frame, bytes });
        inner.order.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn frame(width: u32, height: u32) -> DecodedFrame {
        DecodedFrame {
            width,
            height,
            pixels: Array2::zeros((height as usize, width as usize)),
            bits_stored: 16,
            rescale_slope: 1.0,
            rescale_intercept: 0.0,
            window_center: None,
            window_width: None,
            pixel_spacing: None,
            position_z: None,
            slice_thickness: None,
        }
    }

    // 8x8 frames weigh 128 bytes each
    fn key(i: usize) -> CacheKey {
        CacheKey::new("series-1", i)
    }

    #[test]
    fn hit_returns_cached_frame_without_decoding() {
        let cache = FrameCache::with_budget(1024);
        cache
            .get_or_decode(&key(0), || Ok(frame(8, 8)))
            .unwrap();
        let result = cache.get_or_decode(&key(0), || {
            panic!("decode must not run on a hit");
        });
        assert!(result.is_ok());
    }

    #[test]
    fn decode_error_propagates_and_inserts_nothing() {
        let cache = FrameCache::with_budget(1024);
        let result = cache.get_or_decode(&key(0), || Err(DecodeError("corrupt".into())));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_least_recently_used_first() {
        // room for exactly three 128-byte frames
        let cache = FrameCache::with_budget(384);
        for i in 0..3 {
            cache.get_or_decode(&key(i), || Ok(frame(8, 8))).unwrap();
        }
        // touch the oldest so it outlives the untouched middle entry
        cache.get_or_decode(&key(0), || Ok(frame(8, 8))).unwrap();
        cache.get_or_decode(&key(3), || Ok(frame(8, 8))).unwrap();

        assert!(!cache.contains(&key(1)), "untouched oldest must go first");
        assert!(cache.contains(&key(0)), "recently read entry must survive");
        assert!(cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
        assert_eq!(cache.total_bytes(), 384);
    }

    #[test]
    fn contains_does_not_touch_lru_order() {
        let cache = FrameCache::with_budget(256);
        cache.get_or_decode(&key(0), || Ok(frame(8, 8))).unwrap();
        cache.get_or_decode(&key(1), || Ok(frame(8, 8))).unwrap();
        // an existence check must not save key 0 from eviction
        assert!(cache.contains(&key(0)));
        cache.get_or_decode(&key(2), || Ok(frame(8, 8))).unwrap();
        assert!(!cache.contains(&key(0)));
        assert!(cache.contains(&key(1)));
    }

    #[test]
    fn oversized_entry_is_inserted_then_evicted_by_the_next_insert() {
        let cache = FrameCache::with_budget(128);
        cache.get_or_decode(&key(0), || Ok(frame(64, 64))).unwrap();
        assert!(cache.contains(&key(0)));
        assert!(cache.total_bytes() > 128);

        cache.get_or_decode(&key(1), || Ok(frame(8, 8))).unwrap();
        assert!(!cache.contains(&key(0)));
        assert!(cache.contains(&key(1)));
    }

    #[test]
    fn clear_series_removes_only_that_series() {
        let cache = FrameCache::with_budget(1024);
        cache.insert(CacheKey::new("a", 0), frame(8, 8));
        cache.insert(CacheKey::new("a", 1), frame(8, 8));
        cache.insert(CacheKey::new("b", 0), frame(8, 8));
        cache.clear_series("a");
        assert!(!cache.contains(&CacheKey::new("a", 0)));
        assert!(!cache.contains(&CacheKey::new("a", 1)));
        assert!(cache.contains(&CacheKey::new("b", 0)));
        assert_eq!(cache.total_bytes(), 128);
    }

    #[test]
    fn reinserting_a_key_replaces_its_entry() {
        let cache = FrameCache::with_budget(1024);
        cache.insert(key(0), frame(8, 8));
        cache.insert(key(0), frame(16, 16));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 512);
    }
}
