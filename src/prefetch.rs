use crate::cache::{CacheKey, FrameCache};
use crate::frame::FrameDecoder;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

/// How many slices ahead/behind of the current index get prefetched.
pub const DEFAULT_PREFETCH_RADIUS: usize = 8;

/// Background decoder that keeps neighboring slices warm in the cache.
///
/// At most one prefetch task is in flight; triggering a new one cancels the
/// previous task cooperatively. Prefetch is strictly an optimization:
/// decode failures are logged and skipped, never surfaced.
pub struct Prefetcher {
    cache: Arc<FrameCache>,
    decoder: Arc<dyn FrameDecoder>,
    radius: usize,
    active: Mutex<Option<Arc<AtomicBool>>>,
}

impl Prefetcher {
    pub fn new(cache: Arc<FrameCache>, decoder: Arc<dyn FrameDecoder>) -> Self {
        Self {
            cache,
            decoder,
            radius: DEFAULT_PREFETCH_RADIUS,
            active: Mutex::new(None),
        }
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    /// Start prefetching around `current`, biased toward the scroll
    /// direction. Cancels any still-running prior prefetch before spawning.
    /// The returned handle may be dropped; it exists so callers can await
    /// completion when they need to.
    pub fn trigger(
        &self,
        series: &str,
        current: usize,
        total: usize,
        scroll_delta: i32,
    ) -> JoinHandle<()> {
        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = active.replace(Arc::clone(&cancel)) {
                previous.store(true, Ordering::Relaxed);
            }
        }

        let candidates = candidate_indices(current, total, self.radius, scroll_delta);
        let cache = Arc::clone(&self.cache);
        let decoder = Arc::clone(&self.decoder);
        let series = series.to_string();

        tokio::spawn(async move {
            for index in candidates {
                if cancel.load(Ordering::Relaxed) {
                    log::debug!("prefetch for {series} superseded");
                    return;
                }
                let key = CacheKey::new(series.as_str(), index);
                if cache.contains(&key) {
                    continue;
                }
                match decoder.decode(&series, index) {
                    Ok(frame) => cache.insert(key, frame),
                    Err(err) => log::debug!("prefetch decode of {series}#{index} failed: {err}"),
                }
                // stay polite to interactive work
                tokio::task::yield_now().await;
            }
        })
    }
}

/// Candidate slice indices at increasing radius from `current`, interleaved
/// and biased toward the scroll direction: scrolling forward emits
/// current+k before current−k at each radius step, otherwise the reverse.
/// Out-of-bounds indices are dropped.
pub fn candidate_indices(
    current: usize,
    total: usize,
    radius: usize,
    scroll_delta: i32,
) -> Vec<usize> {
    let mut candidates = Vec::with_capacity(radius * 2);
    for step in 1..=radius {
        let forward = current.checked_add(step).filter(|i| *i < total);
        let backward = current.checked_sub(step);
        let pair = if scroll_delta > 0 {
            [forward, backward]
        } else {
            [backward, forward]
        };
        candidates.extend(pair.into_iter().flatten());
    }
    candidates
}
