//! In-memory store of rendered post pages with time-based revalidation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::{Mutex, RwLock};

/// A rendered page and when it was produced
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub html: Arc<str>,
    pub generated_at: SystemTime,
}

impl CachedPage {
    pub fn new(html: impl Into<Arc<str>>) -> Self {
        Self::generated_at(html, SystemTime::now())
    }

    pub fn generated_at(html: impl Into<Arc<str>>, generated_at: SystemTime) -> Self {
        Self {
            html: html.into(),
            generated_at,
        }
    }

    /// Age of the page; pages stamped in the future count as new
    pub fn age(&self) -> Duration {
        self.generated_at.elapsed().unwrap_or_default()
    }
}

/// Whether a cached page may be served as is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Served, but due for regeneration
    Stale,
}

/// How long a uid reported missing is remembered
const MISSING_TTL: Duration = Duration::from_secs(60);

/// Most missing uids remembered at once; the oldest is dropped first
pub const MAX_MISSING: usize = 256;

/// Rendered post pages keyed by request path
#[derive(Debug, Clone)]
pub struct PageCache {
    pages: Arc<RwLock<HashMap<String, CachedPage>>>,
    regenerating: Arc<Mutex<HashSet<String>>>,
    /// Uids the source reported missing, with when that was learned
    missing: Arc<Mutex<HashMap<String, Instant>>>,
    revalidate: Duration,
}

impl PageCache {
    /// Pages older than `revalidate` are stale
    pub fn new(revalidate: Duration) -> Self {
        Self {
            pages: Arc::new(RwLock::new(HashMap::new())),
            regenerating: Arc::new(Mutex::new(HashSet::new())),
            missing: Arc::new(Mutex::new(HashMap::new())),
            revalidate,
        }
    }

    /// Cached page for `path` and its freshness
    pub async fn get(&self, path: &str) -> Option<(CachedPage, Freshness)> {
        let pages = self.pages.read().await;
        pages.get(path).map(|page| {
            let freshness = if self.is_stale(page) {
                Freshness::Stale
            } else {
                Freshness::Fresh
            };
            (page.clone(), freshness)
        })
    }

    pub async fn insert(&self, path: &str, page: CachedPage) {
        self.pages.write().await.insert(path.to_string(), page);
    }

    pub async fn len(&self) -> usize {
        self.pages.read().await.len()
    }

    pub fn is_stale(&self, page: &CachedPage) -> bool {
        page.age() >= self.revalidate
    }

    /// Claim the regeneration of `path`. Returns false while another
    /// regeneration of the same path is running.
    pub async fn begin_regeneration(&self, path: &str) -> bool {
        self.regenerating.lock().await.insert(path.to_string())
    }

    pub async fn end_regeneration(&self, path: &str) {
        self.regenerating.lock().await.remove(path);
    }

    /// Remember that the source has no document for `path`
    pub async fn mark_missing(&self, path: &str) {
        let mut missing = self.missing.lock().await;
        missing.retain(|_, seen| seen.elapsed() < MISSING_TTL);
        if missing.len() >= MAX_MISSING && !missing.contains_key(path) {
            let oldest = missing
                .iter()
                .min_by_key(|(_, seen)| **seen)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                missing.remove(&oldest);
            }
        }
        missing.insert(path.to_string(), Instant::now());
    }

    /// Forget `path` as missing. Returns whether it was recently reported so.
    pub async fn take_missing(&self, path: &str) -> bool {
        self.missing
            .lock()
            .await
            .remove(path)
            .is_some_and(|seen| seen.elapsed() < MISSING_TTL)
    }

    pub async fn missing_len(&self) -> usize {
        self.missing.lock().await.len()
    }
}
