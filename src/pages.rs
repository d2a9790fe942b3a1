use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cached {
    Hit(String),
    /// Nothing fresh is cached. Render the page and store it with this generation.
    Miss { generation: u64 },
}

/// Rendered page bodies keyed by request path.
pub trait PageCache {
    fn cached(&self, path: &str) -> Cached;

    /// Stores `body` only if `path` was not revalidated since the miss that
    /// returned `generation`. Returns whether the body was kept.
    fn store(&self, path: &str, generation: u64, body: String) -> bool;

    /// Marks the page at `path` stale so the next request renders it again.
    fn revalidate_path(&self, path: &str);
}

#[derive(Default)]
struct Pages {
    bodies: HashMap<String, String>,
    generations: HashMap<String, u64>,
}

impl Pages {
    fn generation(&self, path: &str) -> u64 {
        self.generations.get(path).copied().unwrap_or(0)
    }
}

#[derive(Default)]
pub struct MemoryPageCache {
    pages: Mutex<Pages>,
}

impl MemoryPageCache {
    fn lock(&self) -> MutexGuard<'_, Pages> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn revalidation_count(&self, path: &str) -> u64 {
        self.lock().generation(path)
    }
}

impl PageCache for MemoryPageCache {
    fn cached(&self, path: &str) -> Cached {
        let pages = self.lock();
        match pages.bodies.get(path) {
            Some(body) => Cached::Hit(body.clone()),
            None => Cached::Miss {
                generation: pages.generation(path),
            },
        }
    }

    fn store(&self, path: &str, generation: u64, body: String) -> bool {
        let mut pages = self.lock();
        if pages.generation(path) != generation {
            debug!("Discarded stale render of {path}");
            return false;
        }
        pages.bodies.insert(path.to_string(), body);
        true
    }

    fn revalidate_path(&self, path: &str) {
        let mut pages = self.lock();
        let evicted = pages.bodies.remove(path).is_some();
        *pages.generations.entry(path.to_string()).or_default() += 1;
        info!("Revalidated {path} (cached: {evicted})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(cache: &MemoryPageCache, path: &str, body: &str) {
        let Cached::Miss { generation } = cache.cached(path) else {
            panic!("{path} already cached");
        };
        assert!(cache.store(path, generation, body.to_string()));
    }

    #[test]
    fn revalidate_evicts_only_that_path() {
        let cache = MemoryPageCache::default();
        fill(&cache, "/dashboard/invoices", "[]");
        fill(&cache, "/dashboard", "home");

        cache.revalidate_path("/dashboard/invoices");

        assert_eq!(
            cache.cached("/dashboard/invoices"),
            Cached::Miss { generation: 1 }
        );
        assert_eq!(cache.cached("/dashboard"), Cached::Hit("home".to_string()));
        assert_eq!(cache.revalidation_count("/dashboard/invoices"), 1);
        assert_eq!(cache.revalidation_count("/dashboard"), 0);
    }

    #[test]
    fn revalidating_an_uncached_path_is_counted() {
        let cache = MemoryPageCache::default();
        cache.revalidate_path("/dashboard/invoices");
        cache.revalidate_path("/dashboard/invoices");
        assert_eq!(cache.revalidation_count("/dashboard/invoices"), 2);
    }

    #[test]
    fn render_started_before_revalidation_is_not_stored() {
        let cache = MemoryPageCache::default();
        let Cached::Miss { generation } = cache.cached("/dashboard/invoices") else {
            panic!("empty cache hit");
        };

        cache.revalidate_path("/dashboard/invoices");

        assert!(!cache.store("/dashboard/invoices", generation, "old".to_string()));
        assert_eq!(
            cache.cached("/dashboard/invoices"),
            Cached::Miss { generation: 1 }
        );
    }
}
