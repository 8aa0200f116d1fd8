//! Shared per-group route cache.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::schema::{PcbRouteCache, PcbTrace};

/// A group's `PcbRouteCache`, shared between the group and the router.
///
/// The group owns the value; the coordinator only replaces it after a
/// successful route.
#[derive(Debug, Clone, Default)]
pub struct SharedRouteCache {
    inner: Arc<Mutex<Option<PcbRouteCache>>>,
}

impl SharedRouteCache {
    pub fn new(initial: Option<PcbRouteCache>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<PcbRouteCache>> {
        // A poisoned cache still holds a complete value; stores are single assignments.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached traces when `fingerprint` matches the stored key.
    pub fn lookup(&self, fingerprint: &str) -> Option<Vec<PcbTrace>> {
        self.lock()
            .as_ref()
            .filter(|cache| cache.cache_key == fingerprint)
            .map(|cache| cache.pcb_traces.clone())
    }

    pub fn store(&self, fingerprint: &str, traces: Vec<PcbTrace>) {
        *self.lock() = Some(PcbRouteCache {
            pcb_traces: traces,
            cache_key: fingerprint.to_string(),
        });
    }

    pub fn snapshot(&self) -> Option<PcbRouteCache> {
        self.lock().clone()
    }

    pub fn is_shared_with(&self, other: &SharedRouteCache) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
