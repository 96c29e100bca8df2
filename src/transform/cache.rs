use crate::error::DocweaveError;
use docweave_engine::CompiledStylesheet;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

type Slot = Arc<Mutex<Option<Arc<dyn CompiledStylesheet>>>>;

/// Compiled stylesheets keyed by stylesheet URL.
///
/// Each URL owns a slot with its own lock, so concurrent requests for the
/// same stylesheet compile it once while different stylesheets compile in
/// parallel. A failed compilation drops its slot again, and a compilation
/// that panicked leaves a slot the next request recovers. Compiled entries
/// are never evicted.
#[derive(Debug, Default)]
pub struct TemplateCache {
    slots: Mutex<HashMap<String, Slot>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stylesheet cached for `url`, running `compile` to
    /// produce it on a miss.
    pub fn get_or_compile<F>(&self, url: &str, compile: F) -> Result<Arc<dyn CompiledStylesheet>, DocweaveError>
    where
        F: FnOnce() -> Result<Arc<dyn CompiledStylesheet>, DocweaveError>,
    {
        let slot = Arc::clone(self.lock_slots().entry(url.to_string()).or_default());

        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(compiled) = entry.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!("template cache hit for [{url}]");
            return Ok(Arc::clone(compiled));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("template cache miss for [{url}]");
        match compile() {
            Ok(compiled) => {
                *entry = Some(Arc::clone(&compiled));
                Ok(compiled)
            }
            Err(e) => {
                drop(entry);
                self.discard_if_unused(url, slot);
                Err(e)
            }
        }
    }

    /// Removes the slot for `url` unless another request holds it or it
    /// has been filled meanwhile.
    fn discard_if_unused(&self, url: &str, slot: Slot) {
        let mut slots = self.lock_slots();
        let Some(current) = slots.get(url) else {
            return;
        };
        // the map and this caller hold the only references
        if !Arc::ptr_eq(current, &slot) || Arc::strong_count(&slot) > 2 {
            return;
        }
        let empty = match slot.try_lock() {
            Ok(entry) => entry.is_none(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_none(),
            Err(TryLockError::WouldBlock) => false,
        };
        if empty {
            trace!("dropping template cache slot for [{url}]");
            slots.remove(url);
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, url: &str) -> Option<Arc<dyn CompiledStylesheet>> {
        let slot = self.lock_slots().get(url).cloned()?;
        let entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        entry.clone()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    /// Number of successfully compiled stylesheets held.
    pub fn len(&self) -> usize {
        self.lock_slots()
            .values()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.lock_slots().clear();
    }
}
