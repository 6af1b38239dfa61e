//! Atlas cache: build each descriptor at most once, share the result.
//!
//! ## Architecture
//!
//! ```text
//! AtlasCache
//!   ├── slots: Mutex<LruCache<FontAtlasDescriptor, Arc<Slot>>>
//!   │            └── Slot { atlas: Mutex<Option<Arc<FontAtlas>>>, bytes }
//!   ├── builder: AtlasBuilder
//!   └── bundled: Option<BundledAtlas>  (decoded instead of built)
//! ```
//!
//! The map lock is only held to find or create a slot. Builds run under
//! the slot's own lock, so callers of the same missing descriptor queue
//! behind one builder while other descriptors build in parallel. The map
//! lock holder never waits on a slot lock.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use lru::LruCache;

use glyphfield_core::{AtlasError, FontAtlas, FontAtlasDescriptor};

use crate::pipeline::AtlasBuilder;

/// A pre-encoded atlas shipped with the application.
#[derive(Debug, Clone)]
pub struct BundledAtlas {
    pub descriptor: FontAtlasDescriptor,
    /// `glyphfield-store` encoded bytes.
    pub bytes: Arc<[u8]>,
}

impl BundledAtlas {
    pub fn new(descriptor: FontAtlasDescriptor, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            descriptor,
            bytes: bytes.into(),
        }
    }

    /// Bundled bytes for the default descriptor (`sans-serif@512`).
    pub fn default_font(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(FontAtlasDescriptor::default(), bytes)
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Descriptor served by decoding bytes instead of building.
    pub bundled: Option<BundledAtlas>,
    /// Total atlas bytes kept before least recently used entries are
    /// evicted. Default: unbounded.
    pub byte_budget: Option<usize>,
}

impl CacheConfig {
    /// Config for testing (small budget so eviction is exercised).
    pub fn for_testing() -> Self {
        Self {
            bundled: None,
            byte_budget: Some(64 * 1024),
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub builds: u64,
    pub bundled_loads: u64,
    pub evictions: u64,
    /// Completed entries currently held.
    pub entries: usize,
    /// Footprint of completed entries.
    pub bytes: usize,
}

#[derive(Default)]
struct Slot {
    atlas: Mutex<Option<Arc<FontAtlas>>>,
    /// Footprint of the held atlas, 0 while empty.
    bytes: AtomicUsize,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, Option<Arc<FontAtlas>>> {
        self.atlas.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_ready(&self) -> bool {
        self.bytes.load(Ordering::Acquire) > 0
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    bundled_loads: AtomicU64,
    evictions: AtomicU64,
}

/// Process-lifetime store of finished atlases.
pub struct AtlasCache {
    builder: AtlasBuilder,
    config: CacheConfig,
    slots: Mutex<LruCache<FontAtlasDescriptor, Arc<Slot>>>,
    counters: Counters,
}

impl AtlasCache {
    pub fn new(builder: AtlasBuilder, config: CacheConfig) -> Self {
        Self {
            builder,
            config,
            slots: Mutex::new(LruCache::unbounded()),
            counters: Counters::default(),
        }
    }

    pub fn builder(&self) -> &AtlasBuilder {
        &self.builder
    }

    /// The atlas for `descriptor`, building (or decoding the bundled
    /// bytes) on first request.
    pub fn get(&self, descriptor: &FontAtlasDescriptor) -> Result<Arc<FontAtlas>, AtlasError> {
        let slot = self.slot(descriptor);
        let mut guard = slot.lock();
        if let Some(atlas) = guard.as_ref() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(atlas));
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let atlas = match self.produce(descriptor) {
            Ok(atlas) => Arc::new(atlas),
            Err(e) => {
                drop(guard);
                self.discard_empty(descriptor, &slot);
                return Err(e);
            }
        };
        slot.bytes.store(atlas.byte_size().max(1), Ordering::Release);
        *guard = Some(Arc::clone(&atlas));
        drop(guard);

        log::info!(
            "Cached atlas {} ({} bytes, {:.1}ms)",
            descriptor,
            atlas.byte_size(),
            start.elapsed().as_secs_f64() * 1000.0,
        );
        self.enforce_budget(descriptor);
        Ok(atlas)
    }

    /// Pre-seed the cache with a finished atlas, replacing any entry for
    /// the same descriptor.
    pub fn insert(&self, atlas: FontAtlas) -> Arc<FontAtlas> {
        let descriptor = atlas.atlas_descriptor();
        let atlas = Arc::new(atlas);
        let slot = self.slot(&descriptor);
        {
            let mut guard = slot.lock();
            slot.bytes.store(atlas.byte_size().max(1), Ordering::Release);
            *guard = Some(Arc::clone(&atlas));
        }
        self.enforce_budget(&descriptor);
        atlas
    }

    /// Whether a finished atlas for `descriptor` is held.
    pub fn contains(&self, descriptor: &FontAtlasDescriptor) -> bool {
        self.lock_slots()
            .peek(descriptor)
            .is_some_and(|slot| slot.is_ready())
    }

    /// Number of finished atlases held.
    pub fn len(&self) -> usize {
        self.lock_slots().iter().filter(|(_, s)| s.is_ready()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Builds in progress finish for their callers but
    /// are not retained.
    pub fn clear(&self) {
        self.lock_slots().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, bytes) = {
            let slots = self.lock_slots();
            footprint(&slots)
        };
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            builds: self.counters.builds.load(Ordering::Relaxed),
            bundled_loads: self.counters.bundled_loads.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            entries,
            bytes,
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, LruCache<FontAtlasDescriptor, Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Find or create the slot for `descriptor`, marking it most recently used.
    fn slot(&self, descriptor: &FontAtlasDescriptor) -> Arc<Slot> {
        let mut slots = self.lock_slots();
        Arc::clone(slots.get_or_insert(descriptor.clone(), || Arc::new(Slot::default())))
    }

    /// Forget `slot` if it is still empty and no other caller holds it.
    fn discard_empty(&self, descriptor: &FontAtlasDescriptor, slot: &Arc<Slot>) {
        let mut slots = self.lock_slots();
        // Slot handles are only cloned under this lock: the map and us.
        let unused = slots.peek(descriptor).is_some_and(|held| {
            Arc::ptr_eq(held, slot) && Arc::strong_count(slot) == 2 && !slot.is_ready()
        });
        if unused {
            slots.pop(descriptor);
        }
    }

    fn produce(&self, descriptor: &FontAtlasDescriptor) -> Result<FontAtlas, AtlasError> {
        match &self.config.bundled {
            Some(bundled) if &bundled.descriptor == descriptor => {
                let atlas = glyphfield_store::decode(&bundled.bytes, self.builder.resolver())?;
                if &atlas.atlas_descriptor() != descriptor {
                    return Err(AtlasError::SerializationFormat(format!(
                        "bundled bytes hold {}, expected {}",
                        atlas.atlas_descriptor(),
                        descriptor
                    )));
                }
                self.counters.bundled_loads.fetch_add(1, Ordering::Relaxed);
                log::info!("Loaded bundled atlas {descriptor}");
                Ok(atlas)
            }
            _ => {
                let atlas = self.builder.build(descriptor)?;
                self.counters.builds.fetch_add(1, Ordering::Relaxed);
                Ok(atlas)
            }
        }
    }

    /// Evict least recently used finished entries (never `keep`) until
    /// the footprint fits the budget.
    fn enforce_budget(&self, keep: &FontAtlasDescriptor) {
        let Some(budget) = self.config.byte_budget else {
            return;
        };
        let mut slots = self.lock_slots();
        let (_, mut total) = footprint(&slots);
        if total <= budget {
            return;
        }

        let victims: Vec<(FontAtlasDescriptor, usize)> = slots
            .iter()
            .rev()
            .filter(|(key, slot)| *key != keep && slot.is_ready())
            .map(|(key, slot)| (key.clone(), slot.bytes.load(Ordering::Acquire)))
            .collect();
        for (key, bytes) in victims {
            if total <= budget {
                break;
            }
            slots.pop(&key);
            total -= bytes;
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            log::debug!("Evicted atlas {key} ({bytes} bytes)");
        }
        if total > budget {
            log::warn!("Atlas cache holds {total} bytes, over its {budget}-byte budget");
        }
    }
}

impl std::fmt::Debug for AtlasCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasCache")
            .field("builder", &self.builder)
            .field("stats", &self.stats())
            .finish()
    }
}

fn footprint(slots: &LruCache<FontAtlasDescriptor, Arc<Slot>>) -> (usize, usize) {
    slots
        .iter()
        .map(|(_, s)| s.bytes.load(Ordering::Acquire))
        .filter(|&b| b > 0)
        .fold((0, 0), |(n, total), b| (n + 1, total + b))
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::AtlasConfig;
    use glyphfield_sdf::CpuBackend;
    use glyphfield_text::{BlockFont, SyntheticResolver};

    fn cache(config: CacheConfig) -> AtlasCache {
        let resolver = SyntheticResolver::new()
            .with_font("Blocks", BlockFont::sample(12, 1.0))
            .with_font("Other", BlockFont::sample(6, 1.0));
        let builder = AtlasBuilder::new(
            Arc::new(resolver),
            Arc::new(CpuBackend),
            AtlasConfig::for_testing(),
        );
        AtlasCache::new(builder, config)
    }

    #[test]
    fn test_second_get_hits() {
        let cache = cache(CacheConfig::default());
        let desc = FontAtlasDescriptor::new("Blocks", 64);
        let a = cache.get(&desc).unwrap();
        let b = cache.get(&desc).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.builds), (1, 1, 1));
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.bytes, a.byte_size());
    }

    #[test]
    fn test_failed_build_leaves_cache_usable() {
        let cache = cache(CacheConfig::default());
        let missing = FontAtlasDescriptor::new("Missing", 64);
        assert!(cache.get(&missing).is_err());
        assert!(cache.get(&missing).is_err());
        assert!(!cache.contains(&missing));
        assert_eq!(cache.stats().builds, 0);
        assert_eq!(cache.stats().misses, 2);
        assert!(cache.get(&FontAtlasDescriptor::new("Blocks", 64)).is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_builds_leave_no_slots() {
        let cache = cache(CacheConfig::default());
        for size in 1..=20 {
            assert!(cache.get(&FontAtlasDescriptor::new("Missing", size * 8)).is_err());
        }
        assert_eq!(cache.lock_slots().len(), 0);

        cache.get(&FontAtlasDescriptor::new("Blocks", 64)).unwrap();
        assert!(cache.get(&FontAtlasDescriptor::new("Missing", 64)).is_err());
        assert_eq!(cache.lock_slots().len(), 1);
    }

    #[test]
    fn test_insert_preseeds() {
        let cache = cache(CacheConfig::default());
        let desc = FontAtlasDescriptor::new("Blocks", 64);
        let built = cache.builder().build(&desc).unwrap();
        let seeded = cache.insert(built);
        assert!(cache.contains(&desc));
        assert!(Arc::ptr_eq(&seeded, &cache.get(&desc).unwrap()));
        assert_eq!(cache.stats().builds, 0);
    }

    #[test]
    fn test_clear() {
        let cache = cache(CacheConfig::default());
        let desc = FontAtlasDescriptor::new("Blocks", 64);
        cache.get(&desc).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        cache.get(&desc).unwrap();
        assert_eq!(cache.stats().builds, 2);
    }

    #[test]
    fn test_no_eviction_by_default() {
        let cache = cache(CacheConfig::default());
        for size in [32, 48, 64, 80] {
            cache.get(&FontAtlasDescriptor::new("Blocks", size)).unwrap();
        }
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_budget_evicts_least_recently_used() {
        // One 64² atlas plus glyph table fits; two do not.
        let cache = cache(CacheConfig {
            bundled: None,
            byte_budget: Some(6 * 1024),
        });
        let a = FontAtlasDescriptor::new("Blocks", 64);
        let b = FontAtlasDescriptor::new("Other", 64);
        cache.get(&a).unwrap();
        cache.get(&b).unwrap();
        assert!(!cache.contains(&a));
        assert!(cache.contains(&b));
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.stats().bytes <= 6 * 1024);
    }

    #[test]
    fn test_budget_keeps_recently_used() {
        let cache = cache(CacheConfig {
            bundled: None,
            byte_budget: Some(6000),
        });
        let small = |n| FontAtlasDescriptor::new("Blocks", n);
        cache.get(&small(48)).unwrap();
        cache.get(&FontAtlasDescriptor::new("Other", 48)).unwrap();
        // Touch the first so the second becomes least recently used.
        cache.get(&small(48)).unwrap();
        cache.get(&small(56)).unwrap();
        assert!(cache.contains(&small(48)));
        assert!(cache.contains(&small(56)));
        assert!(!cache.contains(&FontAtlasDescriptor::new("Other", 48)));
    }
}
