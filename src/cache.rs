//! Character map cache
//!
//! Memoizes one [`CharacterMap`] per [`LayoutIdentifier`]. Dictation uses one
//! active layout at a time, so only the current and the previous layout stay
//! resident (LRU of two). Concurrent builds for the same identifier are
//! collapsed into one: later callers wait for the first build to finish.

use crate::error::LayoutQueryError;
use crate::keymap::{CharacterMap, LayoutIdentifier};
use crate::layout::LayoutSource;
use crate::symbols;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Number of layouts kept resident
pub const DEFAULT_CAPACITY: usize = 2;

type BuildCell = Arc<OnceCell<Arc<CharacterMap>>>;

/// What a caller that missed the cache should do next
enum Claim {
    /// Another build published the map in the meantime
    Ready(Arc<CharacterMap>),
    /// Join (or start) the build for this identifier
    Build(BuildCell),
}

pub struct LayoutCache {
    source: Arc<dyn LayoutSource>,
    capacity: usize,
    /// Most recently used first
    entries: Mutex<VecDeque<Arc<CharacterMap>>>,
    in_flight: Mutex<HashMap<LayoutIdentifier, BuildCell>>,
    builds: AtomicUsize,
}

impl LayoutCache {
    pub fn new(source: Arc<dyn LayoutSource>) -> Self {
        Self::with_capacity(source, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(source: Arc<dyn LayoutSource>, capacity: usize) -> Self {
        Self {
            source,
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
            in_flight: Mutex::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn source(&self) -> &Arc<dyn LayoutSource> {
        &self.source
    }

    /// Number of symbol tables built so far (cache misses that succeeded)
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Identifiers currently resident, most recently used first
    pub fn resident(&self) -> Vec<LayoutIdentifier> {
        lock(&self.entries)
            .iter()
            .map(|m| m.identifier().clone())
            .collect()
    }

    fn lookup(&self, id: &LayoutIdentifier) -> Option<Arc<CharacterMap>> {
        let mut entries = lock(&self.entries);
        let pos = entries.iter().position(|m| m.identifier() == id)?;
        let map = entries.remove(pos)?;
        entries.push_front(Arc::clone(&map));
        Some(map)
    }

    fn publish(&self, map: Arc<CharacterMap>) {
        let mut entries = lock(&self.entries);
        entries.retain(|m| m.identifier() != map.identifier());
        entries.push_front(map);
        while entries.len() > self.capacity {
            if let Some(evicted) = entries.pop_back() {
                tracing::debug!("Evicted character map for '{}'", evicted.identifier());
            }
        }
    }

    /// Join the in-flight build for `id`, or find the map it already
    /// published. The lookup runs under the in-flight lock so a build that
    /// finished after the caller's first lookup is not repeated.
    fn claim(&self, id: &LayoutIdentifier) -> Claim {
        let mut in_flight = lock(&self.in_flight);
        if let Some(map) = self.lookup(id) {
            return Claim::Ready(map);
        }
        Claim::Build(Arc::clone(
            in_flight
                .entry(id.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        ))
    }

    /// Return the map for `id`, building it from the layout source on a miss
    pub async fn get_or_build(
        &self,
        id: &LayoutIdentifier,
    ) -> Result<Arc<CharacterMap>, LayoutQueryError> {
        if let Some(map) = self.lookup(id) {
            tracing::trace!("Character map cache hit for '{}'", id);
            return Ok(map);
        }

        let cell = match self.claim(id) {
            Claim::Ready(map) => return Ok(map),
            Claim::Build(cell) => cell,
        };

        let result = cell
            .get_or_try_init(|| async {
                tracing::debug!("Building character map for '{}' via {}", id, self.source.name());
                let raw = self.source.raw_symbol_table(id).await?;
                let map = Arc::new(symbols::build(id.clone(), &raw));
                self.builds.fetch_add(1, Ordering::Relaxed);
                self.publish(Arc::clone(&map));
                Ok::<_, LayoutQueryError>(map)
            })
            .await
            .map(Arc::clone);

        // Later misses for this identifier start a fresh build
        let mut in_flight = lock(&self.in_flight);
        if in_flight.get(id).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
            in_flight.remove(id);
        }

        result
    }
}

/// Lock a std mutex, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{builtin, RawSymbolData};
    use std::time::Duration;

    /// Serves the US table for every identifier and counts queries
    struct CountingSource {
        queries: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                queries: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl LayoutSource for CountingSource {
        async fn current_identifier(&self) -> Result<LayoutIdentifier, LayoutQueryError> {
            Ok(LayoutIdentifier::us())
        }

        async fn raw_symbol_table(
            &self,
            _id: &LayoutIdentifier,
        ) -> Result<RawSymbolData, LayoutQueryError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(LayoutQueryError::Malformed("boom".to_string()));
            }
            Ok(builtin::us_qwerty())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let source = Arc::new(CountingSource::new());
        let cache = LayoutCache::new(source.clone());
        let id = LayoutIdentifier::us();

        let first = cache.get_or_build(&id).await.unwrap();
        let second = cache.get_or_build(&id).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.queries.load(Ordering::SeqCst), 1);
        assert_eq!(cache.builds(), 1);
    }

    #[tokio::test]
    async fn test_lru_keeps_two_layouts() {
        let source = Arc::new(CountingSource::new());
        let cache = LayoutCache::new(source.clone());
        let us = LayoutIdentifier::us();
        let fr = LayoutIdentifier::new("fr", "", 0);
        let de = LayoutIdentifier::new("de", "", 0);

        cache.get_or_build(&us).await.unwrap();
        cache.get_or_build(&fr).await.unwrap();
        cache.get_or_build(&us).await.unwrap();
        assert_eq!(source.queries.load(Ordering::SeqCst), 2);

        cache.get_or_build(&de).await.unwrap();
        assert_eq!(cache.resident(), vec![de.clone(), us.clone()]);

        // fr was least recently used and had to be rebuilt
        cache.get_or_build(&fr).await.unwrap();
        assert_eq!(source.queries.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_concurrent_builds_are_deduplicated() {
        let source = Arc::new(CountingSource {
            delay: Duration::from_millis(50),
            ..CountingSource::new()
        });
        let cache = LayoutCache::new(source.clone());
        let id = LayoutIdentifier::new("fr", "", 0);

        let (a, b) = tokio::join!(cache.get_or_build(&id), cache.get_or_build(&id));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_miss_after_publish_does_not_rebuild() {
        let source = Arc::new(CountingSource::new());
        let cache = LayoutCache::new(source.clone());
        let id = LayoutIdentifier::new("de", "", 0);
        let built = cache.get_or_build(&id).await.unwrap();

        // A caller whose first lookup ran before the build published
        match cache.claim(&id) {
            Claim::Ready(map) => assert!(Arc::ptr_eq(&map, &built)),
            Claim::Build(_) => panic!("published map was not found"),
        }
        assert!(lock(&cache.in_flight).is_empty());
        assert_eq!(source.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_build_is_not_cached() {
        let source = Arc::new(CountingSource {
            fail: true,
            ..CountingSource::new()
        });
        let cache = LayoutCache::new(source.clone());
        let id = LayoutIdentifier::us();

        assert!(cache.get_or_build(&id).await.is_err());
        assert!(cache.get_or_build(&id).await.is_err());
        assert_eq!(source.queries.load(Ordering::SeqCst), 2);
        assert!(cache.resident().is_empty());
    }
}
