use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::CachePolicyConfig;
use crate::error::{with_deadline, ParleyError, Result};
use crate::language::LanguagePair;
use super::{ModelLoader, TranslationModel};

/// How many loaded models the cache keeps resident
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Never evict; every model stays loaded for the life of the process
    Unbounded,
    /// Evict the least recently used pair once `capacity` pairs are resident
    Lru { capacity: NonZeroUsize },
}

impl From<CachePolicyConfig> for EvictionPolicy {
    fn from(config: CachePolicyConfig) -> Self {
        match config {
            CachePolicyConfig::Unbounded => Self::Unbounded,
            CachePolicyConfig::Lru { capacity } => Self::Lru {
                capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            },
        }
    }
}

type Slot = Arc<OnceCell<Arc<dyn TranslationModel>>>;

#[derive(Default)]
struct Slots {
    map: HashMap<LanguagePair, Slot>,
    // Front is least recently used. Only maintained under `Lru`.
    recency: VecDeque<LanguagePair>,
}

impl Slots {
    fn touch(&mut self, pair: &LanguagePair) {
        if let Some(pos) = self.recency.iter().position(|p| p == pair) {
            self.recency.remove(pos);
        }
        self.recency.push_back(pair.clone());
    }

    /// Evict idle loaded models, least recent first, until at most
    /// `capacity` are resident. Slots still loading or held by a caller are
    /// never evicted; empty slots left by failed loads are dropped.
    fn evict_over(&mut self, capacity: usize, keep: &LanguagePair) {
        let idle = |slot: &Slot| Arc::strong_count(slot) == 1;
        self.map.retain(|pair, slot| {
            pair == keep || slot.initialized() || Arc::strong_count(slot) > 1
        });
        let map = &self.map;
        self.recency.retain(|pair| map.contains_key(pair));

        let mut resident = self.map.values().filter(|slot| slot.initialized()).count();
        while resident > capacity {
            let victim = self.recency.iter().position(|pair| {
                pair != keep
                    && self
                        .map
                        .get(pair)
                        .is_some_and(|slot| slot.initialized() && idle(slot))
            });
            let Some(pos) = victim else {
                break;
            };
            if let Some(oldest) = self.recency.remove(pos) {
                self.map.remove(&oldest);
                debug!("Evicted translation model for {}", oldest);
            }
            resident -= 1;
        }
    }
}

/// Loaded translation models keyed by language pair.
///
/// Each pair has its own `OnceCell`, so concurrent first requests for one
/// pair share a single load while different pairs load independently. A
/// failed load leaves the cell empty and the next request retries.
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    policy: EvictionPolicy,
    load_timeout: Duration,
    slots: Mutex<Slots>,
}

impl ModelCache {
    pub fn new(loader: Arc<dyn ModelLoader>, policy: EvictionPolicy, load_timeout: Duration) -> Self {
        Self {
            loader,
            policy,
            load_timeout,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Return the cached model for `pair`, loading it on first use
    pub async fn get_or_load(&self, pair: &LanguagePair) -> Result<Arc<dyn TranslationModel>> {
        let slot = self.slot_for(pair);

        let model = slot
            .get_or_try_init(|| async {
                info!("Loading translation model for {}", pair);
                let operation = format!("Loading model for {}", pair);
                with_deadline(&operation, self.load_timeout, self.loader.load(pair))
                    .await
                    .map_err(|e| match e {
                        ParleyError::ModelLoad { .. } | ParleyError::Timeout { .. } => e,
                        other => ParleyError::ModelLoad {
                            pair: pair.clone(),
                            reason: other.to_string(),
                        },
                    })
            })
            .await?;
        let model = Arc::clone(model);
        drop(slot);

        // Loads that finished after the last check may have pushed the
        // cache over capacity
        self.enforce_capacity(pair);
        Ok(model)
    }

    fn enforce_capacity(&self, pair: &LanguagePair) {
        if let EvictionPolicy::Lru { capacity } = self.policy {
            self.slots.lock().evict_over(capacity.get(), pair);
        }
    }

    fn slot_for(&self, pair: &LanguagePair) -> Slot {
        let mut slots = self.slots.lock();
        let slot = Arc::clone(
            slots
                .map
                .entry(pair.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );

        if let EvictionPolicy::Lru { capacity } = self.policy {
            slots.touch(pair);
            slots.evict_over(capacity.get(), pair);
        }

        slot
    }

    /// Whether a loaded model for `pair` is currently resident
    pub fn contains(&self, pair: &LanguagePair) -> bool {
        self.slots
            .lock()
            .map
            .get(pair)
            .is_some_and(|slot| slot.initialized())
    }

    /// Number of resident loaded models
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .map
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pairs with a resident loaded model, sorted
    pub fn loaded_pairs(&self) -> Vec<LanguagePair> {
        let mut pairs: Vec<_> = self
            .slots
            .lock()
            .map
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(pair, _)| pair.clone())
            .collect();
        pairs.sort();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::JoinSet;

    struct EchoModel(String);

    #[async_trait]
    impl TranslationModel for EchoModel {
        async fn translate(&self, text: &str) -> Result<String> {
            Ok(format!("{}:{}", self.0, text))
        }
    }

    /// Counts loads; optionally slow, optionally failing for one pair
    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicUsize,
        delay: Option<Duration>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self, pair: &LanguagePair) -> Result<Arc<dyn TranslationModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_for.as_deref() == Some(pair.to_string().as_str()) {
                return Err(ParleyError::engine("loader", "weights missing"));
            }
            Ok(Arc::new(EchoModel(pair.to_string())))
        }
    }

    fn pair(s: &str) -> LanguagePair {
        s.parse().unwrap()
    }

    fn cache(loader: Arc<CountingLoader>, policy: EvictionPolicy) -> ModelCache {
        ModelCache::new(loader, policy, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_same_pair_loads_once() {
        let loader = Arc::new(CountingLoader::default());
        let cache = cache(Arc::clone(&loader), EvictionPolicy::Unbounded);

        let first = cache.get_or_load(&pair("en-es")).await.unwrap();
        let second = cache.get_or_load(&pair("en-es")).await.unwrap();

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.translate("hi").await.unwrap(), "en-es:hi");
        assert!(cache.contains(&pair("en-es")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_requests_load_once() {
        let loader = Arc::new(CountingLoader {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let cache = Arc::new(cache(Arc::clone(&loader), EvictionPolicy::Unbounded));

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            tasks.spawn(async move { cache.get_or_load(&pair("fr-en")).await.map(|_| ()) });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_different_pairs_load_separately() {
        let loader = Arc::new(CountingLoader::default());
        let cache = cache(Arc::clone(&loader), EvictionPolicy::Unbounded);

        cache.get_or_load(&pair("en-es")).await.unwrap();
        cache.get_or_load(&pair("es-en")).await.unwrap();

        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.loaded_pairs(), vec![pair("en-es"), pair("es-en")]);
    }

    #[tokio::test]
    async fn test_failed_load_is_wrapped_and_retried() {
        let loader = Arc::new(CountingLoader {
            fail_for: Some("en-ja".to_string()),
            ..Default::default()
        });
        let cache = cache(Arc::clone(&loader), EvictionPolicy::Unbounded);

        let err = cache.get_or_load(&pair("en-ja")).await.err().unwrap();
        assert!(matches!(err, ParleyError::ModelLoad { ref pair, .. } if pair.to_string() == "en-ja"));
        assert!(!cache.contains(&pair("en-ja")));

        assert!(cache.get_or_load(&pair("en-ja")).await.is_err());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_slow_load_times_out() {
        let loader = Arc::new(CountingLoader {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let cache = ModelCache::new(loader, EvictionPolicy::Unbounded, Duration::from_millis(20));

        let err = cache.get_or_load(&pair("en-de")).await.err().unwrap();
        assert!(matches!(err, ParleyError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_lru_evicts_least_recently_used() {
        let loader = Arc::new(CountingLoader::default());
        let policy = EvictionPolicy::Lru {
            capacity: NonZeroUsize::new(2).unwrap(),
        };
        let cache = cache(Arc::clone(&loader), policy);

        cache.get_or_load(&pair("en-es")).await.unwrap();
        cache.get_or_load(&pair("en-de")).await.unwrap();
        // Refresh en-es so en-de becomes the eviction candidate
        cache.get_or_load(&pair("en-es")).await.unwrap();
        cache.get_or_load(&pair("en-fr")).await.unwrap();

        assert_eq!(cache.loaded_pairs(), vec![pair("en-es"), pair("en-fr")]);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 3);

        // Evicted pairs reload on demand
        cache.get_or_load(&pair("en-de")).await.unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 4);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lru_keeps_in_flight_loads() {
        let loader = Arc::new(CountingLoader {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let policy = EvictionPolicy::Lru {
            capacity: NonZeroUsize::new(2).unwrap(),
        };
        let cache = Arc::new(cache(Arc::clone(&loader), policy));

        let mut tasks = JoinSet::new();
        for code in ["en-es", "en-de", "en-fr"] {
            let cache = Arc::clone(&cache);
            tasks.spawn(async move { cache.get_or_load(&pair(code)).await.map(|_| ()) });
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // en-es is still loading and must be joined, not reloaded
        let joined = Arc::clone(&cache);
        tasks.spawn(async move { joined.get_or_load(&pair("en-es")).await.map(|_| ()) });

        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        assert_eq!(loader.loads.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_lru_ignores_failed_loads() {
        let loader = Arc::new(CountingLoader {
            fail_for: Some("en-ja".to_string()),
            ..Default::default()
        });
        let policy = EvictionPolicy::Lru {
            capacity: NonZeroUsize::new(2).unwrap(),
        };
        let cache = cache(Arc::clone(&loader), policy);

        cache.get_or_load(&pair("en-es")).await.unwrap();
        assert!(cache.get_or_load(&pair("en-ja")).await.is_err());
        cache.get_or_load(&pair("en-de")).await.unwrap();

        assert_eq!(cache.loaded_pairs(), vec![pair("en-de"), pair("en-es")]);
    }

    #[test]
    fn test_policy_from_config() {
        assert_eq!(
            EvictionPolicy::from(CachePolicyConfig::Unbounded),
            EvictionPolicy::Unbounded
        );
        assert_eq!(
            EvictionPolicy::from(CachePolicyConfig::Lru { capacity: 3 }),
            EvictionPolicy::Lru {
                capacity: NonZeroUsize::new(3).unwrap()
            }
        );
    }
}
