use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, InferenceBackend};

/// One fetched snapshot of loaded model identifiers, in backend order.
///
/// Cloning shares the underlying list, so a caller that holds a catalog
/// keeps seeing the same snapshot even if the cache refreshes meanwhile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog(Arc<Vec<String>>);

impl ModelCatalog {
    pub fn new(models: Vec<String>) -> Self {
        Self(Arc::new(models))
    }

    pub fn contains(&self, model: &str) -> bool {
        self.0.iter().any(|m| m == model)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for ModelCatalog {
    fn from(models: Vec<String>) -> Self {
        Self::new(models)
    }
}

#[derive(Default)]
struct CacheState {
    snapshot: ModelCatalog,
    /// Start time of the fetch that produced `snapshot`.
    fetched_at: Option<Instant>,
    invalidated_at: Option<Instant>,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        match self.fetched_at {
            Some(t) => self.invalidated_at.map_or(true, |i| t >= i) && t.elapsed() < ttl,
            None => false,
        }
    }
}

/// TTL cache in front of the backend's model listing.
pub struct CatalogCache {
    backend: Arc<dyn InferenceBackend>,
    ttl: Duration,
    fetch_timeout: Option<Duration>,
    state: RwLock<CacheState>,
}

impl CatalogCache {
    pub fn new(backend: Arc<dyn InferenceBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            fetch_timeout: None,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Bounds each backend listing; a listing that runs over counts as a
    /// failed one.
    pub fn with_fetch_timeout(mut self, limit: Option<Duration>) -> Self {
        self.fetch_timeout = limit;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached snapshot while it is fresh, otherwise asks the
    /// backend. A failed listing never propagates: the last good snapshot
    /// (empty if there never was one) is served instead.
    ///
    /// Concurrent fetches may finish in any order. A result is only stored
    /// if its fetch started after the one that produced the current
    /// snapshot; an older result is discarded in favour of the cache.
    pub async fn list_models(&self) -> ModelCatalog {
        {
            let st = self.state.read().await;
            if st.is_fresh(self.ttl) {
                return st.snapshot.clone();
            }
        }

        let started = Instant::now();
        match self.fetch().await {
            Ok(models) => {
                let catalog = ModelCatalog::new(models);
                let mut st = self.state.write().await;
                if st.fetched_at.is_some_and(|t| t > started) {
                    debug!(count = catalog.len(), "catalog: listing superseded by a newer fetch");
                    return st.snapshot.clone();
                }
                if st.snapshot != catalog {
                    info!(models = ?catalog.as_slice(), "catalog: refreshed");
                } else {
                    debug!(count = catalog.len(), "catalog: unchanged");
                }
                st.snapshot = catalog.clone();
                st.fetched_at = Some(started);
                catalog
            }
            Err(e) => {
                let st = self.state.read().await;
                warn!(error = %e, stale = st.snapshot.len(), "catalog: listing failed, serving last snapshot");
                st.snapshot.clone()
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<String>, BackendError> {
        let Some(limit) = self.fetch_timeout else {
            return self.backend.list_models().await;
        };
        match tokio::time::timeout(limit, self.backend.list_models()).await {
            Ok(res) => res,
            Err(_) => Err(BackendError::Timeout(format!(
                "model listing exceeded {:.1}s",
                limit.as_secs_f64()
            ))),
        }
    }

    /// Marks the cache stale so the next `list_models` goes to the backend.
    /// Fetches already in flight do not make it fresh again.
    pub async fn force_refresh(&self) {
        self.state.write().await.invalidated_at = Some(Instant::now());
    }

    /// Last snapshot without touching the backend.
    pub async fn cached(&self) -> ModelCatalog {
        self.state.read().await.snapshot.clone()
    }
}
