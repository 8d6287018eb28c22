use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::backend::{ChatRequest, ChatTurn, Completion, InferenceBackend, ProviderInfo, Role};
use crate::catalog::{CatalogCache, ModelCatalog};
use crate::config::SelectionConfig;
use crate::failures::{classify_failure, FailureKind, FailureTracker};
use crate::intent::{classify, Intent};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::personality::PersonalityLoader;
use crate::rank::rank;
use crate::resolve::{normalize, select_initial};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("all {attempts} candidate model(s) failed; last model {model}: {error}")]
    Exhausted {
        model: String,
        error: String,
        attempts: usize,
        elapsed: Duration,
    },
}

impl EngineError {
    pub fn elapsed(&self) -> Duration {
        match self {
            EngineError::Exhausted { elapsed, .. } => *elapsed,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    fn from_text(message: String) -> Self {
        Self { kind: classify_failure(&message), message }
    }
}

/// Result of one backend call; the retry loop is driven on this.
#[derive(Debug)]
pub enum AttemptOutcome {
    Completed(Completion),
    Failed(AttemptFailure),
}

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub model_used: String,
    pub intent: Intent,
    pub attempts: usize,
    pub processing_time: Duration,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub previous: String,
    pub selected: String,
    pub available: ModelCatalog,
}

impl ModelSelection {
    pub fn changed(&self) -> bool {
        self.previous != self.selected
    }
}

/// System turn, the trailing `window` history turns that have content,
/// then the new user turn.
pub fn build_context(system: &str, history: &[ChatTurn], message: &str, window: usize) -> Vec<ChatTurn> {
    let start = history.len().saturating_sub(window);
    let mut out = Vec::with_capacity(window + 2);
    out.push(ChatTurn::new(Role::System, system));
    out.extend(
        history[start..]
            .iter()
            .filter(|t| !t.content.trim().is_empty())
            .cloned(),
    );
    out.push(ChatTurn::new(Role::User, message));
    out
}

/// Records the request when dropped, so a caller that abandons
/// `generate` mid-flight still gets counted, as a failure.
struct RequestRecord<'a> {
    metrics: &'a Metrics,
    started: Instant,
    success: bool,
}

impl Drop for RequestRecord<'_> {
    fn drop(&mut self) {
        self.metrics.record(self.started.elapsed(), self.success);
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Model selection and failover in front of one inference backend.
///
/// One instance per process, shared by handle between request handlers.
pub struct ChatEngine {
    cfg: SelectionConfig,
    backend: Arc<dyn InferenceBackend>,
    catalog: CatalogCache,
    failures: FailureTracker,
    personality: PersonalityLoader,
    metrics: Metrics,
    active: RwLock<String>,
}

impl ChatEngine {
    pub async fn new(cfg: SelectionConfig, backend: Arc<dyn InferenceBackend>) -> Self {
        let catalog = CatalogCache::new(backend.clone(), cfg.cache_ttl).with_fetch_timeout(cfg.listing_timeout);
        let models = catalog.list_models().await;
        let active = select_initial(&cfg.preferred_model, &models);
        let personality =
            PersonalityLoader::load(cfg.personality_path.clone(), cfg.personality_check_interval).await;

        info!(
            active = %active,
            available = models.len(),
            auto_select = cfg.auto_select,
            "engine: initialized"
        );

        Self {
            cfg,
            backend,
            catalog,
            failures: FailureTracker::new(),
            personality,
            metrics: Metrics::new(),
            active: RwLock::new(active),
        }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.cfg
    }

    pub fn failures(&self) -> &FailureTracker {
        &self.failures
    }

    pub fn personality(&self) -> &PersonalityLoader {
        &self.personality
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn provider_info(&self) -> ProviderInfo {
        self.backend.info()
    }

    pub async fn ping(&self) -> bool {
        self.backend.ping().await.is_ok()
    }

    pub async fn active_model(&self) -> String {
        self.active.read().await.clone()
    }

    pub async fn list_models(&self) -> ModelCatalog {
        self.catalog.list_models().await
    }

    pub async fn refresh_models(&self) -> ModelCatalog {
        self.catalog.force_refresh().await;
        self.catalog.list_models().await
    }

    /// Explicit override of the active model; accepts shorthand. Unknown
    /// names leave the active model untouched.
    pub async fn set_model(&self, desired: &str) -> ModelSelection {
        let available = self.refresh_models().await;
        let mut active = self.active.write().await;
        let previous = active.clone();

        match normalize(desired, &available) {
            Some(m) => {
                if m != previous {
                    info!(from = %previous, to = %m, requested = desired, "engine: model changed");
                }
                *active = m;
            }
            None => {
                warn!(requested = desired, keeping = %previous, "engine: requested model not found");
            }
        }

        ModelSelection {
            previous,
            selected: active.clone(),
            available,
        }
    }

    pub async fn clear_failures(&self) -> Vec<String> {
        self.failures.clear().await
    }

    /// Handles one chat message end to end. Metrics are recorded exactly
    /// once whatever the outcome, including when the future is dropped.
    pub async fn generate(&self, message: &str, history: &[ChatTurn]) -> Result<ChatOutcome> {
        let mut record = RequestRecord {
            metrics: &self.metrics,
            started: Instant::now(),
            success: false,
        };
        let res = self.run(message, history, record.started).await;
        record.success = res.is_ok();
        res
    }

    async fn run(&self, message: &str, history: &[ChatTurn], started: Instant) -> Result<ChatOutcome> {
        self.personality.maybe_reload().await;

        let catalog = self.catalog.list_models().await;
        self.revalidate_active(&catalog).await;

        let intent = classify(message);
        let plan = self.attempt_plan(intent, &catalog).await;

        let system = self.personality.current().await;
        let messages = build_context(&system.content, history, message, self.cfg.history_window);
        info!(%intent, turns = messages.len(), candidates = ?plan, "engine: context built");

        let mut last_error = String::new();
        for (i, model) in plan.iter().enumerate() {
            info!(attempt = i + 1, of = plan.len(), model = %model, "engine: attempting");

            let req = ChatRequest {
                model: model.clone(),
                messages: messages.clone(),
                params: self.cfg.decoding.clone(),
            };

            match self.attempt(req).await {
                AttemptOutcome::Completed(done) => {
                    self.failures.clear_on_success(model).await;
                    self.promote(model).await;
                    return Ok(ChatOutcome {
                        response: done.content,
                        model_used: model.clone(),
                        intent,
                        attempts: i + 1,
                        processing_time: started.elapsed(),
                        timestamp: chrono::Utc::now(),
                    });
                }
                AttemptOutcome::Failed(failure) => {
                    warn!(model = %model, kind = ?failure.kind, error = %failure.message, "engine: attempt failed");
                    if failure.kind == FailureKind::Resource {
                        self.failures.mark(model).await;
                    }
                    last_error = failure.message;
                }
            }
        }

        let model = plan.last().cloned().unwrap_or_default();
        error!(model = %model, error = %last_error, attempts = plan.len(), "engine: all candidates exhausted");
        Err(EngineError::Exhausted {
            model,
            error: last_error,
            attempts: plan.len(),
            elapsed: started.elapsed(),
        })
    }

    /// Ordered, de-duplicated list of models to try. Never empty.
    async fn attempt_plan(&self, intent: Intent, catalog: &ModelCatalog) -> Vec<String> {
        let active = self.active_model().await;
        let failed = self.failures.snapshot().await;

        let (mut plan, fallbacks) = if self.cfg.auto_select {
            let ranked = rank(&self.cfg.ranking, intent, catalog, &failed, &active);
            if ranked[0] != active {
                info!(%intent, chosen = %ranked[0], "engine: contextual selection");
            }
            (ranked, vec![active])
        } else {
            let ranked = rank(&self.cfg.ranking, Intent::Concise, catalog, &failed, &active);
            (vec![active], ranked)
        };

        for m in fallbacks {
            if !plan.contains(&m) {
                plan.push(m);
            }
        }
        plan
    }

    /// Runs one backend call on its own task so a slow or panicking
    /// backend cannot stall or unwind the caller. The task is aborted on
    /// timeout and when the caller stops waiting.
    async fn attempt(&self, req: ChatRequest) -> AttemptOutcome {
        let backend = self.backend.clone();
        let mut handle = tokio::spawn(async move { backend.chat(&req).await });
        let _abort = AbortOnDrop(handle.abort_handle());

        let joined = match self.cfg.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(j) => j,
                Err(_) => {
                    return AttemptOutcome::Failed(AttemptFailure::from_text(format!(
                        "attempt timeout after {:.1}s",
                        limit.as_secs_f64()
                    )));
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(done)) => AttemptOutcome::Completed(done),
            Ok(Err(e)) => AttemptOutcome::Failed(AttemptFailure::from_text(e.to_string())),
            Err(e) => AttemptOutcome::Failed(AttemptFailure {
                kind: FailureKind::Transient,
                message: format!("backend task failed: {e}"),
            }),
        }
    }

    /// Last writer wins between concurrent requests.
    async fn promote(&self, model: &str) {
        let mut active = self.active.write().await;
        if *active != model {
            info!(from = %*active, to = model, "engine: promoting model after success");
            *active = model.to_string();
        }
    }

    async fn revalidate_active(&self, catalog: &ModelCatalog) {
        if catalog.is_empty() || catalog.contains(&self.active_model().await) {
            return;
        }
        let mut active = self.active.write().await;
        if !catalog.contains(&active) {
            let next = select_initial(&self.cfg.preferred_model, catalog);
            info!(from = %*active, to = %next, "engine: active model no longer loaded");
            *active = next;
        }
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_model: self.active_model().await,
            preferred_model: self.cfg.preferred_model.clone(),
            available_models: self.catalog.cached().await.as_slice().to_vec(),
            failed_models: self.failures.list().await,
            auto_model_enabled: self.cfg.auto_select,
            personality_hash: self.personality.hash().await,
            personality_checks: self.personality.checks(),
            provider: self.backend.info().name,
            request_count: self.metrics.request_count(),
            error_count: self.metrics.error_count(),
            avg_processing_time: self.metrics.average_processing_secs(),
            cache_ttl: self.catalog.ttl().as_secs(),
            timestamp: chrono::Utc::now(),
        }
    }
}
