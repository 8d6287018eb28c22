use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    request_count: u64,
    error_count: u64,
    total_processing: Duration,
}

/// Process-lifetime request counters.
///
/// Synchronous so a request can be recorded from a drop guard.
#[derive(Default)]
pub struct Metrics {
    counters: Mutex<Counters>,
}

/// Read-only view returned by `/api/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub active_model: String,
    pub preferred_model: String,
    pub available_models: Vec<String>,
    pub failed_models: Vec<String>,
    pub auto_model_enabled: bool,
    pub personality_hash: String,
    pub personality_checks: u64,
    pub provider: String,
    pub request_count: u64,
    pub error_count: u64,
    pub avg_processing_time: f64,
    pub cache_ttl: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        // Counters stay consistent even if a holder panicked.
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Call exactly once per finished request.
    pub fn record(&self, duration: Duration, success: bool) {
        let mut c = self.counters();
        c.request_count += 1;
        c.total_processing += duration;
        if !success {
            c.error_count += 1;
        }
    }

    pub fn request_count(&self) -> u64 {
        self.counters().request_count
    }

    pub fn error_count(&self) -> u64 {
        self.counters().error_count
    }

    /// Mean seconds per request, 0 before the first request.
    pub fn average_processing_secs(&self) -> f64 {
        let c = *self.counters();
        if c.request_count == 0 {
            return 0.0;
        }
        c.total_processing.as_secs_f64() / c.request_count as f64
    }
}
