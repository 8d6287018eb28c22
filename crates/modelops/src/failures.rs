use std::collections::BTreeSet;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

const RESOURCE_KEYWORDS: &[&str] = &["resource", "memory", "timeout", "overload", "terminated"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Backend ran out of memory/compute or timed out.
    Resource,
    Transient,
}

pub fn classify_failure(error_text: &str) -> FailureKind {
    let text = error_text.to_lowercase();
    if RESOURCE_KEYWORDS.iter().any(|k| text.contains(k)) {
        FailureKind::Resource
    } else {
        FailureKind::Transient
    }
}

/// Models believed to be resource-constrained. Membership has no TTL; a
/// model leaves the set on its next successful completion or when the
/// set is cleared.
#[derive(Default)]
pub struct FailureTracker {
    failed: RwLock<BTreeSet<String>>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `model` was marked.
    pub async fn mark_if_resource_error(&self, model: &str, error_text: &str) -> bool {
        if classify_failure(error_text) != FailureKind::Resource {
            return false;
        }
        self.mark(model).await;
        true
    }

    pub async fn mark(&self, model: &str) {
        if self.failed.write().await.insert(model.to_string()) {
            warn!(model, "failures: marking model as resource-failed");
        }
    }

    /// Returns true if `model` was in the set.
    pub async fn clear_on_success(&self, model: &str) -> bool {
        let removed = self.failed.write().await.remove(model);
        if removed {
            info!(model, "failures: model recovered");
        }
        removed
    }

    pub async fn contains(&self, model: &str) -> bool {
        self.failed.read().await.contains(model)
    }

    pub async fn snapshot(&self) -> BTreeSet<String> {
        self.failed.read().await.clone()
    }

    /// Sorted member list.
    pub async fn list(&self) -> Vec<String> {
        self.failed.read().await.iter().cloned().collect()
    }

    /// Empties the set and returns what was in it.
    pub async fn clear(&self) -> Vec<String> {
        let drained = std::mem::take(&mut *self.failed.write().await);
        if !drained.is_empty() {
            info!(count = drained.len(), "failures: cleared");
        }
        drained.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_keywords() {
        for e in ["resource exhausted", "CUDA out of MEMORY", "timeout occurred", "system overload", "llama runner process has terminated"] {
            assert_eq!(classify_failure(e), FailureKind::Resource, "{e}");
        }
        for e in ["connection refused", "invalid model", "syntax error"] {
            assert_eq!(classify_failure(e), FailureKind::Transient, "{e}");
        }
    }

    #[tokio::test]
    async fn test_mark_then_clear() {
        let t = FailureTracker::new();

        assert!(t.mark_if_resource_error("m:7b", "CUDA out of memory").await);
        assert!(t.contains("m:7b").await);

        assert!(t.clear_on_success("m:7b").await);
        assert!(!t.contains("m:7b").await);
        assert!(!t.clear_on_success("m:7b").await);
    }

    #[tokio::test]
    async fn test_non_resource_error_is_not_marked() {
        let t = FailureTracker::new();
        assert!(!t.mark_if_resource_error("m:7b", "connection refused").await);
        assert!(!t.contains("m:7b").await);
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_clear_drains() {
        let t = FailureTracker::new();
        t.mark("zeta:1b").await;
        t.mark("alpha:1b").await;
        t.mark("alpha:1b").await;

        assert_eq!(t.list().await, vec!["alpha:1b", "zeta:1b"]);
        assert_eq!(t.clear().await, vec!["alpha:1b", "zeta:1b"]);
        assert!(t.list().await.is_empty());
    }
}
