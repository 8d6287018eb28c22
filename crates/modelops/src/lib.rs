//! Adaptive model selection and failover for a local inference backend.
//!
//! The [`ChatEngine`] ties the pieces together: a TTL-cached model
//! catalog, shorthand resolution, intent-based ranking, a self-healing
//! set of resource-failed models and a hot-reloaded system prompt.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod failures;
pub mod intent;
pub mod metrics;
pub mod personality;
pub mod rank;
pub mod resolve;

pub use backend::*;
pub use catalog::{CatalogCache, ModelCatalog};
pub use config::SelectionConfig;
pub use engine::{build_context, AttemptFailure, AttemptOutcome, ChatEngine, ChatOutcome, EngineError, ModelSelection};
pub use failures::{classify_failure, FailureKind, FailureTracker};
pub use intent::{classify, Intent};
pub use metrics::{Metrics, MetricsSnapshot};
pub use personality::{PersonalityDocument, PersonalityLoader};
pub use rank::{rank, RankingTable};
pub use resolve::{normalize, select_initial};
