use tracing::{info, warn};

use crate::catalog::ModelCatalog;

/// Used when the preferred model cannot be resolved. Small models come
/// first so a memory-starved host still gets a working default.
pub const FALLBACK_ORDER: &[&str] = &[
    "phi:latest",
    "phi2:latest",
    "qwen2:0.5b",
    "llama3.2:1b",
    "mistral:7b",
    "openhermes:7b-mistral-v2.5-q4_K_M",
    "openhermes2.5-mistral",
    "openhermes:latest",
    "mistral:latest",
    "llama2:latest",
];

/// Resolves an exact name or shorthand against the catalog.
///
/// A case-insensitive exact match wins (a case-sensitive one first if
/// several differ only in case). Otherwise the lexicographically smallest
/// entry containing `name` case-insensitively is returned.
pub fn normalize(name: &str, catalog: &ModelCatalog) -> Option<String> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    if catalog.contains(name) {
        return Some(name.to_string());
    }

    let exact = catalog
        .iter()
        .filter(|m| m.to_lowercase() == wanted)
        .min();
    if let Some(m) = exact {
        return Some(m.clone());
    }

    catalog
        .iter()
        .filter(|m| m.to_lowercase().contains(&wanted))
        .min()
        .cloned()
}

/// Picks the model a fresh process (or a request whose active model
/// vanished) should treat as active.
pub fn select_initial(preferred: &str, catalog: &ModelCatalog) -> String {
    if catalog.is_empty() {
        warn!(preferred, "resolve: no models available, keeping preferred name");
        return preferred.to_string();
    }

    if let Some(m) = normalize(preferred, catalog) {
        if m != preferred {
            info!(shorthand = preferred, resolved = %m, "resolve: shorthand resolved");
        }
        return m;
    }

    if let Some(m) = FALLBACK_ORDER.iter().find(|c| catalog.contains(c)) {
        warn!(preferred, fallback = *m, "resolve: using fallback model");
        return m.to_string();
    }

    let first = catalog.as_slice()[0].clone();
    warn!(preferred, first = %first, "resolve: using first available model");
    first
}
