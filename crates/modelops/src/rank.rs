use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::ModelCatalog;
use crate::intent::Intent;

/// Ordered family-name fragments per intent, most preferred first.
#[derive(Debug, Clone, Serialize)]
pub struct RankingTable {
    pub creative: Vec<String>,
    pub technical: Vec<String>,
    pub concise: Vec<String>,
}

impl RankingTable {
    pub fn new(creative: &[&str], technical: &[&str], concise: &[&str]) -> Self {
        let own = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() };
        Self {
            creative: own(creative),
            technical: own(technical),
            concise: own(concise),
        }
    }

    pub fn fragments(&self, intent: Intent) -> &[String] {
        match intent {
            Intent::Creative => &self.creative,
            Intent::Technical => &self.technical,
            Intent::Concise => &self.concise,
        }
    }
}

impl Default for RankingTable {
    /// Capable models first for creative work, code-tuned families for
    /// technical questions, smallest first for quick answers.
    fn default() -> Self {
        Self::new(
            &["openhermes", "mistral", "llama3", "phi", "qwen2"],
            &["coder", "mistral", "openhermes", "llama3", "phi", "qwen2"],
            &["qwen2", "phi", "llama3", "mistral", "openhermes"],
        )
    }
}

/// Candidate models for `intent`, best first.
///
/// Each fragment contributes the first catalog entry (in catalog order)
/// that contains it and is not in `failed`. Falls back to the active
/// model when nothing matches, so the result is never empty.
pub fn rank(
    table: &RankingTable,
    intent: Intent,
    catalog: &ModelCatalog,
    failed: &BTreeSet<String>,
    active: &str,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for frag in table.fragments(intent) {
        let frag = frag.to_lowercase();
        let hit = catalog.iter().find(|m| {
            !failed.contains(*m) && !out.contains(*m) && m.to_lowercase().contains(&frag)
        });
        if let Some(m) = hit {
            out.push(m.clone());
        }
    }

    if out.is_empty() {
        out.push(active.to_string());
    }
    out
}
