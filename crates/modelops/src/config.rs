use std::path::PathBuf;
use std::time::Duration;

use crate::backend::DecodingParams;
use crate::rank::RankingTable;

pub const DEFAULT_PREFERRED_MODEL: &str = "openhermes:7b-mistral-v2.5-q4_K_M";

/// Everything the selection engine consumes. Built by the service from
/// its environment; the engine never reads env vars itself.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub preferred_model: String,
    pub auto_select: bool,
    pub cache_ttl: Duration,
    pub personality_path: PathBuf,
    pub personality_check_interval: Duration,
    pub history_window: usize,
    /// `None` leaves timing entirely to the backend.
    pub attempt_timeout: Option<Duration>,
    /// Upper bound on one model-list fetch; an overrun serves the cached list.
    pub listing_timeout: Option<Duration>,
    pub decoding: DecodingParams,
    pub ranking: RankingTable,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            preferred_model: DEFAULT_PREFERRED_MODEL.to_string(),
            auto_select: true,
            cache_ttl: Duration::from_secs(30),
            personality_path: PathBuf::from("spectra_prompt.md"),
            personality_check_interval: Duration::from_secs(5),
            history_window: 5,
            attempt_timeout: Some(Duration::from_secs(120)),
            listing_timeout: Some(Duration::from_secs(10)),
            decoding: DecodingParams::default(),
            ranking: RankingTable::default(),
        }
    }
}
