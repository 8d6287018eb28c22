use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use modelops::SelectionConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ollama_host: String,
    pub preferred_model: String,
    pub auto_model: bool,
    pub cache_ttl_secs: u64,
    pub personality_path: PathBuf,
    pub personality_check_secs: u64,
    pub history_window: usize,
    pub attempt_timeout_secs: u64,
    pub list_timeout_secs: u64,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let ollama_host = get_or("OLLAMA_HOST", "http://127.0.0.1:11434");
        let preferred_model = get_or("OLLAMA_MODEL", modelops::config::DEFAULT_PREFERRED_MODEL);
        let auto_model = var("SPECTRA_AUTO_MODEL").map(|v| parse_bool(&v)).unwrap_or(true);
        let cache_ttl_secs = parse_num(&get_or("SPECTRA_MODEL_CACHE_TTL", "30"), "SPECTRA_MODEL_CACHE_TTL")?;
        let personality_path = PathBuf::from(get_or("SPECTRA_PERSONALITY_PATH", "spectra_prompt.md"));
        let personality_check_secs = parse_num(
            &get_or("SPECTRA_PERSONALITY_CHECK_INTERVAL", "5"),
            "SPECTRA_PERSONALITY_CHECK_INTERVAL",
        )?;
        let history_window = parse_num(&get_or("SPECTRA_HISTORY_WINDOW", "5"), "SPECTRA_HISTORY_WINDOW")?;
        let attempt_timeout_secs = parse_num(&get_or("SPECTRA_ATTEMPT_TIMEOUT", "120"), "SPECTRA_ATTEMPT_TIMEOUT")?;
        let list_timeout_secs = parse_num(&get_or("SPECTRA_LIST_TIMEOUT", "10"), "SPECTRA_LIST_TIMEOUT")?;
        let host = get_or("HOST", "127.0.0.1");
        let port = parse_num(&get_or("PORT", "5000"), "PORT")?;

        // Tiny sanity checks (fail fast, fail loud)
        if !ollama_host.starts_with("http://") && !ollama_host.starts_with("https://") {
            bail!("OLLAMA_HOST must start with http:// or https://");
        }
        if preferred_model.trim().is_empty() {
            bail!("OLLAMA_MODEL must not be empty");
        }
        if history_window == 0 {
            bail!("SPECTRA_HISTORY_WINDOW must be at least 1");
        }

        Ok(Self {
            ollama_host: ollama_host.trim_end_matches('/').to_string(),
            preferred_model,
            auto_model,
            cache_ttl_secs,
            personality_path,
            personality_check_secs,
            history_window,
            attempt_timeout_secs,
            list_timeout_secs,
            host,
            port,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn selection(&self) -> SelectionConfig {
        SelectionConfig {
            preferred_model: self.preferred_model.clone(),
            auto_select: self.auto_model,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            personality_path: self.personality_path.clone(),
            personality_check_interval: Duration::from_secs(self.personality_check_secs),
            history_window: self.history_window,
            attempt_timeout: (self.attempt_timeout_secs > 0)
                .then(|| Duration::from_secs(self.attempt_timeout_secs)),
            listing_timeout: (self.list_timeout_secs > 0).then(|| Duration::from_secs(self.list_timeout_secs)),
            ..SelectionConfig::default()
        }
    }

    /// HTTP-level cap for the backend client. Slightly above the engine's
    /// own attempt limit so the engine reports the timeout first.
    pub fn http_timeout(&self) -> Option<Duration> {
        (self.attempt_timeout_secs > 0).then(|| Duration::from_secs(self.attempt_timeout_secs + 5))
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_num<T: std::str::FromStr>(v: &str, key: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    v.trim()
        .parse()
        .with_context(|| format!("Invalid value for {key}: {v:?}"))
}
