use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

pub const DEFAULT_PERSONALITY: &str = "You are Spectra, an emotionally intelligent AI assistant. \
You are empathetic, creative and supportive, with a focus on music, healing and emotional connection. \
Respond with warmth and genuine care, and keep a natural, human conversational style.";

/// The system prompt currently in effect. `hash` is always the hash of
/// `content`; both are replaced together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalityDocument {
    pub content: String,
    pub hash: String,
    pub modified: Option<SystemTime>,
    pub from_file: bool,
}

impl PersonalityDocument {
    pub fn builtin() -> Self {
        Self {
            content: DEFAULT_PERSONALITY.to_string(),
            hash: content_hash(DEFAULT_PERSONALITY),
            modified: None,
            from_file: false,
        }
    }

    fn from_file(content: String, modified: Option<SystemTime>) -> Self {
        Self {
            hash: content_hash(&content),
            content,
            modified,
            from_file: true,
        }
    }
}

/// blake3 over the UTF-8 bytes, hex encoded.
pub fn content_hash(content: &str) -> String {
    hex::encode(blake3::hash(content.as_bytes()).as_bytes())
}

async fn read_document(path: &Path) -> Option<PersonalityDocument> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "personality: file not found, using built-in default");
            return None;
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "personality: read failed, using built-in default");
            return None;
        }
    };
    let modified = tokio::fs::metadata(path).await.ok().and_then(|m| m.modified().ok());
    Some(PersonalityDocument::from_file(content, modified))
}

/// Loads the personality file and hot-reloads it on a rate-limited
/// schedule.
pub struct PersonalityLoader {
    path: PathBuf,
    interval: Duration,
    doc: RwLock<Arc<PersonalityDocument>>,
    last_check: Mutex<Instant>,
    checks: AtomicU64,
}

impl PersonalityLoader {
    /// Never fails; a missing or unreadable file yields the built-in prompt.
    pub async fn load(path: impl Into<PathBuf>, interval: Duration) -> Self {
        let path = path.into();
        let doc = match read_document(&path).await {
            Some(d) => {
                info!(path = %path.display(), hash = %d.hash, "personality: loaded from file");
                d
            }
            None => PersonalityDocument::builtin(),
        };

        Self {
            path,
            interval,
            doc: RwLock::new(Arc::new(doc)),
            last_check: Mutex::new(Instant::now()),
            checks: AtomicU64::new(0),
        }
    }

    pub async fn current(&self) -> Arc<PersonalityDocument> {
        self.doc.read().await.clone()
    }

    pub async fn hash(&self) -> String {
        self.doc.read().await.hash.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of stat+read checks actually performed by `maybe_reload`.
    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    /// Re-checks the file if the check interval has elapsed. Returns true
    /// only when new content was swapped in.
    pub async fn maybe_reload(&self) -> bool {
        {
            let mut last = self.last_check.lock().await;
            if last.elapsed() < self.interval {
                return false;
            }
            *last = Instant::now();
        }
        self.checks.fetch_add(1, Ordering::Relaxed);

        let modified = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.modified().ok(),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "personality: stat failed, keeping current");
                return false;
            }
        };

        let current = self.current().await;
        if modified.is_some() && modified == current.modified {
            return false;
        }

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "personality: reread failed, keeping current");
                return false;
            }
        };

        let next = PersonalityDocument::from_file(content, modified);
        let mut doc = self.doc.write().await;
        if next.hash == doc.hash {
            // touched but identical: remember the mtime so we stop rereading
            let mut same = (**doc).clone();
            same.modified = modified;
            *doc = Arc::new(same);
            return false;
        }

        info!(path = %self.path.display(), old = %doc.hash, new = %next.hash, "personality: reloaded");
        *doc = Arc::new(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    fn bump_mtime(path: &Path, secs: u64) {
        let f = File::options().write(true).open(path).unwrap();
        f.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs))
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let loader = PersonalityLoader::load(dir.path().join("nope.md"), Duration::ZERO).await;

        let doc = loader.current().await;
        assert!(!doc.from_file);
        assert_eq!(doc.content, DEFAULT_PERSONALITY);
        assert_eq!(doc.hash, content_hash(DEFAULT_PERSONALITY));
    }

    #[tokio::test]
    async fn test_loads_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        fs::write(&path, "be brief").unwrap();

        let loader = PersonalityLoader::load(&path, Duration::ZERO).await;
        let doc = loader.current().await;
        assert!(doc.from_file);
        assert_eq!(doc.content, "be brief");
        assert_eq!(doc.hash, content_hash("be brief"));
    }

    #[tokio::test]
    async fn test_reload_swaps_changed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        fs::write(&path, "v1").unwrap();
        bump_mtime(&path, 1);
        let loader = PersonalityLoader::load(&path, Duration::ZERO).await;

        fs::write(&path, "v2").unwrap();
        bump_mtime(&path, 2);

        assert!(loader.maybe_reload().await);
        let doc = loader.current().await;
        assert_eq!(doc.content, "v2");
        assert_eq!(doc.hash, content_hash("v2"));
    }

    #[tokio::test]
    async fn test_touch_with_same_content_keeps_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        fs::write(&path, "same").unwrap();
        bump_mtime(&path, 1);
        let loader = PersonalityLoader::load(&path, Duration::ZERO).await;
        let before = loader.hash().await;

        bump_mtime(&path, 5);
        assert!(!loader.maybe_reload().await);
        assert!(!loader.maybe_reload().await);
        assert_eq!(loader.hash().await, before);
    }

    #[tokio::test]
    async fn test_checks_are_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        fs::write(&path, "v1").unwrap();
        let loader = PersonalityLoader::load(&path, Duration::from_secs(3600)).await;

        fs::write(&path, "v2").unwrap();
        bump_mtime(&path, 9);
        loader.maybe_reload().await;
        loader.maybe_reload().await;

        assert!(loader.checks() <= 1);
        assert_eq!(loader.current().await.content, "v1");
    }

    #[tokio::test]
    async fn test_file_created_after_startup_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        let loader = PersonalityLoader::load(&path, Duration::ZERO).await;
        assert!(!loader.current().await.from_file);

        fs::write(&path, "hello").unwrap();
        assert!(loader.maybe_reload().await);
        assert_eq!(loader.current().await.content, "hello");
        assert_eq!(loader.checks(), 1);
    }
}
