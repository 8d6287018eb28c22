use serde::{Deserialize, Serialize};

/// Messages longer than this (in chars) with no keyword hit lean creative.
pub const CREATIVE_LENGTH_THRESHOLD: usize = 240;

const CREATIVE_KEYWORDS: &[&str] = &[
    "story", "poem", "lyrics", "song", "script", "creative", "narrative", "write", "compose",
    "imagine",
];

const TECHNICAL_KEYWORDS: &[&str] = &[
    "code", "debug", "refactor", "function", "compile", "error", "bug", "algorithm", "analyze",
    "analysis", "explain", "implement", "api", "database",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Creative,
    Technical,
    Concise,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Creative => "creative",
            Intent::Technical => "technical",
            Intent::Concise => "concise",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword heuristic, creative checked before technical.
pub fn classify(message: &str) -> Intent {
    let text = message.to_lowercase();

    if CREATIVE_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Intent::Creative;
    }
    if TECHNICAL_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Intent::Technical;
    }
    if message.chars().count() > CREATIVE_LENGTH_THRESHOLD {
        return Intent::Creative;
    }
    Intent::Concise
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creative_keywords() {
        assert_eq!(classify("write me a poem"), Intent::Creative);
        assert_eq!(classify("Tell me a STORY about the sea"), Intent::Creative);
    }

    #[test]
    fn test_creative_checked_before_technical() {
        assert_eq!(classify("write a poem about a compile error"), Intent::Creative);
    }

    #[test]
    fn test_technical_keywords() {
        assert_eq!(classify("why does this function panic?"), Intent::Technical);
        assert_eq!(classify("help me debug a database query"), Intent::Technical);
    }

    #[test]
    fn test_long_keyword_free_message_is_creative() {
        let msg = "so ".repeat(100);
        assert!(msg.chars().count() > CREATIVE_LENGTH_THRESHOLD);
        assert_eq!(classify(&msg), Intent::Creative);
    }

    #[test]
    fn test_short_keyword_free_message_is_concise() {
        assert_eq!(classify("hi there"), Intent::Concise);
        assert_eq!(classify(""), Intent::Concise);
    }

    #[test]
    fn test_classify_is_pure() {
        let m = "how are you today?";
        assert_eq!(classify(m), classify(m));
    }
}
