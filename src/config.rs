//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for full-text evaluation.
///
/// Loaded from the embedding database's configuration layer; everything has
/// a working default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum token distance assumed by `near()` when the query does not
    /// give one explicitly. Adjacent tokens are at distance 1.
    pub default_near_distance: u32,

    /// Terms that are never indexed and never match during scans.
    /// Compared case-insensitively.
    pub stopwords: Vec<String>,

    /// When false, only node membership is computed and no per-node
    /// `Match` records are kept.
    pub track_matches: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_near_distance: 1,
            stopwords: Vec::new(),
            track_matches: true,
        }
    }
}

impl EngineConfig {
    pub fn is_stopword(&self, term: &str) -> bool {
        self.stopwords.iter().any(|s| s.eq_ignore_ascii_case(term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_near_distance, 1);
        assert!(config.track_matches);
        assert!(!config.is_stopword("the"));
    }

    #[test]
    fn stopwords_case_insensitive() {
        let config = EngineConfig {
            stopwords: vec!["the".into(), "of".into()],
            ..EngineConfig::default()
        };
        assert!(config.is_stopword("The"));
        assert!(config.is_stopword("OF"));
        assert!(!config.is_stopword("fox"));
    }
}
