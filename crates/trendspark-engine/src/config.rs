//! Engine configuration
//!
//! Loaded once at startup, either from a JSON file (`TRENDSPARK_CONFIG`) or
//! from process environment. Secrets left out of the file are resolved from
//! the environment, so a checked-in config never needs to carry keys.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, Result};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Per-request maximum of the Custom Search API
pub const SEARCH_PROVIDER_MAX_RESULTS: u8 = 10;

/// Probed in order; the first model that answers is used for the process.
pub const DEFAULT_MODEL_CANDIDATES: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.5-flash",
];

const GENERATIVE_KEY_ENV: &str = "GOOGLE_API_KEY";
const GENERATIVE_KEY_ENV_ALT: &str = "GEMINI_API_KEY";
const SEARCH_KEY_ENV: &str = "GOOGLE_SEARCH_API_KEY";
const SEARCH_CX_ENV: &str = "GOOGLE_SEARCH_CX";

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Generative-text service settings
    pub generative: GenerativeSettings,

    /// Web search settings
    pub search: SearchSettings,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generative(mut self, generative: GenerativeSettings) -> Self {
        self.generative = generative;
        self
    }

    pub fn with_search(mut self, search: SearchSettings) -> Self {
        self.search = search;
        self
    }

    /// Config file named by `TRENDSPARK_CONFIG` if it exists and parses,
    /// otherwise the environment.
    pub fn load() -> Result<Self> {
        let lookup = |key: &str| std::env::var(key).ok();

        if let Some(path) = lookup("TRENDSPARK_CONFIG").map(PathBuf::from) {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return Ok(config),
                    Err(error) => {
                        tracing::warn!(
                            "Invalid config at {:?}: {}. Falling back to environment configuration.",
                            path,
                            error
                        );
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Build from process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (process env, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(models) = lookup("TRENDSPARK_MODELS") {
            let candidates: Vec<String> = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
            if !candidates.is_empty() {
                config.generative.candidate_models = candidates;
            }
        }
        if let Some(base_url) = lookup("TRENDSPARK_GEMINI_BASE_URL") {
            config.generative.base_url = base_url;
        }
        if let Some(secs) = lookup("TRENDSPARK_GENERATION_TIMEOUT_SECS").and_then(|v| v.parse().ok())
        {
            config.generative.request_timeout_secs = Some(secs);
        }
        if let Some(max) = lookup("TRENDSPARK_MAX_COMPETITORS")
            .and_then(|v| v.trim().parse::<i64>().ok())
        {
            config.search.max_results = max.clamp(1, i64::from(SEARCH_PROVIDER_MAX_RESULTS)) as u8;
        }
        if let Some(secs) = lookup("TRENDSPARK_SEARCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.search.timeout_secs = secs;
        }

        config.resolve_secrets(lookup)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load a JSON file, filling secrets it omits from the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_file(path)?.resolve_secrets(|key| std::env::var(key).ok()))
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn resolve_secrets<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.generative.api_key.is_none() {
            self.generative.api_key = resolve_key(
                &self.generative.api_key_env,
                &[GENERATIVE_KEY_ENV, GENERATIVE_KEY_ENV_ALT],
                &lookup,
            );
        }
        if self.search.api_key.is_none() {
            self.search.api_key = resolve_key(&self.search.api_key_env, &[SEARCH_KEY_ENV], &lookup);
        }
        if self.search.engine_id.is_none() {
            self.search.engine_id = resolve_key(&None, &[SEARCH_CX_ENV], &lookup);
        }
        self
    }

    /// Startup validation. A missing generative key is fatal; missing
    /// search credentials only disable competitor search.
    pub fn validate(&self) -> Result<()> {
        if self.generative.api_key().is_none() {
            return Err(EngineError::MissingCredential(format!(
                "set {} (or {}) to enable the generative analysis",
                GENERATIVE_KEY_ENV, GENERATIVE_KEY_ENV_ALT
            )));
        }
        if self.generative.candidate_models.is_empty() {
            return Err(EngineError::InvalidConfig(
                "at least one candidate model is required".to_string(),
            ));
        }
        if self.search.credentials().is_none() {
            tracing::info!(
                "{} / {} not set; competitor search is disabled",
                SEARCH_KEY_ENV,
                SEARCH_CX_ENV
            );
        }
        Ok(())
    }
}

fn resolve_key<F>(env_hint: &Option<String>, defaults: &[&str], lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env_hint
        .iter()
        .map(String::as_str)
        .chain(defaults.iter().copied())
        .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
}

/// Generative-text service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerativeSettings {
    /// API key (optional in files; resolved from env when absent)
    pub api_key: Option<String>,

    /// Env var to read the key from, before the defaults
    pub api_key_env: Option<String>,

    /// Service base URL
    pub base_url: String,

    /// Model identifiers in probe order
    pub candidate_models: Vec<String>,

    /// Per-call timeout; unset means no client-side limit
    pub request_timeout_secs: Option<u64>,
}

impl Default for GenerativeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            candidate_models: DEFAULT_MODEL_CANDIDATES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            request_timeout_secs: None,
        }
    }
}

impl GenerativeSettings {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_candidate_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate_models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Web search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Custom Search API key
    pub api_key: Option<String>,

    /// Env var to read the key from, before the default
    pub api_key_env: Option<String>,

    /// Programmable search engine id (`cx`)
    pub engine_id: Option<String>,

    /// Search endpoint
    pub endpoint: String,

    /// Results requested per search, capped at the provider maximum
    pub max_results: u8,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: None,
            engine_id: None,
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            max_results: 3,
            timeout_secs: 10,
        }
    }
}

impl SearchSettings {
    pub fn with_credentials(mut self, api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self.engine_id = Some(engine_id.into());
        self
    }

    pub fn with_max_results(mut self, max_results: u8) -> Self {
        self.max_results = max_results;
        self
    }

    /// Key and engine id, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        let cx = self.engine_id.as_deref().filter(|c| !c.trim().is_empty())?;
        Some((key, cx))
    }

    /// `max_results` bounded to `1..=SEARCH_PROVIDER_MAX_RESULTS`.
    pub fn effective_max_results(&self) -> u8 {
        self.max_results.clamp(1, SEARCH_PROVIDER_MAX_RESULTS)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.generative.candidate_models[0], "gemini-2.5-flash");
        assert_eq!(config.search.max_results, 3);
        assert!(config.search.credentials().is_none());
        assert!(config.generative.request_timeout().is_none());
    }

    #[test]
    fn test_from_lookup_reads_credentials_and_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "g-key"),
            ("GOOGLE_SEARCH_API_KEY", "s-key"),
            ("GOOGLE_SEARCH_CX", "cx-1"),
            ("TRENDSPARK_MODELS", "model-a, model-b,,"),
            ("TRENDSPARK_MAX_COMPETITORS", "7"),
        ]));

        assert_eq!(config.generative.api_key(), Some("g-key"));
        assert_eq!(config.generative.candidate_models, vec!["model-a", "model-b"]);
        assert_eq!(config.search.credentials(), Some(("s-key", "cx-1")));
        assert_eq!(config.search.max_results, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_primary_key_wins_over_alternate() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "primary"),
            ("GEMINI_API_KEY", "secondary"),
        ]));
        assert_eq!(config.generative.api_key(), Some("primary"));
    }

    #[test]
    fn test_missing_generative_key_is_fatal() {
        let config = EngineConfig::from_lookup(lookup_from(&[("GOOGLE_SEARCH_API_KEY", "s")]));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EngineError::MissingCredential(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_search_credentials_are_not_fatal() {
        let config = EngineConfig::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "g")]));
        assert!(config.validate().is_ok());
        assert!(config.search.credentials().is_none());
    }

    #[test]
    fn test_effective_max_results_is_capped() {
        assert_eq!(SearchSettings::default().with_max_results(50).effective_max_results(), 10);
        assert_eq!(SearchSettings::default().with_max_results(0).effective_max_results(), 1);
    }

    #[test]
    fn test_max_competitors_env_is_clamped() {
        let high = EngineConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "g"),
            ("TRENDSPARK_MAX_COMPETITORS", "300"),
        ]));
        assert_eq!(high.search.max_results, 10);
        assert_eq!(high.search.effective_max_results(), 10);

        let zero = EngineConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "g"),
            ("TRENDSPARK_MAX_COMPETITORS", "0"),
        ]));
        assert_eq!(zero.search.max_results, 1);
        assert!(zero.validate().is_ok());

        let negative =
            EngineConfig::from_lookup(lookup_from(&[("TRENDSPARK_MAX_COMPETITORS", "-4")]));
        assert_eq!(negative.search.max_results, 1);
    }

    #[test]
    fn test_zero_max_results_in_file_is_not_fatal() {
        let config = EngineConfig::new()
            .with_generative(GenerativeSettings::default().with_api_key("g"))
            .with_search(SearchSettings::default().with_max_results(0));
        assert!(config.validate().is_ok());
        assert_eq!(config.search.effective_max_results(), 1);
    }

    #[test]
    fn test_config_file_roundtrip_keeps_secrets_out() {
        let dir = tempfile::Builder::new()
            .prefix("trendspark_config_")
            .tempdir()
            .expect("should create tempdir");
        let path = dir.path().join("config.json");

        let config = EngineConfig::new().with_search(SearchSettings::default().with_max_results(5));
        config.to_file(&path).unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.search.max_results, 5);
        assert!(loaded.generative.api_key.is_none());

        let resolved = loaded.resolve_secrets(lookup_from(&[("GOOGLE_API_KEY", "from-env")]));
        assert_eq!(resolved.generative.api_key(), Some("from-env"));
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"search": {"max_results": 4}}"#).unwrap();
        assert_eq!(config.search.max_results, 4);
        assert_eq!(config.search.endpoint, DEFAULT_SEARCH_ENDPOINT);
        assert_eq!(config.generative.base_url, DEFAULT_GEMINI_BASE_URL);
    }
}
