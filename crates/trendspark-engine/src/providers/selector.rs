use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::{GeminiClient, GenerationParams, TextGenerator};
use crate::config::GenerativeSettings;
use crate::error::{EngineError, Result};

const PROBE_PROMPT: &str = "Reply with the single word: ok";

/// Why a candidate model was skipped during selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Rate limited, out of quota or temporarily unavailable
    Throttled,
    /// Unknown model id or model without text generation
    Unsupported,
    Other,
}

impl ProbeFailure {
    pub fn classify(error: &EngineError) -> Self {
        let (status, message) = match error {
            EngineError::Provider { status, message } => (Some(*status), message.as_str()),
            EngineError::Http(message) => (None, message.as_str()),
            _ => return ProbeFailure::Other,
        };

        if matches!(status, Some(429) | Some(503)) || throttle_pattern().is_match(message) {
            ProbeFailure::Throttled
        } else if status == Some(404) || unsupported_pattern().is_match(message) {
            ProbeFailure::Unsupported
        } else {
            ProbeFailure::Other
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProbeFailure::Throttled => "throttled",
            ProbeFailure::Unsupported => "unsupported",
            ProbeFailure::Other => "failed",
        };
        f.write_str(label)
    }
}

fn throttle_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)quota|rate.?limit|resource.?exhausted|unavailable|overloaded")
            .expect("throttle pattern is valid")
    })
}

fn unsupported_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)not.?found|not supported|unsupported").expect("unsupported pattern is valid")
    })
}

/// Picks the working model once, at startup
#[derive(Debug, Clone)]
pub struct ModelSelector {
    candidates: Vec<String>,
}

impl ModelSelector {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let candidates = candidates
            .into_iter()
            .map(Into::into)
            .filter(|c: &String| seen.insert(c.clone()))
            .collect();
        Self { candidates }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Probe each candidate in order and return the first that answers.
    pub async fn select<F>(&self, build: F) -> Result<Arc<dyn TextGenerator>>
    where
        F: Fn(&str) -> Arc<dyn TextGenerator>,
    {
        let mut attempts = Vec::new();
        let probe = GenerationParams::probe();

        for model in &self.candidates {
            let generator = build(model.as_str());
            match generator.generate(PROBE_PROMPT, &probe).await {
                Ok(_) => {
                    tracing::info!("Using generative model {}", model);
                    return Ok(generator);
                }
                // A blocked or empty probe reply still proves the model is serving.
                Err(EngineError::EmptyCompletion) => {
                    tracing::info!("Using generative model {} (empty probe reply)", model);
                    return Ok(generator);
                }
                Err(error) => {
                    let failure = ProbeFailure::classify(&error);
                    tracing::warn!("Model {} {}, trying next candidate: {}", model, failure, error);
                    attempts.push(format!("{} ({}): {}", model, failure, error));
                }
            }
        }

        Err(EngineError::NoUsableModel { attempts })
    }

    /// Build Gemini clients for the configured candidates and select one.
    pub async fn select_gemini(settings: &GenerativeSettings) -> Result<Arc<dyn TextGenerator>> {
        let api_key = settings
            .api_key()
            .ok_or_else(|| EngineError::MissingCredential("generative API key".to_string()))?
            .to_string();
        let http_client = GeminiClient::http_client(settings.request_timeout())?;

        Self::new(settings.candidate_models.iter().cloned())
            .select(|model| {
                Arc::new(
                    GeminiClient::new(api_key.clone(), model)
                        .with_base_url(settings.base_url.clone())
                        .with_http_client(http_client.clone()),
                ) as Arc<dyn TextGenerator>
            })
            .await
    }
}
