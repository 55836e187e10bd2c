//! Generative-text providers
//!
//! [`TextGenerator`] is the seam between the analysis code and a concrete
//! model endpoint. [`GeminiClient`] talks to Google's `generateContent` API;
//! [`ModelSelector`] picks the first candidate model that answers.

pub mod gemini;
pub mod selector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use gemini::GeminiClient;
pub use selector::{ModelSelector, ProbeFailure};

/// One prompt in, free-form text out
#[async_trait]
pub trait TextGenerator: Send + Sync + std::fmt::Debug {
    /// Model identifier this generator is bound to
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

/// Sampling and safety parameters for one call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
    pub safety: Vec<SafetySetting>,
}

impl GenerationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_safety(mut self, setting: SafetySetting) -> Self {
        self.safety.push(setting);
        self
    }

    /// Minimal settings for an availability probe.
    pub fn probe() -> Self {
        Self::new().with_temperature(0.0).with_max_output_tokens(8)
    }
}

/// A harm category and the threshold at which content is blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }

    /// Business analysis routinely mentions risks, competitors and failure;
    /// only high-probability harmful content is blocked.
    pub fn analysis_defaults() -> Vec<Self> {
        [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|category| Self::new(category, "BLOCK_ONLY_HIGH"))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builder() {
        let params = GenerationParams::new()
            .with_temperature(0.2)
            .with_top_p(0.9)
            .with_top_k(40)
            .with_max_output_tokens(1024);

        assert_eq!(params.temperature, Some(0.2));
        assert_eq!(params.top_p, Some(0.9));
        assert_eq!(params.top_k, Some(40));
        assert_eq!(params.max_output_tokens, Some(1024));
        assert!(params.safety.is_empty());
    }

    #[test]
    fn test_analysis_safety_defaults() {
        let settings = SafetySetting::analysis_defaults();
        assert_eq!(settings.len(), 4);
        assert!(settings.iter().all(|s| s.threshold == "BLOCK_ONLY_HIGH"));
    }
}
