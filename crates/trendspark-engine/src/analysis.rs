//! Generative analysis of a startup idea
//!
//! Three prompts, one shape: build the prompt, call the model, pull the JSON
//! object out of the reply, decode it. Every failure on that path turns into
//! the stage's fallback value plus a [`FallbackReason`]; nothing propagates.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::extract::extract_json_object;
use crate::models::{clamp_score, Competitor, FinalSummary, IdeaInput, MarketAnalysis, Swot};
use crate::outcome::{FallbackReason, StageOutcome};
use crate::providers::{GenerationParams, SafetySetting, TextGenerator};

/// Runs the analysis prompts against one resolved model
#[derive(Debug, Clone)]
pub struct GenerativeAnalyst {
    generator: Arc<dyn TextGenerator>,
    base_params: GenerationParams,
}

impl GenerativeAnalyst {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        let mut base_params = GenerationParams::new()
            .with_top_p(0.95)
            .with_top_k(40);
        base_params.safety = SafetySetting::analysis_defaults();

        Self {
            generator,
            base_params,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.base_params = params;
        self
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub async fn swot(&self, idea: &IdeaInput) -> StageOutcome<Swot> {
        let prompt = prompts::swot(idea);
        let params = self.base_params.clone().with_temperature(0.7);

        let result = self
            .request_json::<Swot>("swot", &prompt, &params)
            .await
            .and_then(|swot| {
                if swot.is_empty() {
                    Err(FallbackReason::SchemaMismatch(
                        "all SWOT lists are empty".to_string(),
                    ))
                } else {
                    Ok(swot)
                }
            });

        match result {
            Ok(swot) => StageOutcome::Generated(swot),
            Err(reason) => {
                let value = Swot::fallback(format!("Error generating SWOT analysis: {}", reason));
                StageOutcome::fallback(value, reason)
            }
        }
    }

    pub async fn market_analysis(&self, idea: &IdeaInput) -> StageOutcome<MarketAnalysis> {
        let prompt = prompts::market_analysis(idea);
        let params = self.base_params.clone().with_temperature(0.0);

        match self
            .request_json::<MarketAnalysis>("market_analysis", &prompt, &params)
            .await
        {
            Ok(market) => StageOutcome::Generated(market),
            Err(reason) => {
                let value = MarketAnalysis::fallback(format!(
                    "Error generating market analysis: {}",
                    reason
                ));
                StageOutcome::fallback(value, reason)
            }
        }
    }

    pub async fn final_summary(
        &self,
        idea: &IdeaInput,
        swot: &Swot,
        market: &MarketAnalysis,
        competitors: &[Competitor],
    ) -> StageOutcome<FinalSummary> {
        let prompt = prompts::final_summary(idea, swot, market, competitors);
        let params = self.base_params.clone().with_temperature(0.4);

        match self
            .request_json::<FinalSummary>("final_summary", &prompt, &params)
            .await
        {
            Ok(summary) if !summary.overall_score.is_finite() => {
                let reason = FallbackReason::SchemaMismatch(format!(
                    "overall_score is not a finite number: {}",
                    summary.overall_score
                ));
                tracing::warn!("final_summary: {}", reason);
                StageOutcome::fallback(FinalSummary::fallback(), reason)
            }
            Ok(mut summary) => {
                summary.overall_score = clamp_score(summary.overall_score);
                if summary.recommended_next_steps.len() != 3 {
                    tracing::warn!(
                        "Expected 3 next steps, model returned {}",
                        summary.recommended_next_steps.len()
                    );
                }
                StageOutcome::Generated(summary)
            }
            Err(reason) => StageOutcome::fallback(FinalSummary::fallback(), reason),
        }
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        stage: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<T, FallbackReason> {
        let text = self
            .generator
            .generate(prompt, params)
            .await
            .map_err(|error| {
                tracing::warn!("{}: generation failed on {}: {}", stage, self.model(), error);
                FallbackReason::RequestFailed(error.to_string())
            })?;

        let object = extract_json_object(&text).ok_or_else(|| {
            tracing::warn!("{}: no JSON object in model reply", stage);
            FallbackReason::NoJsonObject
        })?;

        if object.is_empty() {
            tracing::warn!("{}: model replied with an empty JSON object", stage);
            return Err(FallbackReason::SchemaMismatch("empty JSON object".to_string()));
        }

        serde_json::from_value(Value::Object(object)).map_err(|error| {
            tracing::warn!("{}: reply did not match schema: {}", stage, error);
            FallbackReason::SchemaMismatch(error.to_string())
        })
    }
}

mod prompts {
    use super::*;
    use serde::Serialize;

    fn idea_block(idea: &IdeaInput) -> String {
        format!(
            "Idea: {}\nDescription: {}\nIndustry: {}\nTarget audience: {}",
            idea.display_name(),
            idea.description.trim(),
            idea.industry_or_default(),
            idea.audience_or_default()
        )
    }

    pub(super) fn swot(idea: &IdeaInput) -> String {
        format!(
            "You are a startup mentor. Analyze the following startup idea:\n\
             {}\n\n\
             Generate a detailed SWOT analysis.\n\
             Return your response as a valid JSON object ONLY, with keys \"strengths\", \
             \"weaknesses\", \"opportunities\", and \"threats\". Each key must hold a list of strings.",
            idea_block(idea)
        )
    }

    pub(super) fn market_analysis(idea: &IdeaInput) -> String {
        format!(
            "You are a market analyst. For the following startup idea:\n\
             {}\n\n\
             Write a brief \"audience_profile\" describing the typical target user.\n\
             Also list 5-10 \"potential_keywords\" that user would type into a search engine, \
             most relevant first.\n\
             Return a valid JSON object ONLY with keys \"audience_profile\" (a string) and \
             \"potential_keywords\" (a list of strings).",
            idea_block(idea)
        )
    }

    pub(super) fn final_summary(
        idea: &IdeaInput,
        swot: &Swot,
        market: &MarketAnalysis,
        competitors: &[Competitor],
    ) -> String {
        format!(
            "You are a senior investor. You have the following analysis for an idea:\n\
             {}\n\
             SWOT: {}\n\
             Market: {}\n\
             Competitors: {}\n\n\
             Based on ALL of this data, produce:\n\
             1. A concise \"executive_summary\" (string).\n\
             2. An \"overall_score\" (number between 1.0 and 10.0).\n\
             3. \"recommended_next_steps\" (a list of exactly 3 practical actions).\n\
             Return a valid JSON object ONLY with keys \"executive_summary\", \"overall_score\", \
             and \"recommended_next_steps\".",
            idea_block(idea),
            to_json(swot),
            to_json(market),
            to_json(competitors),
        )
    }

    fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string(value).unwrap_or_default()
    }
}
