//! Validation pipeline
//!
//! Fixed stage order, each stage feeding the next:
//!
//! ```text
//! idea ─► SWOT ─► market analysis ─► competitor search ─► final summary ─► report
//! ```
//!
//! Stages never fail; each returns a [`StageOutcome`]. The only errors are
//! raised by [`ValidationPipeline::connect`], before any request is served.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::Instrument;

use crate::analysis::GenerativeAnalyst;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{FinalSummary, IdeaInput, ValidationReport};
use crate::outcome::{FallbackReason, StageOutcome};
use crate::providers::ModelSelector;
use crate::search::CompetitorSearch;

/// Pipeline stage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Swot,
    MarketAnalysis,
    CompetitorSearch,
    FinalSummary,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Swot => "swot",
            Stage::MarketAnalysis => "market_analysis",
            Stage::CompetitorSearch => "competitor_search",
            Stage::FinalSummary => "final_summary",
        };
        f.write_str(label)
    }
}

/// How one stage ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    /// `None` when the stage produced a generated value
    pub fallback: Option<FallbackReason>,
}

/// A report plus the per-stage diagnostics that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub report: ValidationReport,
    pub stages: Vec<StageRecord>,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.stage == stage)
    }

    pub fn fallback_reason(&self, stage: Stage) -> Option<&FallbackReason> {
        self.stage(stage).and_then(|record| record.fallback.as_ref())
    }

    /// True when any stage substituted its fallback value.
    pub fn is_degraded(&self) -> bool {
        self.stages.iter().any(|record| record.fallback.is_some())
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Sequences the analysis and search clients into a report
#[derive(Debug, Clone)]
pub struct ValidationPipeline {
    analyst: GenerativeAnalyst,
    search: CompetitorSearch,
}

impl ValidationPipeline {
    pub fn new(analyst: GenerativeAnalyst, search: CompetitorSearch) -> Self {
        Self { analyst, search }
    }

    /// Validate the config, resolve the working model and build the search
    /// client. Fails closed when no model answers.
    pub async fn connect(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let generator = ModelSelector::select_gemini(&config.generative).await?;
        let search = CompetitorSearch::from_settings(&config.search)?;

        Ok(Self::new(GenerativeAnalyst::new(generator), search))
    }

    pub fn analyst(&self) -> &GenerativeAnalyst {
        &self.analyst
    }

    pub fn search(&self) -> &CompetitorSearch {
        &self.search
    }

    pub async fn run(&self, idea: &IdeaInput) -> ValidationReport {
        self.run_traced(idea).await.report
    }

    pub async fn run_traced(&self, idea: &IdeaInput) -> PipelineRun {
        let idea_name = idea.display_name();
        let span = tracing::info_span!("validate", idea = %idea_name);
        self.execute(idea, idea_name).instrument(span).await
    }

    async fn execute(&self, idea: &IdeaInput, idea_name: String) -> PipelineRun {
        let started_at = Utc::now();
        let mut stages = Vec::with_capacity(4);
        tracing::info!("Starting validation pipeline");

        let swot = record(&mut stages, Stage::Swot, self.analyst.swot(idea).await);
        let market = record(
            &mut stages,
            Stage::MarketAnalysis,
            self.analyst.market_analysis(idea).await,
        );
        let competitors = record(
            &mut stages,
            Stage::CompetitorSearch,
            self.search.find(&market.potential_keywords).await,
        );

        let summary_outcome = self
            .analyst
            .final_summary(idea, &swot, &market, &competitors)
            .await;
        let summary_outcome = match summary_outcome {
            StageOutcome::Generated(summary) if !summary.is_usable() => {
                tracing::warn!("Final summary unusable; substituting fallback");
                StageOutcome::fallback(
                    FinalSummary::fallback(),
                    FallbackReason::SchemaMismatch(
                        "blank executive summary or non-numeric score".to_string(),
                    ),
                )
            }
            other => other,
        };
        let summary = record(&mut stages, Stage::FinalSummary, summary_outcome);

        let report = ValidationReport::assemble(idea_name, summary, swot, market, competitors);
        let finished_at = Utc::now();

        tracing::info!(
            report_id = %report.report_id,
            score = report.overall_score,
            fallbacks = stages.iter().filter(|s| s.fallback.is_some()).count(),
            "Validation pipeline complete"
        );

        PipelineRun {
            report,
            stages,
            model: self.analyst.model().to_string(),
            started_at,
            finished_at,
        }
    }
}

fn record<T>(stages: &mut Vec<StageRecord>, stage: Stage, outcome: StageOutcome<T>) -> T {
    let (value, fallback) = outcome.into_parts();
    match &fallback {
        Some(reason) => tracing::warn!("{} used fallback: {}", stage, reason),
        None => tracing::info!("{} complete", stage),
    }
    stages.push(StageRecord { stage, fallback });
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ScriptedGenerator, StaticSearchBackend};
    use crate::search::SearchItem;
    use std::sync::Arc;

    const SWOT: &str = r#"{"strengths":["a"],"weaknesses":["b"],"opportunities":["c"],"threats":["d"]}"#;
    const MARKET: &str = r#"{"audience_profile":"profile","potential_keywords":["k1","k2"]}"#;

    #[tokio::test]
    async fn test_keywords_flow_into_search() {
        let generator = Arc::new(ScriptedGenerator::new(
            "m",
            [
                SWOT,
                MARKET,
                r#"{"executive_summary":"sum","overall_score":6,"recommended_next_steps":["1","2","3"]}"#,
            ],
        ));
        let backend = Arc::new(StaticSearchBackend::with_items(vec![SearchItem::new(
            "Rival",
            "https://rival.example",
            "does X",
        )]));
        let pipeline = ValidationPipeline::new(
            GenerativeAnalyst::new(generator.clone()),
            CompetitorSearch::new(backend.clone()),
        );

        let run = pipeline.run_traced(&IdeaInput::new("Test", "A widget")).await;

        assert_eq!(backend.last_query().as_deref(), Some("\"k1\" OR \"k2\""));
        assert!(!run.is_degraded());
        assert_eq!(run.stages.len(), 4);
        assert_eq!(run.model, "m");
        assert!(run.duration_ms() >= 0);
        // the final prompt sees the competitor found in stage 4
        assert!(generator.prompts()[2].contains("https://rival.example"));
    }

    #[tokio::test]
    async fn test_blank_summary_hits_outer_fallback() {
        let generator = Arc::new(ScriptedGenerator::new(
            "m",
            [
                SWOT,
                MARKET,
                r#"{"executive_summary":"   ","overall_score":9,"recommended_next_steps":[]}"#,
            ],
        ));
        let pipeline = ValidationPipeline::new(
            GenerativeAnalyst::new(generator),
            CompetitorSearch::disabled(),
        );

        let run = pipeline.run_traced(&IdeaInput::new("", "A widget")).await;

        assert_eq!(run.report.idea_name, "Untitled Idea");
        assert_eq!(run.report.overall_score, 1.0);
        assert_eq!(run.report.executive_summary, FinalSummary::fallback().executive_summary);
        assert_eq!(run.report.recommended_next_steps.len(), 3);
        assert!(matches!(
            run.fallback_reason(Stage::FinalSummary),
            Some(FallbackReason::SchemaMismatch(_))
        ));
        assert!(matches!(
            run.fallback_reason(Stage::CompetitorSearch),
            Some(FallbackReason::Disabled(_))
        ));
        assert_eq!(run.fallback_reason(Stage::Swot), None);
    }

    #[tokio::test]
    async fn test_connect_without_key_fails_closed() {
        let err = ValidationPipeline::connect(&EngineConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::CompetitorSearch.to_string(), "competitor_search");
        assert_eq!(
            serde_json::to_value(Stage::MarketAnalysis).unwrap(),
            serde_json::json!("market_analysis")
        );
    }
}
