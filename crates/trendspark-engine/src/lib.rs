//! TrendSpark Engine - Startup Idea Validation
//!
//! Turns a free-text startup idea into a structured validation report by
//! chaining a generative model (Gemini) and a web search (Google Custom
//! Search).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ValidationPipeline                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │   IdeaInput                                                  │
//! │      │                                                       │
//! │      ▼                                                       │
//! │  ┌──────────────────┐   swot / market / final summary        │
//! │  │ GenerativeAnalyst│ ─────────────► TextGenerator (Gemini)  │
//! │  └────────┬─────────┘                     ▲                  │
//! │           │ keywords                      │ ModelSelector    │
//! │           ▼                               │ (startup probe)  │
//! │  ┌──────────────────┐                                        │
//! │  │ CompetitorSearch │ ─────────────► SearchBackend (Google)  │
//! │  └────────┬─────────┘                                        │
//! │           ▼                                                  │
//! │   ValidationReport                                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure model
//!
//! - **Fatal**: no generative key, or no candidate model answers. Raised by
//!   [`ValidationPipeline::connect`].
//! - **Degraded**: any generation, decode or search failure. The stage
//!   returns a fallback value and the report is still complete.

pub mod analysis;
pub mod config;
pub mod error;
pub mod extract;
pub mod mock;
pub mod models;
pub mod outcome;
pub mod pipeline;
pub mod providers;
pub mod search;

pub use analysis::GenerativeAnalyst;
pub use config::{EngineConfig, GenerativeSettings, SearchSettings};
pub use error::{EngineError, Result};
pub use extract::extract_json_object;
pub use models::{Competitor, FinalSummary, IdeaInput, MarketAnalysis, Swot, ValidationReport};
pub use outcome::{FallbackReason, StageOutcome};
pub use pipeline::{PipelineRun, Stage, StageRecord, ValidationPipeline};
pub use providers::{GeminiClient, GenerationParams, ModelSelector, TextGenerator};
pub use search::{CompetitorSearch, GoogleCustomSearch, SearchBackend};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
