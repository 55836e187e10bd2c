//! Request and report records
//!
//! These are the shapes exchanged with callers and decoded from model output.
//! Decoding is lenient where language models tend to drift (stringly numbers,
//! single strings instead of lists) and strict where the shape is wrong.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// Placeholder for an idea submitted without a usable title.
pub const UNTITLED_IDEA: &str = "Untitled Idea";

/// Placeholder for competitor fields the search provider did not return.
pub const NOT_AVAILABLE: &str = "N/A";

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

/// A startup idea as submitted for validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaInput {
    /// Name or short title of the idea
    pub title: String,

    /// Problem, solution and unique value, in free text
    pub description: String,

    /// Main industry or category (EdTech, Fintech, ...)
    #[serde(default)]
    pub industry: Option<String>,

    /// Who the product is primarily for
    #[serde(default)]
    pub target_audience: Option<String>,
}

impl IdeaInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            industry: None,
            target_audience: None,
        }
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = Some(audience.into());
        self
    }

    /// Decode an idea from a JSON payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        let idea: Self = serde_json::from_str(payload)
            .map_err(|e| EngineError::InvalidInput(format!("malformed idea payload: {}", e)))?;
        idea.validate()?;
        Ok(idea)
    }

    /// Reject ideas that give the analysis nothing to work with.
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "idea description must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Trimmed title, or [`UNTITLED_IDEA`] when blank.
    pub fn display_name(&self) -> String {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            UNTITLED_IDEA.to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn industry_or_default(&self) -> &str {
        non_blank(self.industry.as_deref()).unwrap_or("Not specified")
    }

    pub fn audience_or_default(&self) -> &str {
        non_blank(self.target_audience.as_deref()).unwrap_or("Not specified")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Strengths / weaknesses / opportunities / threats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Swot {
    #[serde(default, deserialize_with = "lenient_strings")]
    pub strengths: Vec<String>,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub weaknesses: Vec<String>,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub opportunities: Vec<String>,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub threats: Vec<String>,
}

impl Swot {
    /// SWOT carrying a diagnostic in the strengths slot.
    pub fn fallback(diagnostic: impl Into<String>) -> Self {
        Self {
            strengths: vec![diagnostic.into()],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
            && self.weaknesses.is_empty()
            && self.opportunities.is_empty()
            && self.threats.is_empty()
    }
}

/// Audience profile and search keywords, most relevant keyword first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    #[serde(default = "default_audience_profile")]
    pub audience_profile: String,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub potential_keywords: Vec<String>,
}

impl Default for MarketAnalysis {
    fn default() -> Self {
        Self {
            audience_profile: default_audience_profile(),
            potential_keywords: Vec::new(),
        }
    }
}

impl MarketAnalysis {
    pub fn fallback(diagnostic: impl Into<String>) -> Self {
        Self {
            audience_profile: diagnostic.into(),
            potential_keywords: Vec::new(),
        }
    }
}

fn default_audience_profile() -> String {
    "Not enough data to generate profile".to_string()
}

/// A search result believed to be a competing product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    pub name: String,
    pub url: String,
    pub snippet: String,
}

impl Competitor {
    /// Build a competitor, substituting [`NOT_AVAILABLE`] for missing or
    /// blank fields and collapsing whitespace in the snippet.
    pub fn from_parts(name: Option<&str>, url: Option<&str>, snippet: Option<&str>) -> Self {
        let or_placeholder =
            |value: Option<&str>| non_blank(value).unwrap_or(NOT_AVAILABLE).to_string();

        let snippet = non_blank(snippet)
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            name: or_placeholder(name),
            url: or_placeholder(url),
            snippet,
        }
    }
}

/// Executive summary, score and next steps produced by the last stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSummary {
    pub executive_summary: String,

    #[serde(deserialize_with = "lenient_score")]
    pub overall_score: f64,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub recommended_next_steps: Vec<String>,
}

impl FinalSummary {
    pub fn fallback() -> Self {
        Self {
            executive_summary: "Error generating final summary.".to_string(),
            overall_score: MIN_SCORE,
            recommended_next_steps: vec![
                "Re-run the validation once the analysis service is reachable".to_string(),
                "Interview potential customers to validate the problem manually".to_string(),
                "Research competitors directly in your target market".to_string(),
            ],
        }
    }

    /// A summary the report can be built from: some text and a real number.
    pub fn is_usable(&self) -> bool {
        !self.executive_summary.trim().is_empty() && self.overall_score.is_finite()
    }
}

/// The assembled validation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub report_id: String,
    pub idea_name: String,
    pub overall_score: f64,
    pub executive_summary: String,
    pub swot_analysis: Swot,
    pub market_analysis: MarketAnalysis,
    #[serde(default)]
    pub competitor_analysis: Vec<Competitor>,
    #[serde(default)]
    pub recommended_next_steps: Vec<String>,
}

impl ValidationReport {
    pub fn assemble(
        idea_name: impl Into<String>,
        summary: FinalSummary,
        swot: Swot,
        market: MarketAnalysis,
        competitors: Vec<Competitor>,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4().to_string(),
            idea_name: idea_name.into(),
            overall_score: clamp_score(summary.overall_score),
            executive_summary: summary.executive_summary,
            swot_analysis: swot,
            market_analysis: market,
            competitor_analysis: competitors,
            recommended_next_steps: summary.recommended_next_steps,
        }
    }
}

/// Clamp into `[MIN_SCORE, MAX_SCORE]`; NaN and infinities map to the floor.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        MIN_SCORE
    }
}

fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        Value::String(single) => vec![Value::String(single)],
        other => {
            return Err(D::Error::custom(format!(
                "expected a list of strings, found {}",
                other
            )))
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            }
            Value::Number(n) => out.push(n.to_string()),
            Value::Bool(b) => out.push(b.to_string()),
            Value::Null => {}
            other => {
                return Err(D::Error::custom(format!(
                    "expected a string list element, found {}",
                    other
                )))
            }
        }
    }
    Ok(out)
}

fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("score is not representable as f64")),
        Value::String(s) => s
            .trim()
            .trim_end_matches("/10")
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("score is not numeric: {:?}", s))),
        other => Err(D::Error::custom(format!("score is not numeric: {}", other))),
    }
}
