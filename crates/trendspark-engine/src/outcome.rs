//! Stage results tagged with how they were produced

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a stage returned its fallback value instead of a generated one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Transport, status or provider failure
    RequestFailed(String),

    /// The response contained no decodable JSON object
    NoJsonObject,

    /// A JSON object was found but did not fit the expected shape
    SchemaMismatch(String),

    /// The dependency is not configured
    Disabled(String),

    /// Nothing to search for
    NoKeywords,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::RequestFailed(detail) => write!(f, "request failed: {}", detail),
            FallbackReason::NoJsonObject => write!(f, "response contained no JSON object"),
            FallbackReason::SchemaMismatch(detail) => {
                write!(f, "response did not match the expected schema: {}", detail)
            }
            FallbackReason::Disabled(detail) => write!(f, "disabled: {}", detail),
            FallbackReason::NoKeywords => write!(f, "no keywords to search for"),
        }
    }
}

/// A stage value, either generated or substituted
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Generated(T),
    Fallback { value: T, reason: FallbackReason },
}

impl<T> StageOutcome<T> {
    pub fn fallback(value: T, reason: FallbackReason) -> Self {
        StageOutcome::Fallback { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Generated(value) | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Generated(value) | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            StageOutcome::Generated(_) => None,
            StageOutcome::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }

    /// Split into the value and the optional fallback reason.
    pub fn into_parts(self) -> (T, Option<FallbackReason>) {
        match self {
            StageOutcome::Generated(value) => (value, None),
            StageOutcome::Fallback { value, reason } => (value, Some(reason)),
        }
    }
}
