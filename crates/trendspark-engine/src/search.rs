//! Competitor search over the Google Custom Search JSON API
//!
//! Best effort throughout: missing credentials, missing keywords and every
//! kind of request failure end in an empty competitor list, tagged with the
//! reason, never in an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{SearchSettings, SEARCH_PROVIDER_MAX_RESULTS};
use crate::error::{EngineError, Result};
use crate::models::Competitor;
use crate::outcome::{FallbackReason, StageOutcome};

/// At most this many keywords go into one query.
pub const MAX_QUERY_KEYWORDS: usize = 5;

/// Raw search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl SearchItem {
    pub fn new(title: &str, link: &str, snippet: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            link: Some(link.to_string()),
            snippet: Some(snippet.to_string()),
        }
    }
}

impl From<&SearchItem> for Competitor {
    fn from(item: &SearchItem) -> Self {
        Competitor::from_parts(
            item.title.as_deref(),
            item.link.as_deref(),
            item.snippet.as_deref(),
        )
    }
}

/// A keyed web search endpoint
#[async_trait]
pub trait SearchBackend: Send + Sync + std::fmt::Debug {
    async fn query(&self, query: &str, num: u8) -> Result<SearchResponse>;
}

/// Google Custom Search client
#[derive(Debug, Clone)]
pub struct GoogleCustomSearch {
    api_key: String,
    engine_id: String,
    endpoint: String,
    http_client: reqwest::Client,
}

impl GoogleCustomSearch {
    /// `None` when the settings carry no credentials.
    pub fn from_settings(settings: &SearchSettings) -> Result<Option<Self>> {
        let Some((api_key, engine_id)) = settings.credentials() else {
            return Ok(None);
        };

        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Some(Self {
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
            endpoint: settings.endpoint.clone(),
            http_client,
        }))
    }
}

#[async_trait]
impl SearchBackend for GoogleCustomSearch {
    async fn query(&self, query: &str, num: u8) -> Result<SearchResponse> {
        let num = num.clamp(1, SEARCH_PROVIDER_MAX_RESULTS).to_string();

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::Http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::Provider {
                status: status.as_u16(),
                message: error_text.chars().take(300).collect(),
            });
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| EngineError::Serialization(e.without_url().to_string()))
    }
}

/// Disjunctive query over the most relevant keywords: `"a" OR "b" OR ...`
pub fn build_query(keywords: &[String]) -> Option<String> {
    let mut seen = HashSet::new();
    let terms: Vec<String> = keywords
        .iter()
        .map(|k| k.replace('"', " "))
        .map(|k| k.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .take(MAX_QUERY_KEYWORDS)
        .map(|k| format!("\"{}\"", k))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Finds competitors for a keyword list
#[derive(Debug, Clone)]
pub struct CompetitorSearch {
    backend: Option<Arc<dyn SearchBackend>>,
    max_results: u8,
}

impl CompetitorSearch {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend: Some(backend),
            max_results: SearchSettings::default().max_results,
        }
    }

    /// A search that never queries anything.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            max_results: SearchSettings::default().max_results,
        }
    }

    pub fn from_settings(settings: &SearchSettings) -> Result<Self> {
        let search = match GoogleCustomSearch::from_settings(settings)? {
            Some(client) => Self::new(Arc::new(client)),
            None => Self::disabled(),
        };
        Ok(search.with_max_results(settings.effective_max_results()))
    }

    pub fn with_max_results(mut self, max_results: u8) -> Self {
        self.max_results = max_results.clamp(1, SEARCH_PROVIDER_MAX_RESULTS);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn max_results(&self) -> u8 {
        self.max_results
    }

    pub async fn find(&self, keywords: &[String]) -> StageOutcome<Vec<Competitor>> {
        let Some(backend) = &self.backend else {
            return StageOutcome::fallback(
                Vec::new(),
                FallbackReason::Disabled("search credentials not configured".to_string()),
            );
        };

        let Some(query) = build_query(keywords) else {
            tracing::debug!("No keywords available; skipping competitor search");
            return StageOutcome::fallback(Vec::new(), FallbackReason::NoKeywords);
        };

        tracing::debug!("Searching competitors: {}", query);
        match backend.query(&query, self.max_results).await {
            Ok(response) => {
                let competitors: Vec<Competitor> = response
                    .items
                    .iter()
                    .take(self.max_results as usize)
                    .map(Competitor::from)
                    .collect();
                tracing::info!("Found {} competitor(s)", competitors.len());
                StageOutcome::Generated(competitors)
            }
            Err(error) => {
                tracing::warn!("Competitor search failed: {}", error);
                StageOutcome::fallback(Vec::new(), FallbackReason::RequestFailed(error.to_string()))
            }
        }
    }
}
