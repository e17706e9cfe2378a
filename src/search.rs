//! Web search used by the agent to look up render errors.

use crate::config::SearchSettings;
use crate::error::{Result, ScenecastError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Snippets found for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub snippets: Vec<String>,
}

impl SearchResults {
    /// JSON payload handed back to the model.
    pub fn to_tool_output(&self) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "query": self.query,
            "results": self.snippets,
        })
    }
}

/// Trait for search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResults>;
}

/// DuckDuckGo Instant Answer API. Needs no API key.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn from_settings(settings: &SearchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("scenecast/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            max_results: settings.max_results,
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<SearchResults> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScenecastError::Search(format!(
                "DuckDuckGo returned {}",
                response.status()
            )));
        }

        // The API answers with a javascript content type, so decode by hand.
        let body = response.text().await?;
        let snippets = parse_instant_answer(&body, self.max_results)?;
        debug!("Search returned {} snippets", snippets.len());

        Ok(SearchResults {
            query: query.to_string(),
            snippets,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "AbstractText")]
    abstract_text: String,
    #[serde(rename = "Answer")]
    answer: String,
    #[serde(rename = "Definition")]
    definition: String,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
    /// Present on grouped topics.
    #[serde(rename = "Topics")]
    topics: Vec<RelatedTopic>,
}

fn collect_topics(topics: &[RelatedTopic], out: &mut Vec<String>) {
    for topic in topics {
        if let Some(text) = topic.text.as_deref().filter(|t| !t.is_empty()) {
            match &topic.first_url {
                Some(url) => out.push(format!("{} ({})", text, url)),
                None => out.push(text.to_string()),
            }
        }
        collect_topics(&topic.topics, out);
    }
}

fn parse_instant_answer(body: &str, max_results: usize) -> Result<Vec<String>> {
    let answer: InstantAnswer = serde_json::from_str(body)
        .map_err(|e| ScenecastError::Search(format!("Invalid DuckDuckGo response: {}", e)))?;

    let mut snippets: Vec<String> = [answer.answer, answer.abstract_text, answer.definition]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    collect_topics(&answer.related_topics, &mut snippets);
    snippets.truncate(max_results);

    Ok(snippets)
}
