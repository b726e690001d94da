//! Trending-topic discovery. The vendor's answer arrives as prose-wrapped
//! JSON more often than not; parsing strips markdown fences, then falls back
//! to a regex extraction, and finally degrades to an empty list rather than
//! failing the browse flow.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ServiceError, status_error};
use crate::config::AppConfig;
use crate::ui::prelude::{Level, emit};

const TRENDING_MODEL: &str = "gpt-4o";

lazy_static! {
    static ref JSON_FENCE: Regex = Regex::new(r"```json\n?|\n?```").expect("fence regex");
    static ref TOPICS_OBJECT: Regex =
        Regex::new(r#"\{[\s\S]*"trendingTopics"[\s\S]*\}"#).expect("topics regex");
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendingTopic {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub viral_score: f64,
    #[serde(default)]
    pub date_started: String,
    #[serde(default)]
    pub estimated_popularity: String,
}

#[derive(Debug, Deserialize)]
struct TopicsEnvelope {
    #[serde(rename = "trendingTopics", default)]
    trending_topics: Vec<TrendingTopic>,
}

pub async fn fetch_trending(
    client: &Client,
    config: &AppConfig,
    category: &str,
) -> Result<Vec<TrendingTopic>, ServiceError> {
    if category.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "category is required".to_string(),
        ));
    }
    let api_key = config
        .require_api_key()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let prompt = format!(
        "You are a viral trend analyst specializing in {category}. \
         Identify the 10 most recent trending topics in {category} from the last \
         5-6 days with high viral potential. For each topic provide: title, \
         description (1-2 sentences), viralScore (number 70-100), dateStarted, \
         and estimatedPopularity (\"medium\", \"high\", or \"very high\"). \
         Respond with VALID JSON ONLY: {{\"trendingTopics\": [...]}} with no \
         markdown formatting or text outside the JSON structure."
    );

    let url = format!("{}/chat/completions", config.api_base_url);
    let resp = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&json!({
            "model": TRENDING_MODEL,
            "messages": [{"role": "user", "content": prompt}],
        }))
        .send()
        .await
        .map_err(|err| ServiceError::Transient(format!("trending request failed: {err}")))?;

    if !resp.status().is_success() {
        return Err(status_error("trending", resp).await);
    }

    let body: Value = resp.json().await.map_err(|err| {
        ServiceError::Transient(format!("trending response unreadable: {err}"))
    })?;
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("{\"trendingTopics\":[]}");

    Ok(parse_topics(content))
}

/// Best-effort extraction of the topics list. Never errors; an
/// unsalvageable response yields an empty list.
fn parse_topics(content: &str) -> Vec<TrendingTopic> {
    let cleaned = JSON_FENCE.replace_all(content.trim(), "");

    if let Ok(envelope) = serde_json::from_str::<TopicsEnvelope>(&cleaned) {
        return envelope.trending_topics;
    }

    // The model sometimes wraps the JSON in commentary; dig the object out.
    if let Some(found) = TOPICS_OBJECT.find(content)
        && let Ok(envelope) = serde_json::from_str::<TopicsEnvelope>(found.as_str())
    {
        return envelope.trending_topics;
    }

    emit(
        Level::Warn,
        "generate.trending.parse",
        "Could not extract trending topics from the response",
        None,
    );
    Vec::new()
}
