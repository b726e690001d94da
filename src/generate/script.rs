//! Script generation via the chat-completion service.
//!
//! The vendor is asked for strict JSON but does not always comply; parsing
//! applies field-name fallback heuristics before giving up, and a parse
//! failure is surfaced as retryable rather than fatal.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

use super::{ServiceError, key_fragment, status_error};
use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::ui::prelude::{Level, emit};

const SCRIPT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const CHAT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Script {
    pub hook: String,
    pub main_content: String,
    pub call_to_action: String,
    pub suggested_visuals: Vec<String>,
}

impl Script {
    pub fn narration_text(&self) -> String {
        format!(
            "{} {} {}",
            self.hook, self.main_content, self.call_to_action
        )
    }

    fn is_empty(&self) -> bool {
        self.hook.is_empty() && self.main_content.is_empty() && self.call_to_action.is_empty()
    }
}

pub struct ScriptGenerator {
    cache: TtlCache<Script>,
}

impl Default for ScriptGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptGenerator {
    pub fn new() -> Self {
        Self::with_ttl(SCRIPT_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(ttl),
        }
    }

    pub async fn generate(
        &mut self,
        client: &Client,
        config: &AppConfig,
        topic: &str,
        category: &str,
        description: Option<&str>,
    ) -> Result<Script, ServiceError> {
        if topic.trim().is_empty() || category.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "topic and category are required".to_string(),
            ));
        }

        let cache_key = build_cache_key(topic, category, description);
        if let Some(script) = self.cache.get(&cache_key) {
            emit(
                Level::Debug,
                "generate.script.cached",
                &format!("Using cached script for '{topic}'"),
                None,
            );
            return Ok(script);
        }

        let script = request_script(client, config, topic, category, description).await?;
        self.cache.set(cache_key, script.clone());
        Ok(script)
    }
}

fn build_cache_key(topic: &str, category: &str, description: Option<&str>) -> String {
    match description {
        Some(desc) => format!(
            "script-{category}-{topic}-{}",
            key_fragment(desc, 20)
        ),
        None => format!("script-{category}-{topic}"),
    }
}

async fn request_script(
    client: &Client,
    config: &AppConfig,
    topic: &str,
    category: &str,
    description: Option<&str>,
) -> Result<Script, ServiceError> {
    let api_key = config
        .require_api_key()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let context_line = description
        .map(|d| format!("Additional context about the topic: {d}"))
        .unwrap_or_default();
    let system_prompt = format!(
        "You are an expert scriptwriter for viral short-form videos. \
         Create a 60-90 second script for a video on {topic} in the {category} category. \
         {context_line}\n\
         Return ONLY valid JSON with this exact shape:\n\
         {{\"hook\": \"5-7 second attention-grabbing opening\", \
         \"mainContent\": \"40-60 seconds of informative content\", \
         \"callToAction\": \"5-7 second compelling call to action\", \
         \"suggestedVisuals\": [\"Visual 1\", \"Visual 2\", \"Visual 3\", \"Visual 4\", \"Visual 5\"]}}\n\
         Each suggested visual should be a whimsical, painterly scene description \
         with soft colors and dreamlike lighting, relevant to the script content. \
         Use the EXACT field names shown above, no markdown, no explanations."
    );
    let user_prompt = format!(
        "Write a highly engaging script for a viral short video about \"{topic}\" \
         in the {category} category. Make it catchy enough to attract subscribers."
    );

    let url = format!("{}/chat/completions", config.api_base_url);
    let resp = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&json!({
            "model": CHAT_MODEL,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "json_object"},
        }))
        .send()
        .await
        .map_err(|err| ServiceError::Transient(format!("script request failed: {err}")))?;

    if !resp.status().is_success() {
        return Err(status_error("script", resp).await);
    }

    let body: Value = resp
        .json()
        .await
        .map_err(|err| ServiceError::Transient(format!("script response unreadable: {err}")))?;
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("{}");

    parse_script(content)
}

/// Parses the vendor's JSON, trying the canonical field names first and
/// falling back to the alternates the model is known to emit.
fn parse_script(content: &str) -> Result<Script, ServiceError> {
    let data: Value = serde_json::from_str(content).map_err(|err| {
        ServiceError::Transient(format!("script response was not valid JSON: {err}"))
    })?;

    let mut script = Script {
        hook: string_field(&data, &["hook"]),
        main_content: string_field(&data, &["mainContent"]),
        call_to_action: string_field(&data, &["callToAction"]),
        suggested_visuals: visuals_field(&data, &["suggestedVisuals"]),
    };

    if script.is_empty() {
        script = Script {
            hook: string_field(
                &data,
                &["Hook", "opening", "Opening", "introduction", "Introduction"],
            ),
            main_content: string_field(
                &data,
                &["MainContent", "content", "Content", "body", "Body"],
            ),
            call_to_action: string_field(
                &data,
                &["CallToAction", "cta", "CTA", "conclusion", "Conclusion"],
            ),
            suggested_visuals: visuals_field(
                &data,
                &["SuggestedVisuals", "visuals", "Visuals"],
            ),
        };
    }

    if script.is_empty() {
        return Err(ServiceError::Transient(
            "script response carried no recognizable fields".to_string(),
        ));
    }

    Ok(script)
}

fn string_field(data: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| data.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn visuals_field(data: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| data.get(key).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_field_names() {
        let script = parse_script(
            r#"{"hook": "h", "mainContent": "m", "callToAction": "c",
                "suggestedVisuals": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(script.hook, "h");
        assert_eq!(script.main_content, "m");
        assert_eq!(script.call_to_action, "c");
        assert_eq!(script.suggested_visuals, vec!["a", "b"]);
    }

    #[test]
    fn falls_back_to_alternate_field_names() {
        let script = parse_script(
            r#"{"Opening": "h", "body": "m", "CTA": "c", "visuals": ["v"]}"#,
        )
        .unwrap();
        assert_eq!(script.hook, "h");
        assert_eq!(script.main_content, "m");
        assert_eq!(script.call_to_action, "c");
        assert_eq!(script.suggested_visuals, vec!["v"]);
    }

    #[test]
    fn malformed_json_is_retryable() {
        let err = parse_script("not json at all").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn unrecognizable_fields_are_retryable() {
        let err = parse_script(r#"{"something": "else"}"#).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn cache_key_truncates_description() {
        let long = "a description that is much longer than twenty characters";
        let key = build_cache_key("Topic", "tech", Some(long));
        assert_eq!(key, "script-tech-Topic-a description that is");
        assert_eq!(
            build_cache_key("Topic", "tech", None),
            "script-tech-Topic"
        );
    }

    #[test]
    fn narration_joins_all_sections() {
        let script = Script {
            hook: "A.".into(),
            main_content: "B.".into(),
            call_to_action: "C.".into(),
            suggested_visuals: vec![],
        };
        assert_eq!(script.narration_text(), "A. B. C.");
    }

    #[tokio::test]
    async fn empty_topic_is_rejected_before_any_network_call() {
        let mut generator = ScriptGenerator::new();
        let client = Client::new();
        let config = AppConfig::default();
        let err = generator
            .generate(&client, &config, "", "tech", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
