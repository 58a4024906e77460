use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    pub summary: String,
    pub key_decisions: Vec<String>,
    pub active_modifiers: HashMap<String, f64>,
    pub user_preferences: Vec<String>,
    pub design_intent: String,
    pub events_processed: usize,
    pub tokens_in: usize,
    pub tokens_out: usize,
    pub compression_ratio: f64,
    pub compressed_at: DateTime<Utc>,
}

/// Strip markdown fencing, parse JSON, and extract the five compression
/// fields. On parse failure: degrade to a result whose `summary` is the
/// first 500 characters of the raw reply and whose lists/maps are empty —
/// persistence must still succeed on this path.
pub fn parse_compression_response(raw: &str, events_processed: usize, tokens_in: usize) -> CompressionResult {
    let cleaned = strip_markdown_fence(raw);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(data) => {
            let summary = data.get("summary").and_then(Value::as_str).unwrap_or("").to_string();
            let key_decisions = data
                .get("key_decisions")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default();
            let active_modifiers = data
                .get("active_modifiers")
                .and_then(Value::as_object)
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                        .collect()
                })
                .unwrap_or_default();
            let user_preferences = data
                .get("user_preferences")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default();
            let design_intent = data
                .get("design_intent")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();

            let tokens_out = summary.split_whitespace().count() + data.to_string().split_whitespace().count();

            build_result(
                summary,
                key_decisions,
                active_modifiers,
                user_preferences,
                design_intent,
                events_processed,
                tokens_in,
                tokens_out,
            )
        }
        Err(_) => {
            tracing::warn!("compression response was not valid JSON, degrading to fallback result");
            let summary: String = raw.chars().take(500).collect();
            let tokens_out = raw.split_whitespace().count();
            build_result(
                summary,
                Vec::new(),
                HashMap::new(),
                Vec::new(),
                String::new(),
                events_processed,
                tokens_in,
                tokens_out,
            )
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_result(
    summary: String,
    key_decisions: Vec<String>,
    active_modifiers: HashMap<String, f64>,
    user_preferences: Vec<String>,
    design_intent: String,
    events_processed: usize,
    tokens_in: usize,
    tokens_out: usize,
) -> CompressionResult {
    let compression_ratio = if tokens_out > 0 {
        tokens_in as f64 / tokens_out as f64
    } else {
        1.0
    };
    CompressionResult {
        summary,
        key_decisions,
        active_modifiers,
        user_preferences,
        design_intent,
        events_processed,
        tokens_in,
        tokens_out,
        compression_ratio,
        compressed_at: Utc::now(),
    }
}

fn strip_markdown_fence(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_json_response_populates_all_fields() {
        let raw = r#"{"summary":"did stuff","key_decisions":["chose organic style"],"active_modifiers":{"stroke_weight":0.7},"user_preferences":["muted palette"],"design_intent":"calm"}"#;
        let result = parse_compression_response(raw, 5, 100);
        assert_eq!(result.summary, "did stuff");
        assert_eq!(result.key_decisions, vec!["chose organic style"]);
        assert_eq!(result.active_modifiers.get("stroke_weight"), Some(&0.7));
        assert_eq!(result.design_intent, "calm");
    }

    #[test]
    fn markdown_fenced_json_is_stripped_before_parsing() {
        let raw = "```json\n{\"summary\":\"ok\",\"key_decisions\":[],\"active_modifiers\":{},\"user_preferences\":[],\"design_intent\":\"\"}\n```";
        let result = parse_compression_response(raw, 1, 10);
        assert_eq!(result.summary, "ok");
    }

    #[test]
    fn non_json_response_degrades_to_fallback() {
        let result = parse_compression_response("hello world", 2, 10);
        assert_eq!(result.summary, "hello world");
        assert!(result.key_decisions.is_empty());
        assert!(result.active_modifiers.is_empty());
        assert!(result.user_preferences.is_empty());
    }

    #[test]
    fn fallback_truncates_to_500_chars() {
        let long = "x".repeat(600);
        let result = parse_compression_response(&long, 1, 10);
        assert_eq!(result.summary.chars().count(), 500);
    }

    #[test]
    fn compression_ratio_is_one_when_tokens_out_is_zero() {
        let result = parse_compression_response("", 0, 50);
        assert_eq!(result.compression_ratio, 1.0);
    }
}
