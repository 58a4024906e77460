use std::time::Duration;

use serde_json::{json, Value};
use traceos_types::TraceOsError;

/// Client for the external LLM ("oracle") backing critique and compression.
/// Speaks the Anthropic Messages API shape — the same wire format
/// `sven-model`'s provider uses, but single-shot (no streaming, no tool
/// calls) since the oracle is only ever asked for one structured response.
#[derive(Clone)]
pub struct OracleClient {
    endpoint: Option<String>,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OracleClient {
    pub fn new(endpoint: Option<String>, api_key: Option<String>, model: String, timeout_secs: u64) -> Self {
        Self {
            endpoint,
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    /// Send a single prompt and return the oracle's text response.
    /// `OracleUnavailable` when no endpoint is configured or the request
    /// fails outright; `OracleTimeout` when the request exceeds the
    /// configured timeout.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String, TraceOsError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| TraceOsError::OracleUnavailable("no oracle endpoint configured".into()))?;

        let body = json!({
            "model": self.model,
            "max_tokens": 4096,
            "system": system,
            "messages": [{"role": "user", "content": prompt}],
        });

        let mut request = self
            .client
            .post(format!("{endpoint}/v1/messages"))
            .header("anthropic-version", "2023-06-01")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TraceOsError::OracleTimeout(self.timeout.as_secs())
                } else {
                    TraceOsError::OracleUnavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TraceOsError::OracleUnavailable(format!("{status}: {text}")));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| TraceOsError::OracleUnavailable(e.to_string()))?;

        extract_text(&parsed).ok_or_else(|| {
            TraceOsError::OracleUnavailable("oracle response had no text content".into())
        })
    }

    pub async fn check_health(&self) -> bool {
        let Some(endpoint) = &self.endpoint else {
            return false;
        };
        self.client
            .get(format!("{endpoint}/v1/health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

fn extract_text(response: &Value) -> Option<String> {
    response
        .get("content")?
        .as_array()?
        .iter()
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_endpoint_is_oracle_unavailable() {
        let client = OracleClient::new(None, None, "claude-sonnet-4-20250514".into(), 30);
        let err = client.complete("system", "prompt").await.unwrap_err();
        assert!(matches!(err, TraceOsError::OracleUnavailable(_)));
    }

    #[tokio::test]
    async fn health_check_false_without_endpoint() {
        let client = OracleClient::new(None, None, "claude-sonnet-4-20250514".into(), 30);
        assert!(!client.check_health().await);
    }

    #[test]
    fn extract_text_joins_multiple_blocks() {
        let response = json!({
            "content": [{"type": "text", "text": "hello "}, {"type": "text", "text": "world"}]
        });
        assert_eq!(extract_text(&response), Some("hello world".to_string()));
    }

    #[test]
    fn extract_text_none_without_content() {
        assert_eq!(extract_text(&json!({})), None);
    }
}
