use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use traceos_orchestrator::EventLogSink;
use traceos_types::{Contract, TraceOsError};

/// Client for the external event log. `POST /v1/sessions/{id}/events`
/// appends, `GET /v1/sessions/{id}/events` lists, and `/health` backs the
/// availability probe per §6.
#[derive(Clone)]
pub struct EventLogClient {
    endpoint: Option<String>,
    timeout: Duration,
    probe_timeout: Duration,
    client: reqwest::Client,
}

impl EventLogClient {
    pub fn new(endpoint: Option<String>, timeout_secs: u64, probe_timeout_secs: u64) -> Self {
        Self {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            probe_timeout: Duration::from_secs(probe_timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    pub async fn append_event(&self, session_id: &str, event_type: &str, data: Value) -> Result<(), TraceOsError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| TraceOsError::EventLogUnavailable("no event log endpoint configured".into()))?;

        let body = json!({ "event_type": event_type, "data": data });

        let response = self
            .client
            .post(format!("{endpoint}/v1/sessions/{session_id}/events"))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TraceOsError::EventLogUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TraceOsError::EventLogUnavailable(format!(
                "event log returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn list_events(&self, session_id: &str) -> Result<Vec<Value>, TraceOsError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| TraceOsError::EventLogUnavailable("no event log endpoint configured".into()))?;

        let response = self
            .client
            .get(format!("{endpoint}/v1/sessions/{session_id}/events"))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TraceOsError::EventLogUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TraceOsError::EventLogUnavailable(format!(
                "event log returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TraceOsError::EventLogUnavailable(e.to_string()))?;

        Ok(body
            .get("events")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// 5 s liveness probe against `/health`, independent of the longer
    /// read/write timeout.
    pub async fn check_health(&self) -> bool {
        let Some(endpoint) = &self.endpoint else {
            return false;
        };
        self.client
            .get(format!("{endpoint}/health"))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl EventLogSink for EventLogClient {
    async fn emit_contract(&self, contract: &Contract) -> anyhow::Result<()> {
        let type_str = match contract.contract_type {
            traceos_types::ContractType::Request => "request",
            traceos_types::ContractType::Response => "response",
        };
        let event_type = format!("contract.{type_str}");
        let data = json!({
            "contract_id": contract.contract_id,
            "from_agent": contract.from_agent,
            "to_agent": contract.to_agent,
            "capability": contract.capability,
            "payload": contract.payload,
            "status": contract.status,
            "result": contract.result,
            "error": contract.error,
        });
        self.append_event(&contract.session_id, &event_type, data)
            .await
            .map_err(anyhow::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_endpoint_fails_append() {
        let client = EventLogClient::new(None, 30, 5);
        let err = client.append_event("s1", "contract.request", json!({})).await.unwrap_err();
        assert!(matches!(err, TraceOsError::EventLogUnavailable(_)));
    }

    #[tokio::test]
    async fn health_check_false_without_endpoint() {
        let client = EventLogClient::new(None, 30, 5);
        assert!(!client.check_health().await);
    }
}
