use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Value};
use traceos_integrations::{EventLogClient, OracleClient};
use traceos_store::TriStateRepository;
use traceos_types::{CognitiveMemoryBlock, TraceOsError};

use crate::filter::{filter_and_rank, TraceEvent};
use crate::format::format_events;
use crate::parse::{parse_compression_response, CompressionResult};
use crate::prompt::{build_prompt, COMPRESSION_SYSTEM_PROMPT};

#[derive(Debug)]
pub struct CompressionOutcome {
    pub block_id: String,
    pub result: CompressionResult,
}

/// Pulls a session's events from the external event log, filters and
/// structures them, obtains a compressed narrative via the oracle, and
/// persists the result as an augmented `CognitiveMemoryBlock`.
pub struct CompressionEngine {
    event_log: EventLogClient,
    oracle: OracleClient,
    repo: TriStateRepository,
}

impl CompressionEngine {
    pub fn new(event_log: EventLogClient, oracle: OracleClient, repo: TriStateRepository) -> Self {
        Self { event_log, oracle, repo }
    }

    /// Run the full pipeline. `allow_mock_fallback` selects dev-mode
    /// behavior when the event log is unreachable: `true` substitutes
    /// deterministic mock events for testing, `false` (production) surfaces
    /// `EventLogUnavailable` and halts.
    pub async fn compress_session(
        &self,
        session_id: &str,
        intent: Option<&str>,
        allow_mock_fallback: bool,
    ) -> Result<CompressionOutcome, TraceOsError> {
        let raw_events = match self.event_log.list_events(session_id).await {
            Ok(events) => events,
            Err(e) if allow_mock_fallback => {
                tracing::warn!(session_id, error = %e, "event log unavailable, using mock fallback data");
                mock_events()
            }
            Err(e) => return Err(e),
        };

        let events: Vec<TraceEvent> = raw_events
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();

        let filtered = filter_and_rank(events);
        let formatted = format_events(&filtered);
        let tokens_in = formatted.split_whitespace().count();

        let prompt = build_prompt(&formatted);
        let reply = self.oracle.complete(COMPRESSION_SYSTEM_PROMPT, &prompt).await?;

        let result = parse_compression_response(&reply, filtered.len(), tokens_in);

        let block_id = uuid::Uuid::new_v4().to_string();
        let block = CognitiveMemoryBlock {
            id: block_id.clone(),
            session_id: session_id.to_string(),
            artifact_id: format!("compression:{session_id}"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ld_context: None,
            derived_from: None,
            intent_profile_id: None,
            style_dna_id: None,
            tags: vec!["compression".to_string()],
            notes: intent.map(String::from),
            metadata: compression_metadata(&result),
        };
        self.repo.save_block(&block)?;

        Ok(CompressionOutcome { block_id, result })
    }
}

fn compression_metadata(result: &CompressionResult) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();
    metadata.insert("summary".into(), json!(result.summary));
    metadata.insert("key_decisions".into(), json!(result.key_decisions));
    metadata.insert("active_modifiers".into(), json!(result.active_modifiers));
    metadata.insert("user_preferences".into(), json!(result.user_preferences));
    metadata.insert("design_intent".into(), json!(result.design_intent));
    metadata.insert("events_processed".into(), json!(result.events_processed));
    metadata.insert("tokens_in".into(), json!(result.tokens_in));
    metadata.insert("tokens_out".into(), json!(result.tokens_out));
    metadata.insert("compression_ratio".into(), json!(result.compression_ratio));
    metadata
}

fn mock_events() -> Vec<Value> {
    vec![
        json!({"event_type": "session.created", "actor": "system", "timestamp": "2024-01-01T00:00:00Z", "data": {}}),
        json!({"event_type": "variation.accepted", "actor": "user", "timestamp": "2024-01-01T00:01:00Z", "data": {"text": "organic lines"}}),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use traceos_store::{migrate, open_connection};

    fn engine() -> CompressionEngine {
        let dir = tempfile::tempdir().unwrap();
        let db = open_connection(&dir.path().join("db.sqlite")).unwrap();
        migrate(&db, false).unwrap();
        std::mem::forget(dir);
        CompressionEngine::new(
            EventLogClient::new(None, 30, 5),
            OracleClient::new(None, None, "claude-sonnet-4-20250514".into(), 30),
            TriStateRepository::new(db),
        )
    }

    #[tokio::test]
    async fn unreachable_event_log_without_mock_fallback_errors() {
        let engine = engine();
        let err = engine.compress_session("s1", None, false).await.unwrap_err();
        assert!(matches!(err, TraceOsError::EventLogUnavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_oracle_surfaces_oracle_unavailable_even_with_mock_events() {
        let engine = engine();
        let err = engine.compress_session("s1", None, true).await.unwrap_err();
        assert!(matches!(err, TraceOsError::OracleUnavailable(_)));
    }
}
