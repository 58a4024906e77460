// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! End-to-end exercise of a bootstrapped runtime: migration, ingestion,
//! orchestration, and valuation wired together the way the binary runs them.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use traceos_ingest::{IngestArtifactRequest, StrokeSample};
use traceos_orchestrator::{Agent, AgentTaskRequest, AgentTaskResult};
use traceos_runtime::Runtime;
use traceos_types::{AgentCapability, AgentMetadata, AgentStatus, ResonanceEvent};

fn echo_agent_metadata() -> AgentMetadata {
    AgentMetadata {
        agent_id: "echo-agent".into(),
        name: "Echo Agent".into(),
        description: "echoes its parameters back".into(),
        capabilities: vec![AgentCapability {
            name: "echo".into(),
            description: "echo".into(),
            parameters: Default::default(),
        }],
        status: AgentStatus::Available,
        version: "0.1.0".into(),
        endpoint: None,
        registered_at: Utc::now(),
        last_heartbeat: Utc::now(),
        tasks_completed: 0,
        tasks_failed: 0,
    }
}

fn test_config(dir: &std::path::Path) -> traceos_config::Config {
    let mut config = traceos_config::Config::default();
    config.storage.storage_root = dir.to_string_lossy().to_string();
    config
}

struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    async fn execute(&self, request: AgentTaskRequest) -> AgentTaskResult {
        AgentTaskResult {
            success: true,
            data: Some(json!({ "echoed": request.parameters })),
            error: None,
        }
    }
}

#[tokio::test]
async fn bootstrap_then_ingest_then_orchestrate_then_valuate() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Runtime::bootstrap(test_config(dir.path())).await.unwrap();

    let ingest_result = runtime
        .ingestion
        .ingest_artifact(IngestArtifactRequest {
            session_id: "session-1".into(),
            artifact_id: "artifact-1".into(),
            telemetry: vec![],
            strokes: Some(vec![
                StrokeSample { x: 0.0, y: 0.0, pressure: 0.1 },
                StrokeSample { x: 1.0, y: 2.0, pressure: 0.4 },
            ]),
            image_bytes: None,
            timestamps: None,
            intent: None,
            tags: vec!["sketch".into()],
            notes: None,
            derived_from: None,
        })
        .unwrap();
    assert!(!ingest_result.block_id.is_empty());

    assert!(runtime.agents.register(echo_agent_metadata(), Arc::new(EchoAgent)));

    let outcome = runtime
        .dispatcher
        .orchestrate(
            "session-1",
            traceos_orchestrator::TaskInput {
                capability: "echo".into(),
                parameters: json!({ "hello": "world" }),
                context: json!({}),
            },
            None,
        )
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(runtime.contracts.get_conversation("session-1").len(), 2);

    let state = runtime.gut.ingest_batch(
        "session-1",
        vec![ResonanceEvent {
            event_type: "stroke_accept".into(),
            timestamp: Utc::now().timestamp() as f64,
            session_id: "session-1".into(),
            latency_ms: None,
            erratic_input: None,
            context: None,
        }],
    );
    assert_eq!(state.mood, traceos_types::MoodState::Calm);

    runtime.shutdown().unwrap();
}
