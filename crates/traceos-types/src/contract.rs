use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractType {
    Request,
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

/// Agent-to-agent contract (REQUEST or RESPONSE). Tracks communication
/// between agents for orchestration transparency, provenance, and auditing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Lexicographically monotonic (ULID), so sorting by id matches creation
    /// order even under concurrent inserts.
    pub contract_id: String,
    pub session_id: String,
    pub contract_type: ContractType,
    pub from_agent: String,
    pub to_agent: String,
    pub capability: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractStats {
    pub total_sessions: usize,
    pub total_contracts: usize,
    pub by_status: HashMap<ContractStatus, usize>,
}
