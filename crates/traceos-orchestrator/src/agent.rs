use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use traceos_types::{AgentMetadata, AgentStatus};

/// What the dispatcher hands an agent to execute, and what it gets back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTaskRequest {
    pub task_id: String,
    pub capability: String,
    pub parameters: Value,
    #[serde(default)]
    pub context: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTaskResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

/// A worker the dispatcher can route capability-typed tasks to. Implementors
/// own whatever transport gets the task to the real worker (HTTP call,
/// in-process closure, subprocess) — the registry only ever sees this trait.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn execute(&self, request: AgentTaskRequest) -> AgentTaskResult;
}

struct AgentEntry {
    metadata: Mutex<AgentMetadata>,
    handle: Arc<dyn Agent>,
}

/// Process-local map from `agent_id` to descriptor plus live handle. No load
/// balancing, no queueing beyond status, no fairness guarantees — selection
/// among multiple capable agents returns whichever is found first.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentEntry>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Register an agent. Rejects a duplicate `agent_id` rather than
    /// overwriting it.
    pub fn register(&self, mut metadata: AgentMetadata, handle: Arc<dyn Agent>) -> bool {
        let mut agents = self.agents.write().expect("AgentRegistry lock poisoned");
        if agents.contains_key(&metadata.agent_id) {
            return false;
        }
        metadata.status = AgentStatus::Available;
        agents.insert(
            metadata.agent_id.clone(),
            AgentEntry {
                metadata: Mutex::new(metadata),
                handle,
            },
        );
        true
    }

    pub fn deregister(&self, agent_id: &str) -> bool {
        self.agents
            .write()
            .expect("AgentRegistry lock poisoned")
            .remove(agent_id)
            .is_some()
    }

    pub fn get_metadata(&self, agent_id: &str) -> Option<AgentMetadata> {
        let agents = self.agents.read().expect("AgentRegistry lock poisoned");
        agents
            .get(agent_id)
            .map(|e| e.metadata.lock().expect("agent metadata lock poisoned").clone())
    }

    pub fn list(&self) -> Vec<AgentMetadata> {
        let agents = self.agents.read().expect("AgentRegistry lock poisoned");
        agents
            .values()
            .map(|e| e.metadata.lock().expect("agent metadata lock poisoned").clone())
            .collect()
    }

    /// Return the id of any agent that is `available` and declares the
    /// capability. Callers that get `None` back must treat it as
    /// `NoCapableAgent`.
    pub fn find_by_capability(&self, capability: &str) -> Option<String> {
        let agents = self.agents.read().expect("AgentRegistry lock poisoned");
        agents.values().find_map(|e| {
            let meta = e.metadata.lock().expect("agent metadata lock poisoned");
            if meta.can_handle(capability) {
                Some(meta.agent_id.clone())
            } else {
                None
            }
        })
    }

    pub fn set_status(&self, agent_id: &str, status: AgentStatus) {
        let agents = self.agents.read().expect("AgentRegistry lock poisoned");
        if let Some(entry) = agents.get(agent_id) {
            entry.metadata.lock().expect("agent metadata lock poisoned").status = status;
        }
    }

    pub fn increment_task_count(&self, agent_id: &str, success: bool) {
        let agents = self.agents.read().expect("AgentRegistry lock poisoned");
        if let Some(entry) = agents.get(agent_id) {
            let mut meta = entry.metadata.lock().expect("agent metadata lock poisoned");
            if success {
                meta.tasks_completed += 1;
            } else {
                meta.tasks_failed += 1;
            }
        }
    }

    pub fn handle_of(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        let agents = self.agents.read().expect("AgentRegistry lock poisoned");
        agents.get(agent_id).map(|e| e.handle.clone())
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
