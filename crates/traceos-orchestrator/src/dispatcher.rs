use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use traceos_types::{AgentStatus, Contract, ContractStatus, ContractType, TraceOsError};

use crate::agent::{AgentRegistry, AgentTaskRequest};
use crate::contract::ContractStore;

pub const DEFAULT_FROM_AGENT: &str = "orchestrator";

#[derive(Debug, Clone, Deserialize)]
pub struct TaskInput {
    pub capability: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub context: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub contract_id: String,
    pub agent_id: String,
}

/// Sink the dispatcher emits REQUEST/RESPONSE contracts to. Emission failure
/// is logged and otherwise swallowed — it never blocks or fails the
/// orchestration loop.
#[async_trait]
pub trait EventLogSink: Send + Sync {
    async fn emit_contract(&self, contract: &Contract) -> anyhow::Result<()>;
}

/// Sink that does nothing — the default when no external event log is
/// configured.
pub struct NoopEventLogSink;

#[async_trait]
impl EventLogSink for NoopEventLogSink {
    async fn emit_contract(&self, _contract: &Contract) -> anyhow::Result<()> {
        Ok(())
    }
}

/// The orchestration loop: routes a capability-typed task to a registered
/// agent, tracking the exchange as a REQUEST/RESPONSE contract pair.
pub struct Dispatcher {
    agents: Arc<AgentRegistry>,
    contracts: Arc<ContractStore>,
    event_log: Arc<dyn EventLogSink>,
}

impl Dispatcher {
    pub fn new(
        agents: Arc<AgentRegistry>,
        contracts: Arc<ContractStore>,
        event_log: Arc<dyn EventLogSink>,
    ) -> Self {
        Self {
            agents,
            contracts,
            event_log,
        }
    }

    async fn emit(&self, contract: &Contract) {
        if let Err(e) = self.event_log.emit_contract(contract).await {
            tracing::warn!(
                contract_id = %contract.contract_id,
                error = %e,
                "failed to emit contract to event log"
            );
        }
    }

    pub async fn orchestrate(
        &self,
        session_id: &str,
        task: TaskInput,
        from_agent: Option<&str>,
    ) -> Result<OrchestrationResult, TraceOsError> {
        let from_agent = from_agent.unwrap_or(DEFAULT_FROM_AGENT);

        // Step 1: find a capable agent. No contract is created on failure.
        let agent_id = self
            .agents
            .find_by_capability(&task.capability)
            .ok_or_else(|| TraceOsError::NoCapableAgent(task.capability.clone()))?;

        // Step 2: create the REQUEST contract (pending).
        let request_contract = self.contracts.create_contract(
            session_id,
            ContractType::Request,
            from_agent,
            &agent_id,
            Some(task.capability.clone()),
            task.parameters.clone(),
        );

        // Step 3: emit to the event log. Non-fatal on failure.
        self.emit(&request_contract).await;

        // Step 4: transition to in_progress.
        self.contracts
            .update_contract(&request_contract.contract_id, Some(ContractStatus::InProgress), None, None);

        // Step 5: mark the agent busy and invoke it.
        self.agents.set_status(&agent_id, AgentStatus::Busy);
        let handle = self
            .agents
            .handle_of(&agent_id)
            .ok_or_else(|| TraceOsError::NoCapableAgent(task.capability.clone()))?;

        let outcome = handle
            .execute(AgentTaskRequest {
                task_id: request_contract.contract_id.clone(),
                capability: task.capability.clone(),
                parameters: task.parameters.clone(),
                context: task.context.clone(),
            })
            .await;

        self.agents.increment_task_count(&agent_id, outcome.success);

        if outcome.success {
            self.agents.set_status(&agent_id, AgentStatus::Available);

            // Step 6: complete the REQUEST, create and emit the paired
            // RESPONSE.
            self.contracts.update_contract(
                &request_contract.contract_id,
                Some(ContractStatus::Completed),
                outcome.data.clone(),
                None,
            );

            let mut response_contract = self.contracts.create_contract(
                session_id,
                ContractType::Response,
                &agent_id,
                from_agent,
                None,
                serde_json::to_value(&outcome).unwrap_or(Value::Null),
            );
            self.contracts.update_contract(
                &response_contract.contract_id,
                Some(ContractStatus::Completed),
                outcome.data.clone(),
                outcome.error.clone(),
            );
            response_contract.result = outcome.data.clone();
            response_contract.error = outcome.error.clone();
            self.emit(&response_contract).await;

            Ok(OrchestrationResult {
                success: true,
                data: outcome.data,
                error: None,
                contract_id: request_contract.contract_id,
                agent_id,
            })
        } else {
            // Step 7: a returned failure sidelines the agent until it's
            // re-registered healthy. No automatic retry at this layer.
            self.agents.set_status(&agent_id, AgentStatus::Error);

            self.contracts.update_contract(
                &request_contract.contract_id,
                Some(ContractStatus::Failed),
                None,
                outcome.error.clone(),
            );

            let mut response_contract = self.contracts.create_contract(
                session_id,
                ContractType::Response,
                &agent_id,
                from_agent,
                None,
                serde_json::to_value(&outcome).unwrap_or(Value::Null),
            );
            self.contracts.update_contract(
                &response_contract.contract_id,
                Some(ContractStatus::Failed),
                None,
                outcome.error.clone(),
            );
            response_contract.error = outcome.error.clone();
            self.emit(&response_contract).await;

            Ok(OrchestrationResult {
                success: false,
                data: None,
                error: outcome.error,
                contract_id: request_contract.contract_id,
                agent_id,
            })
        }
    }
}
