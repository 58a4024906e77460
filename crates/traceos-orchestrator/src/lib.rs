mod agent;
mod contract;
mod dispatcher;

pub use agent::{Agent, AgentRegistry, AgentTaskRequest, AgentTaskResult};
pub use contract::{ContractFilter, ContractStore};
pub use dispatcher::{Dispatcher, EventLogSink, NoopEventLogSink, OrchestrationResult, TaskInput};
