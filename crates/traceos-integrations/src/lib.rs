mod event_log;
mod health;
mod oracle;

pub use event_log::EventLogClient;
pub use health::{check_integrations, IntegrationHealth};
pub use oracle::OracleClient;
