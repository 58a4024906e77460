use serde::Serialize;

use crate::{EventLogClient, OracleClient};

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationHealth {
    pub oracle: bool,
    pub event_log: bool,
    pub all_healthy: bool,
}

/// Probe both external integrations concurrently and summarize. Neither
/// probe blocks the other.
pub async fn check_integrations(oracle: &OracleClient, event_log: &EventLogClient) -> IntegrationHealth {
    let (oracle_ok, event_log_ok) = tokio::join!(oracle.check_health(), event_log.check_health());
    IntegrationHealth {
        oracle: oracle_ok,
        event_log: event_log_ok,
        all_healthy: oracle_ok && event_log_ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_integrations_report_unhealthy() {
        let oracle = OracleClient::new(None, None, "claude-sonnet-4-20250514".into(), 30);
        let event_log = EventLogClient::new(None, 30, 5);
        let health = check_integrations(&oracle, &event_log).await;
        assert!(!health.oracle);
        assert!(!health.event_log);
        assert!(!health.all_healthy);
    }
}
