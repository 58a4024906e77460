use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use traceos_compress::CompressionEngine;
use traceos_config::Config;
use traceos_gut::GutRegistry;
use traceos_ingest::IngestionEngine;
use traceos_integrations::{check_integrations, EventLogClient, IntegrationHealth, OracleClient};
use traceos_orchestrator::{AgentRegistry, ContractStore, Dispatcher};
use traceos_store::{migrate, open_connection, DbHandle, MigrationLock, TelemetryWriterPool, TriStateRepository};

/// Every long-lived handle a running process needs, wired up once at
/// startup and handed out to whichever surface (HTTP server, CLI command)
/// is driving this process.
pub struct Runtime {
    pub config: Config,
    pub db: DbHandle,
    pub repo: TriStateRepository,
    pub telemetry: Arc<TelemetryWriterPool>,
    pub ingestion: IngestionEngine,
    pub gut: GutRegistry,
    pub agents: Arc<AgentRegistry>,
    pub contracts: Arc<ContractStore>,
    pub dispatcher: Dispatcher,
    pub event_log: EventLogClient,
    pub oracle: OracleClient,
    pub compression: CompressionEngine,
}

impl Runtime {
    /// Bootstrap sequence: acquire the cross-process migration lock, open
    /// the database, migrate it, release the lock, then construct every
    /// singleton. A failed integration health probe is logged and does not
    /// fail startup — the oracle and event log are external services that
    /// may come up later.
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let storage_root = Path::new(&config.storage.storage_root);
        std::fs::create_dir_all(storage_root)
            .with_context(|| format!("creating storage root {}", storage_root.display()))?;
        let db_path = storage_root.join("traceos_memory.db");

        let mut lock = MigrationLock::new(&db_path);
        let acquired = lock
            .try_acquire(Duration::from_secs(config.storage.migration_lock_timeout_secs))
            .context("acquiring migration lock")?;
        if !acquired {
            anyhow::bail!(
                "timed out after {}s waiting for the migration lock held by another process",
                config.storage.migration_lock_timeout_secs
            );
        }

        let db = open_connection(&db_path).context("opening database")?;
        let outcome = migrate(&db, config.storage.strict_migrations)?;
        lock.release();
        tracing::info!(?outcome, "storage ready");

        let repo = TriStateRepository::new(db.clone());
        let telemetry = Arc::new(TelemetryWriterPool::new(
            traceos_store::default_telemetry_dir(storage_root),
        ));
        let ingestion = IngestionEngine::new(repo.clone(), telemetry.clone());

        let gut = GutRegistry::new(
            config.gut.max_events,
            config.gut.decay,
            config.gut.min_dwell_secs,
        );

        let agents = Arc::new(AgentRegistry::new());
        let contracts = Arc::new(ContractStore::new(storage_root.join("contracts"))?);

        let event_log = EventLogClient::new(
            config.event_log.endpoint.clone(),
            config.event_log.timeout_secs,
            config.event_log.probe_timeout_secs,
        );
        let oracle = OracleClient::new(
            config.oracle.endpoint.clone(),
            std::env::var("TRACEOS_ORACLE_API_KEY").ok(),
            config.oracle.model.clone(),
            config.oracle.timeout_secs,
        );

        let dispatcher = Dispatcher::new(
            agents.clone(),
            contracts.clone(),
            Arc::new(event_log.clone()),
        );
        let compression = CompressionEngine::new(event_log.clone(), oracle.clone(), repo.clone());

        let health = check_integrations(&oracle, &event_log).await;
        log_integration_health(&health);

        Ok(Self {
            config,
            db,
            repo,
            telemetry,
            ingestion,
            gut,
            agents,
            contracts,
            dispatcher,
            event_log,
            oracle,
            compression,
        })
    }

    /// Probe the oracle and event log again, without touching any other
    /// state. Used by the `/status` surface and the `show-config` CLI path.
    pub async fn integration_health(&self) -> IntegrationHealth {
        check_integrations(&self.oracle, &self.event_log).await
    }

    /// Orderly shutdown: finalize every open telemetry writer so no Parquet
    /// file is left without a footer, then checkpoint the WAL back into the
    /// main database file.
    pub fn shutdown(&self) -> anyhow::Result<()> {
        self.telemetry.close_all()?;
        self.db
            .with_connection(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
            .context("checkpointing WAL on shutdown")?;
        tracing::info!("runtime shut down cleanly");
        Ok(())
    }
}

fn log_integration_health(health: &IntegrationHealth) {
    if health.all_healthy {
        tracing::info!("oracle and event log both reachable");
    } else {
        tracing::warn!(
            oracle = health.oracle,
            event_log = health.event_log,
            "one or more external integrations unreachable at startup; continuing anyway"
        );
    }
}
