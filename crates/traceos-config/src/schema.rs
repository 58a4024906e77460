use serde::{Deserialize, Serialize};

fn default_storage_root() -> String {
    "./data/traceos".into()
}
fn default_migration_lock_timeout_secs() -> u64 {
    30
}
fn default_row_group_rows() -> usize {
    1024
}
fn default_oracle_timeout_secs() -> u64 {
    30
}
fn default_oracle_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_event_log_timeout_secs() -> u64 {
    30
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_gut_decay() -> f64 {
    0.95
}
fn default_gut_min_dwell_secs() -> f64 {
    2.0
}
fn default_gut_max_events() -> usize {
    100
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub event_log: EventLogConfig,
    #[serde(default)]
    pub gut: GutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database, migration lock file, and
    /// per-session Parquet telemetry chunks.
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
    /// When true, a table-signature mismatch during migration aborts startup.
    /// When false, a mismatch is logged as a warning and startup continues.
    #[serde(default)]
    pub strict_migrations: bool,
    /// Maximum time to wait on the cross-process migration advisory lock
    /// before giving up.
    #[serde(default = "default_migration_lock_timeout_secs")]
    pub migration_lock_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            strict_migrations: false,
            migration_lock_timeout_secs: default_migration_lock_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Number of stroke samples buffered before a Parquet row group is
    /// flushed to the per-session writer.
    #[serde(default = "default_row_group_rows")]
    pub row_group_rows: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            row_group_rows: default_row_group_rows(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub endpoint: Option<String>,
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_oracle_model")]
    pub model: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_oracle_timeout_secs(),
            model: default_oracle_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    pub endpoint: Option<String>,
    #[serde(default = "default_event_log_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout for the non-fatal startup health probe, kept shorter than
    /// `timeout_secs` so a slow event log doesn't stall process boot.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_event_log_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GutConfig {
    /// EMA decay applied to frustration/flow on every batch, before deltas
    /// for the new events are added.
    #[serde(default = "default_gut_decay")]
    pub decay: f64,
    /// Minimum time a mood must be held before another transition is
    /// accepted, except for Chaos entry which has its own sustained-window
    /// rule.
    #[serde(default = "default_gut_min_dwell_secs")]
    pub min_dwell_secs: f64,
    /// Capacity of the per-session bounded event window.
    #[serde(default = "default_gut_max_events")]
    pub max_events: usize,
}

impl Default for GutConfig {
    fn default() -> Self {
        Self {
            decay: default_gut_decay(),
            min_dwell_secs: default_gut_min_dwell_secs(),
            max_events: default_gut_max_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_storage_root_is_relative_data_dir() {
        let c = Config::default();
        assert_eq!(c.storage.storage_root, "./data/traceos");
    }

    #[test]
    fn config_default_migrations_not_strict() {
        let c = Config::default();
        assert!(!c.storage.strict_migrations);
    }

    #[test]
    fn config_default_gut_decay_matches_spec() {
        let c = Config::default();
        assert_eq!(c.gut.decay, 0.95);
        assert_eq!(c.gut.max_events, 100);
        assert_eq!(c.gut.min_dwell_secs, 2.0);
    }

    #[test]
    fn config_partial_yaml_fills_in_defaults() {
        let yaml = "gut:\n  decay: 0.9\n";
        let c: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.gut.decay, 0.9);
        assert_eq!(c.gut.max_events, 100);
        assert_eq!(c.storage.storage_root, "./data/traceos");
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let c = Config::default();
        let yaml = serde_yaml::to_string(&c).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.storage.storage_root, c.storage.storage_root);
    }
}
