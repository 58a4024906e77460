use thiserror::Error;

/// Core error taxonomy shared across the store, orchestrator, valuation, and
/// compression crates. None of these variants are retried automatically —
/// retry policy, if any, belongs to the caller.
#[derive(Debug, Error)]
pub enum TraceOsError {
    #[error("no agent registered with capability: {0}")]
    NoCapableAgent(String),

    #[error("uniqueness violation on {entity} for ({session_id}, {artifact_id})")]
    UniquenessViolation {
        entity: String,
        session_id: String,
        artifact_id: String,
    },

    #[error("checksum mismatch for {entity} {id}")]
    ChecksumMismatch { entity: String, id: String },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    VectorDimensionError { expected: usize, actual: usize },

    #[error("migration signature mismatch for table {table}")]
    MigrationSignatureMismatch { table: String },

    #[error("schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("oracle request timed out after {0}s")]
    OracleTimeout(u64),

    #[error("event log unavailable: {0}")]
    EventLogUnavailable(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("agent execution failed: {0}")]
    AgentExecutionFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
