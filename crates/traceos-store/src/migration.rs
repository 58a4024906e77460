use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::db::DbHandle;

pub const SCHEMA_VERSION: i64 = 25;

struct TableSchema {
    name: &'static str,
    ddl: &'static str,
    indexes: &'static [&'static str],
}

const TABLES: &[TableSchema] = &[
    TableSchema {
        name: "cognitive_memory_blocks",
        ddl: "CREATE TABLE IF NOT EXISTS cognitive_memory_blocks (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            artifact_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            ld_context TEXT,
            derived_from TEXT,
            intent_profile_id TEXT,
            style_dna_id TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            notes TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            UNIQUE(session_id, artifact_id),
            FOREIGN KEY(intent_profile_id) REFERENCES intent_profiles(id),
            FOREIGN KEY(style_dna_id) REFERENCES style_dna(id)
        )",
        indexes: &[
            "CREATE INDEX IF NOT EXISTS idx_cmb_session ON cognitive_memory_blocks(session_id)",
            "CREATE INDEX IF NOT EXISTS idx_cmb_artifact ON cognitive_memory_blocks(artifact_id)",
            "CREATE INDEX IF NOT EXISTS idx_cmb_created ON cognitive_memory_blocks(created_at)",
        ],
    },
    TableSchema {
        name: "style_dna",
        ddl: "CREATE TABLE IF NOT EXISTS style_dna (
            id TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL,
            stroke_dna BLOB,
            image_dna BLOB,
            temporal_dna BLOB,
            created_at TEXT NOT NULL,
            l2_norm REAL NOT NULL,
            checksum TEXT
        )",
        indexes: &["CREATE INDEX IF NOT EXISTS idx_style_dna_artifact ON style_dna(artifact_id)"],
    },
    TableSchema {
        name: "intent_profiles",
        ddl: "CREATE TABLE IF NOT EXISTS intent_profiles (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            artifact_id TEXT NOT NULL,
            emotional_register TEXT,
            target_audience TEXT,
            constraints TEXT NOT NULL DEFAULT '[]',
            narrative_prompt TEXT,
            style_keywords TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            source TEXT
        )",
        indexes: &[
            "CREATE INDEX IF NOT EXISTS idx_intent_session ON intent_profiles(session_id)",
            "CREATE INDEX IF NOT EXISTS idx_intent_artifact ON intent_profiles(artifact_id)",
        ],
    },
    TableSchema {
        name: "telemetry_chunks",
        ddl: "CREATE TABLE IF NOT EXISTS telemetry_chunks (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            artifact_id TEXT NOT NULL,
            parquet_path TEXT NOT NULL,
            chunk_row_count INTEGER NOT NULL,
            total_session_rows INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            schema_version INTEGER NOT NULL
        )",
        indexes: &["CREATE INDEX IF NOT EXISTS idx_telemetry_session ON telemetry_chunks(session_id)"],
    },
];

/// `sha256("{table_name}:{canonical_json({schema, indexes})}")`, matching the
/// original migration's signature derivation so a signature computed by an
/// older process version can still be compared against this one.
pub fn table_signature(table: &TableSchema) -> String {
    let canonical = serde_json::json!({
        "schema": table.ddl,
        "indexes": table.indexes,
    });
    let payload = format!("{}:{}", table.name, canonical);
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    Created,
    AlreadyCurrent,
    SignatureMismatch { table: String },
}

/// Idempotently create the admin tables and the four domain tables,
/// recording a signature for each. If the schema_versions table already
/// records a version at or above `SCHEMA_VERSION`, each table's current
/// signature is re-verified against what's recorded; mismatches are a
/// warning in non-strict mode and an error in strict mode.
pub fn migrate(db: &DbHandle, strict: bool) -> Result<MigrationOutcome, traceos_types::TraceOsError> {
    db.with_connection(|conn| {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_versions (
                version INTEGER NOT NULL,
                applied_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS table_signatures (
                table_name TEXT PRIMARY KEY,
                signature TEXT NOT NULL
            );",
        )
    })
    .map_err(|e| traceos_types::TraceOsError::MigrationFailed(e.to_string()))?;

    let current_version: i64 = db
        .with_connection(|conn| {
            conn.query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_versions",
                [],
                |r| r.get(0),
            )
        })
        .map_err(|e| traceos_types::TraceOsError::MigrationFailed(e.to_string()))?;

    if current_version >= SCHEMA_VERSION {
        for table in TABLES {
            let expected = table_signature(table);
            let recorded: Option<String> = db
                .with_connection(|conn| {
                    conn.query_row(
                        "SELECT signature FROM table_signatures WHERE table_name = ?1",
                        [table.name],
                        |r| r.get(0),
                    )
                })
                .ok();
            match recorded {
                Some(sig) if sig == expected => {}
                Some(_) => {
                    if strict {
                        return Err(traceos_types::TraceOsError::MigrationSignatureMismatch {
                            table: table.name.to_string(),
                        });
                    }
                    warn!(table = table.name, "table signature mismatch, continuing (non-strict mode)");
                    return Ok(MigrationOutcome::SignatureMismatch {
                        table: table.name.to_string(),
                    });
                }
                None => {
                    if strict {
                        return Err(traceos_types::TraceOsError::MigrationSignatureMismatch {
                            table: table.name.to_string(),
                        });
                    }
                }
            }
        }
        return Ok(MigrationOutcome::AlreadyCurrent);
    }

    for table in TABLES {
        db.with_connection(|conn| {
            conn.execute_batch(table.ddl)?;
            for idx in table.indexes {
                conn.execute_batch(idx)?;
            }
            Ok(())
        })
        .map_err(|e| traceos_types::TraceOsError::MigrationFailed(e.to_string()))?;

        let sig = table_signature(table);
        db.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO table_signatures (table_name, signature) VALUES (?1, ?2)",
                rusqlite::params![table.name, sig],
            )
        })
        .map_err(|e| traceos_types::TraceOsError::MigrationFailed(e.to_string()))?;
    }

    db.with_connection(|conn| {
        conn.execute(
            "INSERT INTO schema_versions (version, applied_at) VALUES (?1, datetime('now'))",
            rusqlite::params![SCHEMA_VERSION],
        )
    })
    .map_err(|e| traceos_types::TraceOsError::MigrationFailed(e.to_string()))?;

    info!(version = SCHEMA_VERSION, "schema migrated");
    Ok(MigrationOutcome::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_connection;

    #[test]
    fn migrate_creates_all_tables() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_connection(&dir.path().join("db.sqlite")).unwrap();
        let outcome = migrate(&db, false).unwrap();
        assert_eq!(outcome, MigrationOutcome::Created);

        for table in TABLES {
            let count: i64 = db
                .with_connection(|conn| {
                    conn.query_row(
                        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                        [table.name],
                        |r| r.get(0),
                    )
                })
                .unwrap();
            assert_eq!(count, 1, "table {} not created", table.name);
        }
    }

    #[test]
    fn migrate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_connection(&dir.path().join("db.sqlite")).unwrap();
        migrate(&db, false).unwrap();
        let second = migrate(&db, false).unwrap();
        assert_eq!(second, MigrationOutcome::AlreadyCurrent);
    }

    #[test]
    fn rerunning_ddl_against_existing_tables_does_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_connection(&dir.path().join("db.sqlite")).unwrap();
        migrate(&db, false).unwrap();

        // Simulate re-entering the create loop with tables already present
        // but the recorded version stale (e.g. a partially-applied bump).
        db.with_connection(|conn| {
            conn.execute("UPDATE schema_versions SET version = 0", [])
        })
        .unwrap();

        let outcome = migrate(&db, false).unwrap();
        assert_eq!(outcome, MigrationOutcome::Created);
    }

    #[test]
    fn signature_is_stable_for_same_schema() {
        let a = table_signature(&TABLES[0]);
        let b = table_signature(&TABLES[0]);
        assert_eq!(a, b);
    }

    #[test]
    fn signature_differs_across_tables() {
        let a = table_signature(&TABLES[0]);
        let b = table_signature(&TABLES[1]);
        assert_ne!(a, b);
    }
}
