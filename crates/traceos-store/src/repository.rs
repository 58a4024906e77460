use rusqlite::params;
use traceos_types::{CognitiveMemoryBlock, IntentProfile, StyleDna, TelemetryChunk, TraceOsError};

use crate::db::DbHandle;
use crate::vector::{bytes_to_vector, vector_to_bytes, verify_style_dna_checksum};

/// CRUD over the four tri-state tables. Each `save_*` is an UPSERT keyed by
/// primary key; list/map fields are stored as canonical JSON text.
#[derive(Clone)]
pub struct TriStateRepository {
    db: DbHandle,
}

impl TriStateRepository {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    pub fn save_block(&self, block: &CognitiveMemoryBlock) -> Result<(), TraceOsError> {
        let tags = serde_json::to_string(&block.tags).unwrap();
        let metadata = serde_json::to_string(&block.metadata).unwrap();
        let ld_context = block.ld_context.as_ref().map(|v| v.to_string());

        let existing: Option<String> = self
            .db
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT id FROM cognitive_memory_blocks WHERE session_id = ?1 AND artifact_id = ?2 AND id != ?3",
                    params![block.session_id, block.artifact_id, block.id],
                    |r| r.get(0),
                )
            })
            .ok();
        if existing.is_some() {
            return Err(TraceOsError::UniquenessViolation {
                entity: "cognitive_memory_blocks".into(),
                session_id: block.session_id.clone(),
                artifact_id: block.artifact_id.clone(),
            });
        }

        self.db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO cognitive_memory_blocks
                        (id, session_id, artifact_id, created_at, updated_at, ld_context,
                         derived_from, intent_profile_id, style_dna_id, tags, notes, metadata)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
                     ON CONFLICT(id) DO UPDATE SET
                        updated_at = excluded.updated_at,
                        ld_context = excluded.ld_context,
                        derived_from = excluded.derived_from,
                        intent_profile_id = excluded.intent_profile_id,
                        style_dna_id = excluded.style_dna_id,
                        tags = excluded.tags,
                        notes = excluded.notes,
                        metadata = excluded.metadata",
                    params![
                        block.id,
                        block.session_id,
                        block.artifact_id,
                        block.created_at.to_rfc3339(),
                        block.updated_at.to_rfc3339(),
                        ld_context,
                        block.derived_from,
                        block.intent_profile_id,
                        block.style_dna_id,
                        tags,
                        block.notes,
                        metadata,
                    ],
                )
            })
            .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    pub fn get_block_by_artifact(
        &self,
        session_id: &str,
        artifact_id: &str,
    ) -> Result<Option<CognitiveMemoryBlock>, TraceOsError> {
        self.db
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT id, session_id, artifact_id, created_at, updated_at, ld_context,
                            derived_from, intent_profile_id, style_dna_id, tags, notes, metadata
                     FROM cognitive_memory_blocks WHERE session_id = ?1 AND artifact_id = ?2",
                    params![session_id, artifact_id],
                    row_to_block,
                )
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(TraceOsError::MigrationFailed(other.to_string())),
            })
    }

    pub fn get_block(&self, id: &str) -> Result<Option<CognitiveMemoryBlock>, TraceOsError> {
        self.db
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT id, session_id, artifact_id, created_at, updated_at, ld_context,
                            derived_from, intent_profile_id, style_dna_id, tags, notes, metadata
                     FROM cognitive_memory_blocks WHERE id = ?1",
                    params![id],
                    row_to_block,
                )
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(TraceOsError::MigrationFailed(other.to_string())),
            })
    }

    pub fn save_style_dna(&self, dna: &StyleDna) -> Result<(), TraceOsError> {
        if !verify_style_dna_checksum(
            dna.stroke_dna.as_deref(),
            dna.image_dna.as_deref(),
            dna.temporal_dna.as_deref(),
            dna.checksum.as_deref(),
        ) {
            return Err(TraceOsError::ChecksumMismatch {
                entity: "style_dna".into(),
                id: dna.id.clone(),
            });
        }

        let to_blob = |v: Option<&[f32]>| -> Result<Option<Vec<u8>>, TraceOsError> {
            match v {
                None => Ok(None),
                Some(v) => vector_to_bytes(v)
                    .map(Some)
                    .map_err(|_| TraceOsError::VectorDimensionError {
                        expected: traceos_types::STYLE_VECTOR_DIM,
                        actual: v.len(),
                    }),
            }
        };
        let stroke = to_blob(dna.stroke_dna.as_deref())?;
        let image = to_blob(dna.image_dna.as_deref())?;
        let temporal = to_blob(dna.temporal_dna.as_deref())?;

        self.db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO style_dna (id, artifact_id, stroke_dna, image_dna, temporal_dna, created_at, l2_norm, checksum)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
                     ON CONFLICT(id) DO UPDATE SET
                        stroke_dna = excluded.stroke_dna,
                        image_dna = excluded.image_dna,
                        temporal_dna = excluded.temporal_dna,
                        l2_norm = excluded.l2_norm,
                        checksum = excluded.checksum",
                    params![
                        dna.id,
                        dna.artifact_id,
                        stroke,
                        image,
                        temporal,
                        dna.created_at.to_rfc3339(),
                        dna.l2_norm,
                        dna.checksum,
                    ],
                )
            })
            .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    pub fn get_style_dna(&self, id: &str) -> Result<Option<StyleDna>, TraceOsError> {
        let dna = self
            .db
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT id, artifact_id, stroke_dna, image_dna, temporal_dna, created_at, l2_norm, checksum
                     FROM style_dna WHERE id = ?1",
                    params![id],
                    row_to_style_dna,
                )
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(TraceOsError::MigrationFailed(other.to_string())),
            })?;

        let Some(dna) = dna else {
            return Ok(None);
        };
        if !verify_style_dna_checksum(
            dna.stroke_dna.as_deref(),
            dna.image_dna.as_deref(),
            dna.temporal_dna.as_deref(),
            dna.checksum.as_deref(),
        ) {
            return Err(TraceOsError::ChecksumMismatch {
                entity: "style_dna".into(),
                id: dna.id,
            });
        }
        Ok(Some(dna))
    }

    pub fn save_intent_profile(&self, profile: &IntentProfile) -> Result<(), TraceOsError> {
        let constraints = serde_json::to_string(&profile.constraints).unwrap();
        let style_keywords = serde_json::to_string(&profile.style_keywords).unwrap();
        self.db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO intent_profiles
                        (id, session_id, artifact_id, emotional_register, target_audience,
                         constraints, narrative_prompt, style_keywords, created_at, source)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
                     ON CONFLICT(id) DO UPDATE SET
                        emotional_register = excluded.emotional_register,
                        target_audience = excluded.target_audience,
                        constraints = excluded.constraints,
                        narrative_prompt = excluded.narrative_prompt,
                        style_keywords = excluded.style_keywords,
                        source = excluded.source",
                    params![
                        profile.id,
                        profile.session_id,
                        profile.artifact_id,
                        profile.emotional_register,
                        profile.target_audience,
                        constraints,
                        profile.narrative_prompt,
                        style_keywords,
                        profile.created_at.to_rfc3339(),
                        profile.source,
                    ],
                )
            })
            .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    pub fn get_intent_profile(&self, id: &str) -> Result<Option<IntentProfile>, TraceOsError> {
        self.db
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT id, session_id, artifact_id, emotional_register, target_audience,
                            constraints, narrative_prompt, style_keywords, created_at, source
                     FROM intent_profiles WHERE id = ?1",
                    params![id],
                    row_to_intent,
                )
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(TraceOsError::MigrationFailed(other.to_string())),
            })
    }

    pub fn save_telemetry_chunk(&self, chunk: &TelemetryChunk) -> Result<(), TraceOsError> {
        self.db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO telemetry_chunks
                        (id, session_id, artifact_id, parquet_path, chunk_row_count,
                         total_session_rows, created_at, schema_version)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    params![
                        chunk.id,
                        chunk.session_id,
                        chunk.artifact_id,
                        chunk.parquet_path,
                        chunk.chunk_row_count,
                        chunk.total_session_rows,
                        chunk.created_at.to_rfc3339(),
                        chunk.schema_version,
                    ],
                )
            })
            .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    /// Chunks for a session, ordered by insertion (rowid) — the order in
    /// which telemetry was actually appended.
    pub fn list_chunks_by_session(&self, session_id: &str) -> Result<Vec<TelemetryChunk>, TraceOsError> {
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, session_id, artifact_id, parquet_path, chunk_row_count,
                            total_session_rows, created_at, schema_version
                     FROM telemetry_chunks WHERE session_id = ?1 ORDER BY rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![session_id], row_to_chunk)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))
    }
}

fn row_to_block(row: &rusqlite::Row) -> rusqlite::Result<CognitiveMemoryBlock> {
    let tags: String = row.get(9)?;
    let metadata: String = row.get(11)?;
    let ld_context: Option<String> = row.get(5)?;
    Ok(CognitiveMemoryBlock {
        id: row.get(0)?,
        session_id: row.get(1)?,
        artifact_id: row.get(2)?,
        created_at: parse_ts(row.get::<_, String>(3)?),
        updated_at: parse_ts(row.get::<_, String>(4)?),
        ld_context: ld_context.and_then(|s| serde_json::from_str(&s).ok()),
        derived_from: row.get(6)?,
        intent_profile_id: row.get(7)?,
        style_dna_id: row.get(8)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        notes: row.get(10)?,
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
    })
}

fn row_to_style_dna(row: &rusqlite::Row) -> rusqlite::Result<StyleDna> {
    let stroke: Option<Vec<u8>> = row.get(2)?;
    let image: Option<Vec<u8>> = row.get(3)?;
    let temporal: Option<Vec<u8>> = row.get(4)?;
    Ok(StyleDna {
        id: row.get(0)?,
        artifact_id: row.get(1)?,
        stroke_dna: stroke.and_then(|b| bytes_to_vector(&b).ok()),
        image_dna: image.and_then(|b| bytes_to_vector(&b).ok()),
        temporal_dna: temporal.and_then(|b| bytes_to_vector(&b).ok()),
        created_at: parse_ts(row.get::<_, String>(5)?),
        l2_norm: row.get(6)?,
        checksum: row.get(7)?,
    })
}

fn row_to_intent(row: &rusqlite::Row) -> rusqlite::Result<IntentProfile> {
    let constraints: String = row.get(5)?;
    let style_keywords: String = row.get(7)?;
    Ok(IntentProfile {
        id: row.get(0)?,
        session_id: row.get(1)?,
        artifact_id: row.get(2)?,
        emotional_register: row.get(3)?,
        target_audience: row.get(4)?,
        constraints: serde_json::from_str(&constraints).unwrap_or_default(),
        narrative_prompt: row.get(6)?,
        style_keywords: serde_json::from_str(&style_keywords).unwrap_or_default(),
        created_at: parse_ts(row.get::<_, String>(8)?),
        source: row.get(9)?,
    })
}

fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<TelemetryChunk> {
    Ok(TelemetryChunk {
        id: row.get(0)?,
        session_id: row.get(1)?,
        artifact_id: row.get(2)?,
        parquet_path: row.get(3)?,
        chunk_row_count: row.get::<_, i64>(4)? as usize,
        total_session_rows: row.get::<_, i64>(5)? as usize,
        created_at: parse_ts(row.get::<_, String>(6)?),
        schema_version: row.get::<_, i64>(7)? as u32,
    })
}

fn parse_ts(s: String) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_connection;
    use crate::migration::migrate;
    use chrono::Utc;
    use std::collections::HashMap;

    fn repo() -> TriStateRepository {
        let dir = tempfile::tempdir().unwrap();
        let db = open_connection(&dir.path().join("db.sqlite")).unwrap();
        migrate(&db, false).unwrap();
        // Leak the tempdir so its files outlive this helper's scope.
        std::mem::forget(dir);
        TriStateRepository::new(db)
    }

    fn sample_block(session: &str, artifact: &str) -> CognitiveMemoryBlock {
        CognitiveMemoryBlock {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session.into(),
            artifact_id: artifact.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ld_context: None,
            derived_from: None,
            intent_profile_id: None,
            style_dna_id: None,
            tags: vec!["a".into(), "b".into()],
            notes: Some("note".into()),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn save_and_get_block_roundtrip() {
        let repo = repo();
        let block = sample_block("s1", "a1");
        repo.save_block(&block).unwrap();
        let loaded = repo.get_block_by_artifact("s1", "a1").unwrap().unwrap();
        assert_eq!(loaded.tags, vec!["a", "b"]);
    }

    #[test]
    fn composite_uniqueness_enforced() {
        let repo = repo();
        let block1 = sample_block("s1", "a1");
        repo.save_block(&block1).unwrap();
        let mut block2 = sample_block("s1", "a1");
        block2.id = uuid::Uuid::new_v4().to_string();
        let err = repo.save_block(&block2).unwrap_err();
        assert!(matches!(err, TraceOsError::UniquenessViolation { .. }));
    }

    #[test]
    fn upsert_same_id_updates_in_place() {
        let repo = repo();
        let mut block = sample_block("s1", "a1");
        repo.save_block(&block).unwrap();
        block.notes = Some("updated".into());
        repo.save_block(&block).unwrap();
        let loaded = repo.get_block_by_artifact("s1", "a1").unwrap().unwrap();
        assert_eq!(loaded.notes.as_deref(), Some("updated"));
    }

    #[test]
    fn get_block_by_id_roundtrip() {
        let repo = repo();
        let block = sample_block("s1", "a1");
        repo.save_block(&block).unwrap();
        let loaded = repo.get_block(&block.id).unwrap().unwrap();
        assert_eq!(loaded.artifact_id, "a1");
    }

    fn sample_style_dna(stroke_fill: f32) -> StyleDna {
        let stroke_dna = vec![stroke_fill; traceos_types::STYLE_VECTOR_DIM];
        let checksum = crate::vector::compute_style_dna_checksum(Some(&stroke_dna), None, None);
        StyleDna {
            id: uuid::Uuid::new_v4().to_string(),
            artifact_id: "a1".into(),
            stroke_dna: Some(stroke_dna.clone()),
            image_dna: None,
            temporal_dna: None,
            created_at: Utc::now(),
            l2_norm: crate::vector::compute_l2_norm(&stroke_dna),
            checksum,
        }
    }

    #[test]
    fn save_and_get_style_dna_roundtrip() {
        let repo = repo();
        let dna = sample_style_dna(0.5);
        repo.save_style_dna(&dna).unwrap();
        let loaded = repo.get_style_dna(&dna.id).unwrap().unwrap();
        assert_eq!(loaded.stroke_dna, dna.stroke_dna);
    }

    #[test]
    fn get_style_dna_detects_corruption_on_read() {
        let repo = repo();
        let dna = sample_style_dna(0.5);
        repo.save_style_dna(&dna).unwrap();

        // Flip a single byte of the stored vector directly, bypassing save_style_dna's
        // own write-time check, to simulate corruption that happens after the write.
        repo.db
            .with_connection(|conn| {
                let corrupted = vector_to_bytes(&vec![9.0f32; traceos_types::STYLE_VECTOR_DIM]).unwrap();
                conn.execute(
                    "UPDATE style_dna SET stroke_dna = ?1 WHERE id = ?2",
                    params![corrupted, dna.id],
                )
            })
            .unwrap();

        let err = repo.get_style_dna(&dna.id).unwrap_err();
        assert!(matches!(err, TraceOsError::ChecksumMismatch { .. }));
    }
}
