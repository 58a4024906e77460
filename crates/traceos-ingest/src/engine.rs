use std::sync::Arc;

use chrono::Utc;
use traceos_store::{TelemetryWriterPool, TriStateRepository};
use traceos_types::{CognitiveMemoryBlock, IntentProfile, StyleDna, TelemetrySample, TraceOsError};

use crate::encoders::{compute_image_dna, compute_stroke_dna, compute_temporal_dna, StrokePoint};

pub use crate::encoders::StrokePoint as StrokeSample;

/// Everything needed to ingest one artifact. `image_bytes`, `strokes`, and
/// `timestamps` are each optional — whichever are present drive the
/// corresponding style DNA vector.
pub struct IngestArtifactRequest {
    pub session_id: String,
    pub artifact_id: String,
    pub telemetry: Vec<TelemetrySample>,
    pub strokes: Option<Vec<StrokePoint>>,
    pub image_bytes: Option<Vec<u8>>,
    pub timestamps: Option<Vec<f64>>,
    pub intent: Option<IntentInput>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub derived_from: Option<String>,
}

pub struct IntentInput {
    pub emotional_register: Option<String>,
    pub target_audience: Option<String>,
    pub constraints: Vec<String>,
    pub narrative_prompt: Option<String>,
    pub style_keywords: Vec<String>,
    pub source: Option<String>,
}

#[derive(Debug)]
pub struct IngestResult {
    pub block_id: String,
    pub style_dna_id: String,
    pub intent_profile_id: Option<String>,
}

/// Runs the fixed pipeline: telemetry append, then vector encoding, then
/// StyleDNA persist, then IntentProfile persist, then the CognitiveMemoryBlock
/// that ties them together. Steps are intentionally not wrapped in a single
/// transaction — a crash between steps leaves orphaned rows rather than a
/// half-written block, and a retry of the whole call is safe because every
/// save is an UPSERT.
pub struct IngestionEngine {
    repo: TriStateRepository,
    telemetry: Arc<TelemetryWriterPool>,
}

impl IngestionEngine {
    pub fn new(repo: TriStateRepository, telemetry: Arc<TelemetryWriterPool>) -> Self {
        Self { repo, telemetry }
    }

    pub fn ingest_artifact(&self, req: IngestArtifactRequest) -> Result<IngestResult, TraceOsError> {
        if !req.telemetry.is_empty() {
            self.telemetry.append(&req.session_id, &req.telemetry)?;
        }

        let stroke_dna = req.strokes.as_deref().map(compute_stroke_dna);
        let image_dna = req.image_bytes.as_deref().map(compute_image_dna);
        let temporal_dna = req.timestamps.as_deref().map(compute_temporal_dna);

        // Mirrors the placeholder engine this was distilled from: l2_norm
        // tracks stroke_dna specifically, not the other two vectors.
        let l2_norm = stroke_dna
            .as_deref()
            .map(traceos_store::compute_l2_norm)
            .unwrap_or(0.0);

        let checksum = traceos_store::compute_style_dna_checksum(
            stroke_dna.as_deref(),
            image_dna.as_deref(),
            temporal_dna.as_deref(),
        );

        let style_dna_id = uuid::Uuid::new_v4().to_string();
        let style_dna = StyleDna {
            id: style_dna_id.clone(),
            artifact_id: req.artifact_id.clone(),
            stroke_dna,
            image_dna,
            temporal_dna,
            created_at: Utc::now(),
            l2_norm,
            checksum,
        };
        self.repo.save_style_dna(&style_dna)?;

        let intent_profile_id = match req.intent {
            Some(intent) => {
                let id = uuid::Uuid::new_v4().to_string();
                let profile = IntentProfile {
                    id: id.clone(),
                    session_id: req.session_id.clone(),
                    artifact_id: req.artifact_id.clone(),
                    emotional_register: intent.emotional_register,
                    target_audience: intent.target_audience,
                    constraints: intent.constraints,
                    narrative_prompt: intent.narrative_prompt,
                    style_keywords: intent.style_keywords,
                    created_at: Utc::now(),
                    source: intent.source,
                };
                self.repo.save_intent_profile(&profile)?;
                Some(id)
            }
            None => None,
        };

        let block_id = uuid::Uuid::new_v4().to_string();
        let block = CognitiveMemoryBlock {
            id: block_id.clone(),
            session_id: req.session_id,
            artifact_id: req.artifact_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ld_context: None,
            derived_from: req.derived_from,
            intent_profile_id: intent_profile_id.clone(),
            style_dna_id: Some(style_dna_id.clone()),
            tags: req.tags,
            notes: req.notes,
            metadata: Default::default(),
        };
        self.repo.save_block(&block)?;

        Ok(IngestResult {
            block_id,
            style_dna_id,
            intent_profile_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traceos_store::{migrate, open_connection};

    fn engine() -> IngestionEngine {
        let dir = tempfile::tempdir().unwrap();
        let db = open_connection(&dir.path().join("db.sqlite")).unwrap();
        migrate(&db, false).unwrap();
        let repo = TriStateRepository::new(db);
        let telemetry = Arc::new(TelemetryWriterPool::new(dir.path().join("telemetry")));
        std::mem::forget(dir);
        IngestionEngine::new(repo, telemetry)
    }

    #[test]
    fn ingest_with_no_intent_leaves_intent_profile_id_none() {
        let engine = engine();
        let result = engine
            .ingest_artifact(IngestArtifactRequest {
                session_id: "s1".into(),
                artifact_id: "a1".into(),
                telemetry: vec![],
                strokes: Some(vec![
                    StrokePoint { x: 0.0, y: 0.0, pressure: 0.1 },
                    StrokePoint { x: 1.0, y: 1.0, pressure: 0.2 },
                ]),
                image_bytes: None,
                timestamps: None,
                intent: None,
                tags: vec![],
                notes: None,
                derived_from: None,
            })
            .unwrap();
        assert!(result.intent_profile_id.is_none());
    }

    #[test]
    fn ingest_with_intent_persists_profile_and_links_block() {
        let engine = engine();
        let result = engine
            .ingest_artifact(IngestArtifactRequest {
                session_id: "s1".into(),
                artifact_id: "a1".into(),
                telemetry: vec![],
                strokes: None,
                image_bytes: Some(vec![1, 2, 3, 4]),
                timestamps: None,
                intent: Some(IntentInput {
                    emotional_register: Some("calm".into()),
                    target_audience: None,
                    constraints: vec![],
                    narrative_prompt: None,
                    style_keywords: vec![],
                    source: None,
                }),
                tags: vec![],
                notes: None,
                derived_from: None,
            })
            .unwrap();
        assert!(result.intent_profile_id.is_some());
        let block = engine.repo.get_block_by_artifact("s1", "a1").unwrap().unwrap();
        assert_eq!(block.intent_profile_id, result.intent_profile_id);
    }

    #[test]
    fn duplicate_artifact_in_same_session_rejected() {
        let engine = engine();
        let req = || IngestArtifactRequest {
            session_id: "s1".into(),
            artifact_id: "a1".into(),
            telemetry: vec![],
            strokes: None,
            image_bytes: Some(vec![9, 9, 9]),
            timestamps: None,
            intent: None,
            tags: vec![],
            notes: None,
            derived_from: None,
        };
        engine.ingest_artifact(req()).unwrap();
        let err = engine.ingest_artifact(req()).unwrap_err();
        assert!(matches!(err, TraceOsError::UniquenessViolation { .. }));
    }
}
