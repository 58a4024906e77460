use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STYLE_VECTOR_DIM: usize = 128;

/// The "Logic" layer: a cognitive artifact record uniquely keyed by
/// `(session_id, artifact_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveMemoryBlock {
    pub id: String,
    pub session_id: String,
    pub artifact_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ld_context: Option<serde_json::Value>,
    pub derived_from: Option<String>,
    pub intent_profile_id: Option<String>,
    pub style_dna_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// The "Vibe" layer: three independently-optional fixed-dimension float
/// vectors describing stroke, image, and temporal style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleDna {
    pub id: String,
    pub artifact_id: String,
    pub stroke_dna: Option<Vec<f32>>,
    pub image_dna: Option<Vec<f32>>,
    pub temporal_dna: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub l2_norm: f64,
    /// SHA-256 hex digest over stroke∥image∥temporal (absent vectors
    /// skipped, fixed order). `None` when every vector is absent.
    pub checksum: Option<String>,
}

/// The "Mind" layer: the creative intent behind an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentProfile {
    pub id: String,
    pub session_id: String,
    pub artifact_id: String,
    pub emotional_register: Option<String>,
    pub target_audience: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub narrative_prompt: Option<String>,
    #[serde(default)]
    pub style_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub source: Option<String>,
}

/// Metadata for one append to a session's columnar telemetry writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryChunk {
    pub id: String,
    pub session_id: String,
    pub artifact_id: String,
    pub parquet_path: String,
    pub chunk_row_count: usize,
    pub total_session_rows: usize,
    pub created_at: DateTime<Utc>,
    pub schema_version: u32,
}

/// One telemetry sample recorded during a stroke.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
    pub timestamp: f64,
    pub tilt: f32,
    pub tilt_x: f32,
    pub tilt_y: f32,
}
