use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five emotional states the valuation engine can sense. Named as
/// feelings, not technical states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoodState {
    Calm,
    Flow,
    Frustration,
    Chaos,
    Exploration,
}

impl MoodState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodState::Calm => "Calm",
            MoodState::Flow => "Flow",
            MoodState::Frustration => "Frustration",
            MoodState::Chaos => "Chaos",
            MoodState::Exploration => "Exploration",
        }
    }
}

impl std::fmt::Display for MoodState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single taste of user interaction. The valuation engine accumulates
/// these into `frustration_index` and `flow_probability`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResonanceEvent {
    /// One of: stroke_accept, stroke_reject, undo, redo, ghost_accept,
    /// ghost_reject, pause_detected.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Client or server timestamp in seconds.
    pub timestamp: f64,
    pub session_id: String,
    /// Time between action and user response, in milliseconds.
    #[serde(default)]
    pub latency_ms: Option<f64>,
    /// Flag for erratic input detection — a Chaos trigger.
    #[serde(default)]
    pub erratic_input: Option<bool>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// The valuation engine's current emotional state. Only the valuation
/// engine may construct a state with a non-default `last_updated`; every
/// other consumer receives a cloned, read-only snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GutState {
    pub mood: MoodState,
    /// 0.0–1.0. Above 0.7 reduces creativity.
    pub frustration_index: f64,
    /// 0.0–1.0. Above 0.8 increases exploration.
    pub flow_probability: f64,
    pub last_updated: DateTime<Utc>,
}

impl Default for GutState {
    fn default() -> Self {
        Self {
            mood: MoodState::Calm,
            frustration_index: 0.0,
            flow_probability: 0.0,
            last_updated: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Accumulated taste preferences that affect future sensing. Supplemental
/// to the core valuation loop; not required for `ingest_batch` to run, but
/// carried through for session calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasteProfile {
    pub baseline_undo_latency_ms: f64,
    pub baseline_accept_latency_ms: f64,
    #[serde(default)]
    pub flow_associated_techniques: Vec<String>,
    #[serde(default)]
    pub frustration_triggers: Vec<String>,
    pub calibrated_at: DateTime<Utc>,
}

impl Default for TasteProfile {
    fn default() -> Self {
        Self {
            baseline_undo_latency_ms: 300.0,
            baseline_accept_latency_ms: 150.0,
            flow_associated_techniques: Vec::new(),
            frustration_triggers: Vec::new(),
            calibrated_at: Utc::now(),
        }
    }
}

pub type ModifierMap = HashMap<String, f64>;
