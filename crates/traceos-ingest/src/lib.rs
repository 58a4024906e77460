mod encoders;
mod engine;

pub use encoders::{compute_image_dna, compute_stroke_dna, compute_temporal_dna};
pub use engine::{IngestArtifactRequest, IngestionEngine, StrokeSample};
