use traceos_types::STYLE_VECTOR_DIM;

/// Zero-pad a feature vector shorter than D=128, or truncate one that runs
/// long, to exactly D=128. Every encoder below ends with this call so their
/// output always satisfies the vector codec's dimension invariant.
fn fit_to_dim(mut features: Vec<f32>) -> Vec<f32> {
    if features.len() < STYLE_VECTOR_DIM {
        features.resize(STYLE_VECTOR_DIM, 0.0);
    } else {
        features.truncate(STYLE_VECTOR_DIM);
    }
    features
}

/// One (x, y, pressure) sample of a pen stroke.
#[derive(Debug, Clone, Copy)]
pub struct StrokePoint {
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
}

/// Derive a style vector from stroke geometry: per-segment direction deltas
/// and pressure, flattened, then fit to D=128. Deterministic — same input
/// always yields the same vector.
pub fn compute_stroke_dna(points: &[StrokePoint]) -> Vec<f32> {
    if points.len() < 2 {
        return fit_to_dim(Vec::new());
    }
    let mut features = Vec::with_capacity(points.len() * 3);
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        features.push(b.x - a.x);
        features.push(b.y - a.y);
        features.push(b.pressure);
    }
    fit_to_dim(features)
}

/// Derive a style vector from raw image bytes via a byte-histogram summary,
/// fit to D=128.
pub fn compute_image_dna(image_bytes: &[u8]) -> Vec<f32> {
    if image_bytes.is_empty() {
        return fit_to_dim(Vec::new());
    }
    let mut histogram = [0u32; STYLE_VECTOR_DIM];
    for &byte in image_bytes {
        histogram[(byte as usize) % STYLE_VECTOR_DIM] += 1;
    }
    let total = image_bytes.len() as f32;
    let features: Vec<f32> = histogram.iter().map(|&c| c as f32 / total).collect();
    fit_to_dim(features)
}

/// Derive a style vector from inter-event timing: the deltas between
/// consecutive timestamps, fit to D=128.
pub fn compute_temporal_dna(timestamps: &[f64]) -> Vec<f32> {
    if timestamps.len() < 2 {
        return fit_to_dim(Vec::new());
    }
    let features: Vec<f32> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]) as f32)
        .collect();
    fit_to_dim(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroke_dna_is_always_full_dimension() {
        let points = vec![
            StrokePoint { x: 0.0, y: 0.0, pressure: 0.1 },
            StrokePoint { x: 1.0, y: 1.0, pressure: 0.2 },
        ];
        assert_eq!(compute_stroke_dna(&points).len(), STYLE_VECTOR_DIM);
    }

    #[test]
    fn stroke_dna_empty_input_is_zero_vector() {
        let v = compute_stroke_dna(&[]);
        assert_eq!(v.len(), STYLE_VECTOR_DIM);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn stroke_dna_deterministic() {
        let points = vec![
            StrokePoint { x: 0.0, y: 0.0, pressure: 0.1 },
            StrokePoint { x: 1.0, y: 1.0, pressure: 0.2 },
            StrokePoint { x: 2.0, y: 0.5, pressure: 0.3 },
        ];
        assert_eq!(compute_stroke_dna(&points), compute_stroke_dna(&points));
    }

    #[test]
    fn stroke_dna_truncates_long_input() {
        let points: Vec<StrokePoint> = (0..200)
            .map(|i| StrokePoint { x: i as f32, y: 0.0, pressure: 0.5 })
            .collect();
        assert_eq!(compute_stroke_dna(&points).len(), STYLE_VECTOR_DIM);
    }

    #[test]
    fn image_dna_all_finite_and_full_dimension() {
        let bytes: Vec<u8> = (0..=255u8).collect();
        let v = compute_image_dna(&bytes);
        assert_eq!(v.len(), STYLE_VECTOR_DIM);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn temporal_dna_uses_inter_event_deltas() {
        let ts = vec![0.0, 1.0, 3.0, 6.0];
        let v = compute_temporal_dna(&ts);
        assert_eq!(v.len(), STYLE_VECTOR_DIM);
        assert_eq!(&v[0..3], &[1.0, 2.0, 3.0]);
    }
}
