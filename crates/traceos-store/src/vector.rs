use sha2::{Digest, Sha256};
use thiserror::Error;
use traceos_types::STYLE_VECTOR_DIM;

#[derive(Debug, Error)]
pub enum VectorCodecError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("vector contains a non-finite value at index {0}")]
    NonFinite(usize),
}

/// Pack a D=128 float32 vector into its little-endian IEEE-754 byte
/// representation (512 bytes).
pub fn vector_to_bytes(v: &[f32]) -> Result<Vec<u8>, VectorCodecError> {
    validate_vector_dim(v)?;
    let mut out = Vec::with_capacity(STYLE_VECTOR_DIM * 4);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    Ok(out)
}

/// Unpack a 512-byte blob back into a D=128 float32 vector.
pub fn bytes_to_vector(bytes: &[u8]) -> Result<Vec<f32>, VectorCodecError> {
    if bytes.len() != STYLE_VECTOR_DIM * 4 {
        return Err(VectorCodecError::DimensionMismatch {
            expected: STYLE_VECTOR_DIM * 4,
            actual: bytes.len(),
        });
    }
    let v: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    validate_vector_dim(&v)?;
    Ok(v)
}

pub fn validate_vector_dim(v: &[f32]) -> Result<(), VectorCodecError> {
    if v.len() != STYLE_VECTOR_DIM {
        return Err(VectorCodecError::DimensionMismatch {
            expected: STYLE_VECTOR_DIM,
            actual: v.len(),
        });
    }
    for (i, x) in v.iter().enumerate() {
        if !x.is_finite() {
            return Err(VectorCodecError::NonFinite(i));
        }
    }
    Ok(())
}

/// L2 norm = sqrt(Σxᵢ²). Zero for an empty vector.
pub fn compute_l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// SHA-256 checksum over stroke∥image∥temporal, in that fixed order,
/// skipping any vector that is absent. Returns `None` if all three are
/// absent (no checksum needed when there's nothing to protect).
pub fn compute_style_dna_checksum(
    stroke: Option<&[f32]>,
    image: Option<&[f32]>,
    temporal: Option<&[f32]>,
) -> Option<String> {
    if stroke.is_none() && image.is_none() && temporal.is_none() {
        return None;
    }
    let mut hasher = Sha256::new();
    for v in [stroke, image, temporal].into_iter().flatten() {
        for x in v {
            hasher.update(x.to_le_bytes());
        }
    }
    Some(hex::encode(hasher.finalize()))
}

/// Verify a style DNA checksum. `None` expected checksum means no
/// verification is required (nothing was checksummed).
pub fn verify_style_dna_checksum(
    stroke: Option<&[f32]>,
    image: Option<&[f32]>,
    temporal: Option<&[f32]>,
    expected: Option<&str>,
) -> bool {
    match expected {
        None => true,
        Some(expected) => {
            compute_style_dna_checksum(stroke, image, temporal).as_deref() == Some(expected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim_vec(fill: f32) -> Vec<f32> {
        vec![fill; STYLE_VECTOR_DIM]
    }

    #[test]
    fn pack_unpack_roundtrip() {
        let v = dim_vec(0.5);
        let bytes = vector_to_bytes(&v).unwrap();
        assert_eq!(bytes.len(), 512);
        let back = bytes_to_vector(&bytes).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn wrong_dimension_rejected() {
        let v = vec![0.0f32; 10];
        assert!(vector_to_bytes(&v).is_err());
    }

    #[test]
    fn non_finite_rejected() {
        let mut v = dim_vec(0.0);
        v[3] = f32::NAN;
        assert!(validate_vector_dim(&v).is_err());
    }

    #[test]
    fn l2_norm_of_empty_is_zero() {
        assert_eq!(compute_l2_norm(&[]), 0.0);
    }

    #[test]
    fn l2_norm_matches_pythagorean() {
        assert_eq!(compute_l2_norm(&[3.0, 4.0]), 5.0);
    }

    #[test]
    fn checksum_none_when_all_absent() {
        assert!(compute_style_dna_checksum(None, None, None).is_none());
    }

    #[test]
    fn checksum_deterministic_and_order_sensitive() {
        let a = dim_vec(1.0);
        let b = dim_vec(2.0);
        let c1 = compute_style_dna_checksum(Some(&a), Some(&b), None);
        let c2 = compute_style_dna_checksum(Some(&b), Some(&a), None);
        assert!(c1.is_some());
        assert_ne!(c1, c2);
    }

    #[test]
    fn verify_passes_when_no_checksum_recorded() {
        let a = dim_vec(1.0);
        assert!(verify_style_dna_checksum(Some(&a), None, None, None));
    }

    #[test]
    fn verify_detects_corruption() {
        let a = dim_vec(1.0);
        let checksum = compute_style_dna_checksum(Some(&a), None, None);
        let mut corrupted = a.clone();
        corrupted[0] = 9.0;
        assert!(!verify_style_dna_checksum(
            Some(&corrupted),
            None,
            None,
            checksum.as_deref()
        ));
    }
}
