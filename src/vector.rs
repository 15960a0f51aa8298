//! This is the vector math module
//! Provide L2 normalization and squared L2 distance

use crate::error::{Result, StoreError};

/// L2 Normalization
/// norm_vec = vec / ||vec||
/// Zero vector cannot be normalized
pub fn l2_norm(vector: &[f32]) -> Result<Vec<f32>> {
    if vector.is_empty() {
        return Err(StoreError::InvalidVector("cannot normalize an empty vector"));
    }

    let norm = vector.iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();

    if norm == 0.0 {
        return Err(StoreError::InvalidVector("cannot normalize a zero vector"));
    }

    let normed_vec = vector.iter()
        .map(|x| x / norm)
        .collect();

    Ok(normed_vec)
}

/// Squared L2 distance
/// dist = sum((a[i] - b[i])^2) for i = 0..a.len()
/// Can only process vectors with same dimensions
pub fn squared_l2(left: &[f32], right: &[f32]) -> Result<f32> {
    if left.len() != right.len() {
        return Err(StoreError::DimensionMismatch {
            expected: left.len(),
            actual: right.len(),
        });
    }

    let dist = left.iter()
        .zip(right.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    Ok(dist)
}

#[cfg(test)]
mod vector_test {
    use super::*;

    // ========== L2 Normalization Tests ==========

    #[test]
    fn test_l2_norm_basic() {
        // ||[3,4]|| = 5
        let result = l2_norm(&[3.0, 4.0]).unwrap();

        assert_eq!(result.len(), 2);
        assert!((result[0] - 0.6).abs() < 1e-6);
        assert!((result[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_is_unit_length() {
        let result = l2_norm(&[1.0, -2.0, 3.0, 4.0]).unwrap();

        let norm: f32 = result.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_zero_vector_error() {
        let result = l2_norm(&[0.0, 0.0, 0.0]);
        assert!(matches!(result, Err(StoreError::InvalidVector(_))));
    }

    #[test]
    fn test_l2_norm_empty_vector() {
        let result = l2_norm(&[]);
        assert!(matches!(result, Err(StoreError::InvalidVector(_))));
    }

    // ========== Squared L2 Tests ==========

    #[test]
    fn test_squared_l2_basic() {
        // (1-4)^2 + (2-6)^2 = 9 + 16 = 25
        let result = squared_l2(&[1.0, 2.0], &[4.0, 6.0]).unwrap();
        assert!((result - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_squared_l2_identical_is_zero() {
        let v = [0.3, -0.7, 1.5];
        assert_eq!(squared_l2(&v, &v).unwrap(), 0.0);
    }

    #[test]
    fn test_squared_l2_is_symmetric() {
        let a = [1.0, 0.0, 2.0];
        let b = [0.5, 1.0, -1.0];
        assert_eq!(squared_l2(&a, &b).unwrap(), squared_l2(&b, &a).unwrap());
    }

    #[test]
    fn test_squared_l2_dimension_mismatch() {
        let result = squared_l2(&[1.0, 2.0, 3.0], &[4.0, 5.0]);
        match result {
            Err(StoreError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected dimension mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unit_vectors_distance_range() {
        // For unit vectors, squared L2 = 2 - 2cos, so orthogonal -> 2, opposite -> 4
        let x = l2_norm(&[1.0, 0.0]).unwrap();
        let y = l2_norm(&[0.0, 5.0]).unwrap();
        let neg_x = l2_norm(&[-2.0, 0.0]).unwrap();

        assert!((squared_l2(&x, &y).unwrap() - 2.0).abs() < 1e-6);
        assert!((squared_l2(&x, &neg_x).unwrap() - 4.0).abs() < 1e-6);
    }
}
