//! Similarity and distance helpers for fixed-length embedding vectors.
#![forbid(unsafe_code)]

use thiserror::Error;

pub type Float = f32;

/// Two vectors of different lengths were compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Vector length mismatch: expected {expected}, got {actual}")]
pub struct ShapeError {
    pub expected: usize,
    pub actual: usize,
}

#[inline]
pub fn dot(vec1: &[Float], vec2: &[Float]) -> Float {
    vec1.iter().zip(vec2.iter()).map(|(a, b)| a * b).sum()
}

#[inline]
pub fn magnitude(vector: &[Float]) -> Float {
    dot(vector, vector).sqrt()
}

/// Cosine similarity in [-1, 1].
///
/// A zero-magnitude vector on either side scores 0.0 ("no signal") rather
/// than producing NaN.
pub fn cosine_similarity(query: &[Float], candidate: &[Float]) -> Result<Float, ShapeError> {
    if query.len() != candidate.len() {
        return Err(ShapeError {
            expected: query.len(),
            actual: candidate.len(),
        });
    }

    let norm_product = magnitude(query) * magnitude(candidate);
    if norm_product == 0.0 {
        return Ok(0.0);
    }
    Ok(dot(query, candidate) / norm_product)
}

/// Cosine distance in [0, 2].
#[inline]
pub fn distance(similarity: Float) -> Float {
    1.0 - similarity
}

/// Maps raw cosine similarity from [-1, 1] onto the [0, 1] relevance scale
/// that thresholds are compared against.
#[inline]
pub fn normalized_relevance(similarity: Float) -> Float {
    (similarity + 1.0) / 2.0
}

/// Same scale as [`normalized_relevance`], starting from a cosine distance
/// reported by an external index.
#[inline]
pub fn relevance_from_distance(distance: Float) -> Float {
    1.0 - distance / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const EPS: Float = 1e-5;

    fn random_vector(dim: usize) -> Vec<Float> {
        let mut rng = rand::thread_rng();
        (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_self_similarity_is_one() {
        for _ in 0..20 {
            let v = random_vector(64);
            let sim = cosine_similarity(&v, &v).unwrap();
            assert!((sim - 1.0).abs() < EPS, "got {}", sim);
        }
    }

    #[test]
    fn test_opposite_similarity_is_minus_one() {
        for _ in 0..20 {
            let v = random_vector(64);
            let neg: Vec<Float> = v.iter().map(|x| -x).collect();
            let sim = cosine_similarity(&v, &neg).unwrap();
            assert!((sim + 1.0).abs() < EPS, "got {}", sim);
        }
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let zero = vec![0.0; 8];
        let v = random_vector(8);
        assert_eq!(cosine_similarity(&zero, &v).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&v, &zero).unwrap(), 0.0);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let err = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert_eq!(err, ShapeError { expected: 3, actual: 2 });
        assert!(err.to_string().contains("expected 3, got 2"));
    }

    #[test]
    fn test_relevance_endpoints_and_monotonicity() {
        assert_eq!(normalized_relevance(1.0), 1.0);
        assert_eq!(normalized_relevance(-1.0), 0.0);
        assert_eq!(normalized_relevance(0.0), 0.5);

        let mut previous = normalized_relevance(-1.0);
        for step in 1..=200 {
            let sim = -1.0 + step as Float * 0.01;
            let rel = normalized_relevance(sim);
            assert!(rel >= previous);
            previous = rel;
        }
    }

    #[test]
    fn test_distance_and_similarity_scales_agree() {
        for step in 0..=40 {
            let sim = -1.0 + step as Float * 0.05;
            let via_similarity = normalized_relevance(sim);
            let via_distance = relevance_from_distance(distance(sim));
            assert!((via_similarity - via_distance).abs() < EPS);
        }
        assert_eq!(distance(1.0), 0.0);
        assert_eq!(distance(-1.0), 2.0);
    }
}
