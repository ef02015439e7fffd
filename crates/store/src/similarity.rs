//! Vector math in f64 over ndarray views
//!
//! Inputs of different length are compared over their common prefix.

use ndarray::{Array1, ArrayView1};

fn widen(v: &[f32]) -> Array1<f64> {
    ArrayView1::from(v).mapv(f64::from)
}

fn common<'a>(a: &'a [f32], b: &'a [f32]) -> (&'a [f32], &'a [f32]) {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");
    let n = a.len().min(b.len());
    (&a[..n], &b[..n])
}

/// Euclidean (L2) distance
pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    let (a, b) = common(a, b);
    let diff = widen(a) - widen(b);
    diff.dot(&diff).sqrt()
}

/// Manhattan (L1) distance
pub fn l1_distance(a: &[f32], b: &[f32]) -> f64 {
    let (a, b) = common(a, b);
    (widen(a) - widen(b)).mapv(f64::abs).sum()
}

/// Euclidean length
pub fn l2_norm(v: &[f32]) -> f64 {
    let v = widen(v);
    v.dot(&v).sqrt()
}

/// Cosine similarity; 0.0 when either vector is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (a, b) = common(a, b);
    let (a, b) = (widen(a), widen(b));
    let denom = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        a.dot(&b) / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        assert_eq!(l2_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(l1_distance(&[0.0, 0.0], &[3.0, -4.0]), 7.0);
        assert_eq!(l2_norm(&[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
