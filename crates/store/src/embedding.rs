/// Text embedding capability
///
/// Implementations are pure: the same text always maps to the same vector.
/// The output length is free; the store pads or truncates it.
pub trait Embedder {
    /// Map text to a vector
    fn embed(&self, text: &str) -> Vec<f32>;
}

impl<F> Embedder for F
where
    F: Fn(&str) -> Vec<f32>,
{
    fn embed(&self, text: &str) -> Vec<f32> {
        self(text)
    }
}

/// One component per byte, holding the byte's numeric value
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteEmbedder;

impl Embedder for ByteEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        text.bytes().map(f32::from).collect()
    }
}

/// Pad with trailing zeros or truncate to exactly `dimension` components
pub fn fit_to_dimension(mut vector: Vec<f32>, dimension: usize) -> Vec<f32> {
    vector.resize(dimension, 0.0);
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_to_dimension() {
        assert_eq!(fit_to_dimension(vec![2.0], 2), vec![2.0, 0.0]);
        assert_eq!(fit_to_dimension(vec![1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert_eq!(fit_to_dimension(vec![1.0, 2.0], 2), vec![1.0, 2.0]);
        assert_eq!(fit_to_dimension(Vec::new(), 3), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_byte_embedder() {
        assert_eq!(ByteEmbedder.embed("AB"), vec![65.0, 66.0]);
        assert!(ByteEmbedder.embed("").is_empty());
    }

    #[test]
    fn test_closure_embedder() {
        let embedder = |text: &str| vec![text.len() as f32];
        assert_eq!(embedder.embed("four"), vec![4.0]);
    }
}
