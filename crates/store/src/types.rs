use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use twintree_common::TwinTreeError;

use crate::similarity::{cosine_similarity, l1_distance, l2_distance};

/// Index key: the scalar key, then the record id so equal scalars stay
/// distinct entries
pub(crate) type IndexKey = (OrderedFloat<f64>, i64);

/// Stored vector record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record ID (-1 for synthetic records)
    pub id: i64,

    /// Original text
    pub raw_text: String,

    /// Preprocessed vector, exactly `dimension` long
    pub vector: Vec<f32>,

    /// Euclidean distance to the current reference vector
    pub distance_from_reference: f64,

    /// Euclidean length of `vector`
    pub norm: f64,
}

impl VectorRecord {
    pub(crate) fn distance_key(&self) -> IndexKey {
        (OrderedFloat(self.distance_from_reference), self.id)
    }

    pub(crate) fn norm_key(&self) -> IndexKey {
        (OrderedFloat(self.norm), self.id)
    }
}

/// Distance / similarity metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// L2 distance (minimize)
    Euclidean,

    /// L1 distance (minimize)
    Manhattan,

    /// Cosine similarity (maximize)
    Cosine,
}

impl Metric {
    /// Score `a` against `b`
    pub fn score(self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            Self::Euclidean => l2_distance(a, b),
            Self::Manhattan => l1_distance(a, b),
            Self::Cosine => cosine_similarity(a, b),
        }
    }

    /// Whether larger scores mean closer
    pub fn higher_is_better(self) -> bool {
        matches!(self, Self::Cosine)
    }

    /// Strict comparison; ties keep the incumbent
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        if self.higher_is_better() {
            candidate > incumbent
        } else {
            candidate < incumbent
        }
    }

    /// Whether `score` falls inside a query radius
    pub fn within(self, score: f64, radius: f64) -> bool {
        if self.higher_is_better() {
            score >= radius
        } else {
            score <= radius
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Cosine => "cosine",
        }
    }
}

impl FromStr for Metric {
    type Err = TwinTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "manhattan" | "l1" => Ok(Self::Manhattan),
            "cosine" => Ok(Self::Cosine),
            _ => Err(TwinTreeError::invalid_metric(s)),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parse() {
        assert_eq!("euclidean".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert_eq!("L1".parse::<Metric>().unwrap(), Metric::Manhattan);
        assert_eq!(" Cosine ".parse::<Metric>().unwrap(), Metric::Cosine);

        let err = "hamming".parse::<Metric>().unwrap_err();
        assert_eq!(err.kind(), "invalid_metric");
    }

    #[test]
    fn test_metric_direction() {
        assert!(Metric::Euclidean.is_better(1.0, 2.0));
        assert!(!Metric::Euclidean.is_better(2.0, 2.0));
        assert!(Metric::Cosine.is_better(0.9, 0.5));
        assert!(Metric::Cosine.within(0.9, 0.8));
        assert!(Metric::Manhattan.within(3.0, 3.0));
        assert!(!Metric::Manhattan.within(3.5, 3.0));
    }

    #[test]
    fn test_record_keys_break_ties_by_id() {
        let a = VectorRecord {
            id: 1,
            raw_text: "a".to_string(),
            vector: vec![1.0],
            distance_from_reference: 2.0,
            norm: 1.0,
        };
        let mut b = a.clone();
        b.id = 2;
        assert!(a.distance_key() < b.distance_key());
        assert_eq!(a.norm_key().0, b.norm_key().0);
    }
}
