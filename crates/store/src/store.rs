use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use tracing::{debug, info};
use twintree_common::{Result, StoreConfig, TwinTreeError};
use twintree_index::{AvlTree, RedBlackTree};

use crate::embedding::{fit_to_dimension, Embedder};
use crate::similarity::{l2_distance, l2_norm};
use crate::types::{IndexKey, Metric, VectorRecord};

/// Default per-k slope of the top-k radius estimate
pub const DEFAULT_RADIUS_SLOPE: f64 = 0.05;

/// Default bias of the top-k radius estimate
pub const DEFAULT_RADIUS_BIAS: f64 = 1e-9;

/// Vector store with two ordered indices over the same records
///
/// - distance index: AVL tree keyed by distance to the reference vector
/// - norm index: red-black tree keyed by vector norm
///
/// Each index owns its own copy of every record.
pub struct VectorStore {
    distance_index: AvlTree<IndexKey, VectorRecord>,
    norm_index: RedBlackTree<IndexKey, VectorRecord>,
    reference: Vec<f32>,
    root_vector: Option<VectorRecord>,
    dimension: usize,
    count: usize,
    average_distance: f64,
    last_id: Option<i64>,
    embedder: Box<dyn Embedder>,
    default_metric: Metric,
    radius_slope: f64,
    radius_bias: f64,
}

impl VectorStore {
    /// Create an empty store
    pub fn new(
        dimension: usize,
        embedder: impl Embedder + 'static,
        reference: Vec<f32>,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(TwinTreeError::invalid_input("Dimension must be positive"));
        }
        if reference.len() != dimension {
            return Err(TwinTreeError::dimension_mismatch(dimension, reference.len()));
        }

        info!("Vector store initialized - dimension {}", dimension);

        Ok(Self {
            distance_index: AvlTree::new(),
            norm_index: RedBlackTree::new(),
            reference,
            root_vector: None,
            dimension,
            count: 0,
            average_distance: 0.0,
            last_id: None,
            embedder: Box::new(embedder),
            default_metric: Metric::Cosine,
            radius_slope: DEFAULT_RADIUS_SLOPE,
            radius_bias: DEFAULT_RADIUS_BIAS,
        })
    }

    /// Create an empty store from configuration
    pub fn from_config(config: &StoreConfig, embedder: impl Embedder + 'static) -> Result<Self> {
        config.validate()?;
        let mut store = Self::new(config.dimension, embedder, config.reference_or_origin())?;
        store.default_metric = config.default_metric.parse()?;
        store.radius_slope = config.radius_slope;
        store.radius_bias = config.radius_bias;
        Ok(store)
    }

    pub fn size(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Metric configured for callers that do not name one
    pub fn default_metric(&self) -> Metric {
        self.default_metric
    }

    /// Drop every record and reset the running statistics
    pub fn clear(&mut self) {
        self.distance_index.clear();
        self.norm_index.clear();
        self.root_vector = None;
        self.count = 0;
        self.average_distance = 0.0;
        self.last_id = None;
        info!("Vector store cleared");
    }

    /// Embed `raw_text` and fit it to the store dimension
    pub fn preprocess(&self, raw_text: &str) -> Vec<f32> {
        fit_to_dimension(self.embedder.embed(raw_text), self.dimension)
    }

    /// Replace the embedding function
    pub fn set_embedder(&mut self, embedder: impl Embedder + 'static) {
        self.embedder = Box::new(embedder);
    }

    /// Embed and index a text, returning the new record's id
    pub fn add_text(&mut self, raw_text: &str) -> i64 {
        let vector = self.preprocess(raw_text);
        let distance = l2_distance(&vector, &self.reference);
        let norm = l2_norm(&vector);
        let id = self.next_id();
        self.last_id = Some(id);

        let previous = self.count as f64;
        self.count += 1;
        self.average_distance = (self.average_distance * previous + distance) / self.count as f64;

        let record = VectorRecord {
            id,
            raw_text: raw_text.to_string(),
            vector,
            distance_from_reference: distance,
            norm,
        };
        self.distance_index.insert(record.distance_key(), record.clone());
        self.norm_index.insert(record.norm_key(), record.clone());

        let replaces_root = match &self.root_vector {
            None => true,
            Some(root) => {
                (distance - self.average_distance).abs()
                    < (root.distance_from_reference - self.average_distance).abs()
            }
        };
        if replaces_root {
            self.root_vector = Some(record);
        }

        debug!(
            "Added record {} (distance={:.4}, norm={:.4}, count={})",
            id, distance, norm, self.count
        );
        id
    }

    /// Next id: one past the largest id in use or ever handed out
    fn next_id(&self) -> i64 {
        let in_use = self.distance_index.iter().map(|(_, r)| r.id).max();
        in_use.max(self.last_id).map_or(0, |max| max + 1)
    }

    fn record_at(&self, index: usize) -> Result<&VectorRecord> {
        self.distance_index
            .iter()
            .nth(index)
            .map(|(_, record)| record)
            .ok_or_else(|| TwinTreeError::invalid_index(index, self.count))
    }

    /// Record at `index` in ascending distance order
    pub fn get_vector(&self, index: usize) -> Result<&VectorRecord> {
        self.record_at(index)
    }

    pub fn get_raw_text(&self, index: usize) -> Result<&str> {
        Ok(self.record_at(index)?.raw_text.as_str())
    }

    pub fn get_id(&self, index: usize) -> Result<i64> {
        Ok(self.record_at(index)?.id)
    }

    /// Remove the record at `index` (ascending distance order) from both
    /// indices and return it
    pub fn remove_at(&mut self, index: usize) -> Result<VectorRecord> {
        let record = self.record_at(index)?.clone();

        self.distance_index.remove(&record.distance_key());
        self.norm_index.remove(&record.norm_key());

        let previous = self.count as f64;
        self.count -= 1;
        self.average_distance = if self.count == 0 {
            0.0
        } else {
            (self.average_distance * previous - record.distance_from_reference) / self.count as f64
        };

        if self.root_vector.as_ref().map(|r| r.id) == Some(record.id) {
            self.root_vector = Self::closest_to(
                self.distance_index.iter().map(|(_, r)| r),
                self.average_distance,
            )
            .cloned();
        }

        debug!("Removed record {} at index {} (count={})", record.id, index, self.count);
        Ok(record)
    }

    /// First record whose distance is strictly closest to `target`
    fn closest_to<'a>(
        records: impl Iterator<Item = &'a VectorRecord>,
        target: f64,
    ) -> Option<&'a VectorRecord> {
        let mut best: Option<(&VectorRecord, f64)> = None;
        for record in records {
            let diff = (record.distance_from_reference - target).abs();
            if best.map_or(true, |(_, best_diff)| diff < best_diff) {
                best = Some((record, diff));
            }
        }
        best.map(|(record, _)| record)
    }

    /// Replace the reference vector and re-key every record
    pub fn set_reference_vector(&mut self, reference: Vec<f32>) -> Result<()> {
        self.check_dimension(&reference)?;
        self.reference = reference;

        if self.count == 0 {
            return Ok(());
        }

        let mut snapshot: Vec<VectorRecord> =
            self.distance_index.iter().map(|(_, r)| r.clone()).collect();
        self.distance_index.clear();
        self.norm_index.clear();

        let mut total = 0.0;
        for record in &mut snapshot {
            record.distance_from_reference = l2_distance(&record.vector, &self.reference);
            total += record.distance_from_reference;
        }
        self.average_distance = total / snapshot.len() as f64;
        self.root_vector = Self::closest_to(snapshot.iter(), self.average_distance).cloned();

        for record in snapshot {
            self.norm_index.insert(record.norm_key(), record.clone());
            self.distance_index.insert(record.distance_key(), record);
        }

        info!(
            "Reference vector replaced - {} records re-keyed, average distance {:.4}",
            self.count, self.average_distance
        );
        Ok(())
    }

    pub fn reference_vector(&self) -> &[f32] {
        &self.reference
    }

    /// Detached copy of the record whose distance is closest to the mean
    pub fn root_vector(&self) -> Option<&VectorRecord> {
        self.root_vector.as_ref()
    }

    pub fn average_distance(&self) -> f64 {
        self.average_distance
    }

    /// Visit every record in ascending distance order
    pub fn for_each<F: FnMut(&[f32], i64, &str)>(&self, mut visit: F) {
        self.distance_index
            .inorder_traversal(|record| visit(&record.vector, record.id, &record.raw_text));
    }

    pub fn all_ids_sorted_by_distance(&self) -> Vec<i64> {
        self.distance_index.iter().map(|(_, r)| r.id).collect()
    }

    pub fn all_vectors_sorted_by_distance(&self) -> Vec<&VectorRecord> {
        self.distance_index.iter().map(|(_, r)| r).collect()
    }

    /// Ids present in the norm index, ascending by norm
    pub fn all_ids_sorted_by_norm(&self) -> Vec<i64> {
        self.norm_index.iter().map(|(_, r)| r.id).collect()
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(TwinTreeError::dimension_mismatch(self.dimension, vector.len()))
        }
    }

    /// Estimated norm radius holding the `k` nearest records:
    /// `|d(query, reference) - mean| + slope * mean * k + bias`
    pub fn estimate_radius(&self, query: &[f32], k: usize) -> Result<f64> {
        self.check_dimension(query)?;
        let offset = (l2_distance(query, &self.reference) - self.average_distance).abs();
        Ok(offset + self.radius_slope * self.average_distance * k as f64 + self.radius_bias)
    }

    /// Id of the best-scoring record, `None` on an empty store
    pub fn find_nearest(&self, query: &[f32], metric: &str) -> Result<Option<i64>> {
        self.check_dimension(query)?;
        let metric: Metric = metric.parse()?;

        let mut best: Option<(i64, f64)> = None;
        for (_, record) in self.distance_index.iter() {
            let score = metric.score(query, &record.vector);
            if best.map_or(true, |(_, best_score)| metric.is_better(score, best_score)) {
                best = Some((record.id, score));
            }
        }
        Ok(best.map(|(id, _)| id))
    }

    /// Ids of the `k` best records
    ///
    /// Distance metrics come back nearest first; cosine comes back in
    /// ascending similarity, so the best match is last.
    ///
    /// Only records whose norm lies within an estimated radius of the
    /// query's norm are scored. The radius doubles until at least `k`
    /// records qualify, but the true neighbors may still fall outside it.
    pub fn top_k_nearest(&self, query: &[f32], k: usize, metric: &str) -> Result<Vec<i64>> {
        self.check_dimension(query)?;
        let metric: Metric = metric.parse()?;
        if k == 0 || k > self.count {
            return Err(TwinTreeError::invalid_k(k, self.count));
        }

        let query_norm = l2_norm(query);
        let mut radius = self.estimate_radius(query, k)?;
        let candidates = loop {
            let found = if radius.is_finite() {
                self.norm_candidates(query_norm, radius)
            } else {
                self.norm_index.iter().map(|(_, r)| r).collect()
            };
            if found.len() >= k || !radius.is_finite() {
                break found;
            }
            debug!("Radius {:.4} yields {} candidates, widening", radius, found.len());
            radius = if radius > 0.0 { radius * 2.0 } else { 1.0 };
        };

        debug!(
            "Top-{} {} query - {} candidates of {} (radius={:.4})",
            k,
            metric,
            candidates.len(),
            self.count,
            radius
        );

        let ids = if metric.higher_is_better() {
            let mut heap = BinaryHeap::with_capacity(k + 1);
            for record in candidates {
                heap.push(Reverse((OrderedFloat(metric.score(query, &record.vector)), record.id)));
                if heap.len() > k {
                    heap.pop();
                }
            }
            // Min-heap pop order: weakest similarity first
            heap.into_sorted_vec()
                .into_iter()
                .rev()
                .map(|Reverse((_, id))| id)
                .collect()
        } else {
            let mut heap = BinaryHeap::with_capacity(k + 1);
            for record in candidates {
                heap.push((OrderedFloat(metric.score(query, &record.vector)), record.id));
                if heap.len() > k {
                    heap.pop();
                }
            }
            heap.into_sorted_vec().into_iter().map(|(_, id)| id).collect()
        };
        Ok(ids)
    }

    /// Records whose norm lies in `[norm - radius, norm + radius]`
    fn norm_candidates(&self, norm: f64, radius: f64) -> Vec<&VectorRecord> {
        let low = (OrderedFloat(norm - radius), i64::MIN);
        let high = (OrderedFloat(norm + radius), i64::MAX);
        self.norm_index
            .range(&low, &high)
            .into_iter()
            .map(|(_, record)| record)
            .collect()
    }

    /// Ids whose indexed distance lies in `[min_distance, max_distance]`,
    /// in ascending distance order
    pub fn range_query_from_root(&self, min_distance: f64, max_distance: f64) -> Vec<i64> {
        self.distance_index
            .iter()
            .filter(|(_, r)| {
                r.distance_from_reference >= min_distance
                    && r.distance_from_reference <= max_distance
            })
            .map(|(_, r)| r.id)
            .collect()
    }

    /// Ids scoring within `radius` of `query` under `metric`
    pub fn range_query(&self, query: &[f32], radius: f64, metric: &str) -> Result<Vec<i64>> {
        self.check_dimension(query)?;
        let metric: Metric = metric.parse()?;
        Ok(self
            .distance_index
            .iter()
            .filter(|(_, r)| metric.within(metric.score(query, &r.vector), radius))
            .map(|(_, r)| r.id)
            .collect())
    }

    /// Ids whose every component lies inside `[min[i], max[i]]`
    pub fn bounding_box_query(&self, min: &[f32], max: &[f32]) -> Result<Vec<i64>> {
        self.check_dimension(min)?;
        self.check_dimension(max)?;
        Ok(self
            .distance_index
            .iter()
            .filter(|(_, r)| {
                r.vector
                    .iter()
                    .zip(min.iter().zip(max))
                    .all(|(v, (lo, hi))| v >= lo && v <= hi)
            })
            .map(|(_, r)| r.id)
            .collect())
    }

    fn indexed_distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.distance_index
            .iter()
            .map(|(_, r)| r.distance_from_reference)
    }

    /// Largest indexed distance (0.0 when empty)
    pub fn max_distance(&self) -> f64 {
        self.indexed_distances().fold(0.0, f64::max)
    }

    /// Smallest indexed distance (0.0 when empty)
    pub fn min_distance(&self) -> f64 {
        self.indexed_distances().reduce(f64::min).unwrap_or(0.0)
    }

    /// Component-wise mean of `records` as a synthetic record (id -1)
    pub fn compute_centroid(&self, records: &[&VectorRecord]) -> VectorRecord {
        let mut sum = vec![0.0f64; self.dimension];
        for record in records {
            for (acc, v) in sum.iter_mut().zip(&record.vector) {
                *acc += f64::from(*v);
            }
        }
        let n = records.len().max(1) as f64;
        let vector: Vec<f32> = sum.into_iter().map(|s| (s / n) as f32).collect();

        VectorRecord {
            id: -1,
            raw_text: String::new(),
            distance_from_reference: l2_distance(&vector, &self.reference),
            norm: l2_norm(&vector),
            vector,
        }
    }
}

impl fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorStore")
            .field("dimension", &self.dimension)
            .field("count", &self.count)
            .field("average_distance", &self.average_distance)
            .field("root_id", &self.root_vector.as_ref().map(|r| r.id))
            .finish()
    }
}
