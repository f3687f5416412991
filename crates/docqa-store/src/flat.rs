//! Exact flat vector index.
//!
//! Vectors are stored contiguously in insertion order. Search is brute force
//! over squared Euclidean distance, which keeps results exact and makes the
//! serialized form trivially portable.

use docqa_core::StoreError;
use serde::{Deserialize, Serialize};

/// Append-only flat index over fixed-dimension `f32` vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Vector dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a vector.
    pub fn add(&mut self, vector: &[f32]) -> Result<(), StoreError> {
        self.check_vector(vector).map_err(StoreError::Insert)?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Vector at `index`, if present.
    #[must_use]
    pub fn vector(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// All entries ordered by ascending distance to `query`, ties broken by
    /// insertion order.
    pub fn ranked(&self, query: &[f32]) -> Result<Vec<(usize, f32)>, StoreError> {
        self.check_vector(query).map_err(StoreError::Query)?;
        if self.dimension == 0 {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(i, v)| (i, squared_l2(query, v)))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }

    /// The `k` nearest entries.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, StoreError> {
        let mut ranked = self.ranked(query)?;
        ranked.truncate(k);
        Ok(ranked)
    }

    /// Rebuild the index keeping only entries for which `keep` returns true.
    #[must_use]
    pub fn retain(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
        let data = self
            .data
            .chunks_exact(self.dimension.max(1))
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .flat_map(|(_, v)| v.iter().copied())
            .collect();
        Self {
            dimension: self.dimension,
            data,
        }
    }

    /// Check the structure after deserialization.
    pub fn validate(&self, expected_dimension: usize) -> Result<(), StoreError> {
        if self.dimension != expected_dimension {
            return Err(StoreError::Corrupt(format!(
                "index dimension {} does not match configured dimension {}",
                self.dimension, expected_dimension
            )));
        }
        if self.dimension == 0 || self.data.len() % self.dimension != 0 {
            return Err(StoreError::Corrupt(format!(
                "index holds {} values, not a multiple of dimension {}",
                self.data.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    fn check_vector(&self, vector: &[f32]) -> Result<(), String> {
        if vector.len() != self.dimension {
            return Err(format!(
                "vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            ));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err("vector contains non-finite values".to_string());
        }
        Ok(())
    }
}

/// Squared Euclidean distance.
#[must_use]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Cosine similarity; zero when either vector has zero norm or the
/// dimensions differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_len() {
        let mut index = FlatIndex::new(2);
        assert!(index.is_empty());
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.vector(1), Some(&[0.0, 1.0][..]));
        assert_eq!(index.vector(2), None);
    }

    #[test]
    fn test_add_rejects_wrong_dimension() {
        let mut index = FlatIndex::new(3);
        let err = index.add(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, StoreError::Insert(_)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_add_rejects_nan() {
        let mut index = FlatIndex::new(2);
        assert!(index.add(&[f32::NAN, 0.0]).is_err());
    }

    #[test]
    fn test_search_orders_by_distance() {
        let mut index = FlatIndex::new(2);
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.9, 0.1]).unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0], (1, 0.0));
        assert_eq!(hits[1].0, 2);
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let mut index = FlatIndex::new(1);
        index.add(&[2.0]).unwrap();
        index.add(&[0.0]).unwrap();
        index.add(&[2.0]).unwrap();

        let ranked = index.ranked(&[1.0]).unwrap();
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_rejects_wrong_query_dimension() {
        let index = FlatIndex::new(2);
        assert!(matches!(
            index.search(&[1.0], 1),
            Err(StoreError::Query(_))
        ));
    }

    #[test]
    fn test_retain_rebuilds() {
        let mut index = FlatIndex::new(1);
        for v in 0..5 {
            index.add(&[v as f32]).unwrap();
        }
        let kept = index.retain(|i| i % 2 == 0);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept.vector(1), Some(&[2.0][..]));
    }

    #[test]
    fn test_validate() {
        let index = FlatIndex::new(2);
        assert!(index.validate(2).is_ok());
        assert!(matches!(index.validate(3), Err(StoreError::Corrupt(_))));

        let broken: FlatIndex =
            serde_json::from_str(r#"{"dimension":2,"data":[1.0,2.0,3.0]}"#).unwrap();
        assert!(matches!(broken.validate(2), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[1.0, 0.0], &[0.0, 1.0]), 2.0);
        assert_eq!(squared_l2(&[3.0], &[1.0]), 4.0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
