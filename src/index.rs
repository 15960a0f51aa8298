//! Exact L2 nearest-neighbor index over a flat vector array.
//!
//! Rows are stored contiguously as `[v0_d0, v0_d1, ..., v1_d0, v1_d1, ...]`.
//! A row's position is its identity: `add` appends, `replace` overwrites in
//! place and `remove` shifts every later row down by one.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::vector::squared_l2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatL2Index {
    /// Creates an empty index for vectors of length `dimension`.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(StoreError::InvalidDimension(dimension));
        }
        Ok(FlatL2Index { dimension, vectors: Vec::new() })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Checks a deserialized index: nonzero dimension and whole rows only.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(StoreError::corrupt("index dimension is zero"));
        }
        if self.vectors.len() % self.dimension != 0 {
            return Err(StoreError::corrupt(format!(
                "index holds {} values, not a multiple of dimension {}",
                self.vectors.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    /// Number of rows in the index.
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Appends a row and returns its position.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dimension(vector)?;
        self.vectors.extend_from_slice(vector);
        Ok(self.len() - 1)
    }

    /// Overwrites the row at `position` without moving any other row.
    pub fn replace(&mut self, position: usize, vector: &[f32]) -> Result<()> {
        self.check_dimension(vector)?;
        let start = self.row_start(position)?;
        self.vectors[start..start + self.dimension].copy_from_slice(vector);
        Ok(())
    }

    /// Removes the row at `position`. Later rows move down by one.
    pub fn remove(&mut self, position: usize) -> Result<()> {
        let start = self.row_start(position)?;
        self.vectors.drain(start..start + self.dimension);
        Ok(())
    }

    /// Returns the row at `position`.
    pub fn get(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimension;
        Some(&self.vectors[start..start + self.dimension])
    }

    /// Finds the `k` rows closest to `query` by squared L2 distance.
    ///
    /// Results are `(position, distance)` pairs sorted nearest first; equal
    /// distances keep insertion order. Returns fewer than `k` results when the
    /// index holds fewer rows.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        self.check_dimension(query)?;

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut best: Vec<(usize, f32)> = Vec::with_capacity(k + 1);
        for (position, row) in self.vectors.chunks_exact(self.dimension).enumerate() {
            let dist = squared_l2(row, query)?;
            if best.len() == k && dist >= best[k - 1].1 {
                continue;
            }
            let insert_at = best.partition_point(|&(_, d)| d <= dist);
            best.insert(insert_at, (position, dist));
            best.truncate(k);
        }

        Ok(best)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn row_start(&self, position: usize) -> Result<usize> {
        if position >= self.len() {
            return Err(StoreError::InvalidVector("row position out of range"));
        }
        Ok(position * self.dimension)
    }
}
