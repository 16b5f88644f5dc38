//! Flat (brute-force) L2 nearest-neighbour index.
//!
//! Vectors are stored row-major in one contiguous buffer. Search scans every
//! row and reports squared Euclidean distances, ascending, with ties broken by
//! insertion position.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// An exact nearest-neighbour index over fixed-dimensional `f32` vectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlatL2Index {
    dimensions: usize,
    data: Vec<f32>,
}

/// One search hit: the row position in the index and its squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl FlatL2Index {
    /// Create an empty index for vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, data: Vec::new() }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimensions == 0 { 0 } else { self.data.len() / self.dimensions }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors; their positions follow insertion order.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            self.check(vector)?;
        }
        self.data.reserve(vectors.len() * self.dimensions);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Return the `k` rows closest to `query`, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check(query)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, row)| Neighbor { position, distance: squared_l2(row, query) })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance.total_cmp(&b.distance).then_with(|| a.position.cmp(&b.position))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Check internal consistency after deserialisation.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.dimensions == 0 {
            return Err("index has zero dimensions".to_string());
        }
        if self.data.len() % self.dimensions != 0 {
            return Err(format!(
                "vector buffer of {} floats is not a multiple of {} dimensions",
                self.data.len(),
                self.dimensions
            ));
        }
        Ok(())
    }

    fn check(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(RagError::DimensionMismatch { expected: self.dimensions, actual: vector.len() });
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Map an L2 distance to a similarity in `(0, 1]`.
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}
