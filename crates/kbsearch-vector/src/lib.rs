//! kbsearch-vector
//!
//! Exact nearest-neighbour search by squared Euclidean distance over a
//! snapshot of vectors. Row `i` of the index is the `i`-th vector passed to
//! [`FlatIndex::build`]; callers use that position as their join key.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use kbsearch_core::types::Neighbor;
use kbsearch_core::{Error, Result};

pub mod distance;

pub use distance::l2_squared;

/// Row-major flat storage; read-only once built.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// An index with no rows; every search on it returns no hits.
    pub fn empty(dim: usize) -> Result<Self> {
        Self::build(std::iter::empty::<&[f32]>(), dim)
    }

    pub fn build<I, V>(vectors: I, dim: usize) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[f32]>,
    {
        if dim == 0 {
            return Err(Error::Configuration("index dimension must be positive".to_string()));
        }
        let mut data = Vec::new();
        for v in vectors {
            let v = v.as_ref();
            if v.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: v.len() });
            }
            data.extend_from_slice(v);
        }
        let index = Self { dim, data };
        tracing::debug!(rows = index.len(), dim, "flat index built");
        Ok(index)
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { self.data.len() / self.dim }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// The vector stored at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// The `k` closest rows, ascending by distance, ties by lower position.
    /// Returns fewer than `k` hits when the index is smaller than `k`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        // Max-heap holding the best `k` so far; its top is the worst kept hit.
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        for (position, row) in self.data.chunks_exact(self.dim).enumerate() {
            let candidate = Candidate { distance: l2_squared(query, row), position };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }
        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor { position: c.position, distance: c.distance })
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    position: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for Candidate {}
