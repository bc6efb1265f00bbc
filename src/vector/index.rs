//! Nearest-neighbor index over stored embedding vectors.
//!
//! [`VectorIndex`] is the contract every index strategy must honor:
//! results come back in ascending squared Euclidean distance, ties broken by
//! ascending ordinal. [`FlatIndex`] satisfies it with an exact linear scan.

use std::cmp::Ordering;

use crate::vector::distance::squared_euclidean;
use crate::vector::{Ordinal, OrdinalRange, VectorDimension, VectorError};

/// One query hit from the index: where the vector lives and how far it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Ordinal of the stored vector.
    pub ordinal: Ordinal,
    /// Squared Euclidean distance to the query vector.
    pub distance: f32,
}

impl Neighbor {
    /// Total order used for ranking: ascending distance, then ascending ordinal.
    #[inline]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.ordinal.cmp(&other.ordinal))
    }
}

/// Append-only store of fixed-dimension vectors answering k-NN queries.
///
/// Implementations must:
/// - reject a whole batch if any vector fails validation, inserting nothing
/// - assign contiguous ordinals in argument order, never reusing one
/// - return at most `k` neighbors ordered by [`Neighbor::rank_cmp`]
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored and queried vector must have.
    fn dimension(&self) -> VectorDimension;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a batch of vectors, all-or-nothing.
    fn insert_batch(&mut self, vectors: &[Vec<f32>]) -> Result<OrdinalRange, VectorError>;

    /// Returns up to `k` nearest stored vectors to `vector`.
    ///
    /// An empty index yields an empty result, not an error.
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorError>;
}

/// Exact flat index: one contiguous row-major buffer, scanned in full per query.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: VectorDimension,
    /// `len * dimension` components, vector `i` at `[i * dim, (i + 1) * dim)`.
    data: Vec<f32>,
    len: usize,
}

impl FlatIndex {
    /// Creates an empty index for vectors of `dimension` components.
    #[must_use]
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            dimension,
            data: Vec::new(),
            len: 0,
        }
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension.get())
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn len(&self) -> usize {
        self.len
    }

    fn insert_batch(&mut self, vectors: &[Vec<f32>]) -> Result<OrdinalRange, VectorError> {
        let start = Ordinal::from_index(self.len);

        // Validate the whole batch before touching the buffer
        for vector in vectors {
            self.dimension.validate_vector(vector)?;
        }

        self.data.reserve(vectors.len() * self.dimension.get());
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        self.len += vectors.len();

        Ok(OrdinalRange::starting_at(start, vectors.len()))
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorError> {
        self.dimension.validate_vector(vector)?;
        if k == 0 {
            return Err(VectorError::InvalidK);
        }

        if self.len == 0 {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<Neighbor> = self
            .rows()
            .enumerate()
            .map(|(i, row)| Neighbor {
                ordinal: Ordinal::from_index(i),
                distance: squared_euclidean(vector, row),
            })
            .collect();

        // Partial selection of the k best, then a full sort of just those k
        if k < candidates.len() {
            candidates.select_nth_unstable_by(k - 1, Neighbor::rank_cmp);
            candidates.truncate(k);
        }
        candidates.sort_unstable_by(Neighbor::rank_cmp);

        Ok(candidates)
    }
}
