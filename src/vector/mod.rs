//! Vector index for similarity retrieval.
//!
//! Stores fixed-dimension embeddings in insertion order and answers exact
//! k-nearest-neighbor queries by squared Euclidean distance.
//!
//! # Ordering contract
//! Query results are sorted by ascending distance with ties broken by the
//! lowest ordinal. Any index strategy plugged in behind [`VectorIndex`] has to
//! keep that contract so searches stay deterministic.

mod distance;
mod index;
mod types;

pub use distance::squared_euclidean;
pub use index::{FlatIndex, Neighbor, VectorIndex};
pub use types::{DEFAULT_DIMENSION, Ordinal, OrdinalRange, Score, VectorDimension, VectorError};
