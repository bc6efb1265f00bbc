//! Type-safe wrappers and core types for the vector index.
//!
//! Newtypes here keep ordinals, dimensions and similarity scores from being
//! mixed up with plain integers and floats at the index/store boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default embedding dimension for the retriever (768-d sentence encoders).
pub const DEFAULT_DIMENSION: usize = 768;

/// Zero-based insertion position shared by the vector index and the document store.
///
/// Ordinals are assigned in insertion order, grow monotonically and are never
/// reused, so they can be zero (the first document).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ordinal(u64);

impl Ordinal {
    /// Creates a new `Ordinal`.
    #[must_use]
    pub const fn new(ordinal: u64) -> Self {
        Self(ordinal)
    }

    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Returns the ordinal as a slot index into in-memory containers.
    #[must_use]
    pub const fn as_index(&self) -> usize {
        self.0 as usize
    }

    /// Builds an ordinal from an in-memory slot index.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index as u64)
    }
}

impl std::fmt::Display for Ordinal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contiguous, half-open range of ordinals assigned to one insertion batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinalRange {
    /// First ordinal of the batch.
    pub start: Ordinal,
    /// One past the last ordinal of the batch.
    pub end: Ordinal,
}

impl OrdinalRange {
    /// Creates a range covering `len` ordinals starting at `start`.
    #[must_use]
    pub const fn starting_at(start: Ordinal, len: usize) -> Self {
        Self {
            start,
            end: Ordinal::new(start.get() + len as u64),
        }
    }

    /// An empty range positioned at `at`.
    #[must_use]
    pub const fn empty_at(at: Ordinal) -> Self {
        Self { start: at, end: at }
    }

    /// Number of ordinals in the range.
    #[must_use]
    pub const fn len(&self) -> usize {
        (self.end.get() - self.start.get()) as usize
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start.get() == self.end.get()
    }

    /// Iterates the ordinals in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Ordinal> + use<> {
        (self.start.get()..self.end.get()).map(Ordinal::new)
    }
}

impl std::fmt::Display for OrdinalRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Type-safe wrapper for similarity scores.
///
/// Scores live in the range (0.0, 1.0] where:
/// - 1.0 indicates an exact match (zero distance)
/// - values approach 0.0 as distance grows but never reach it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Score(f32);

impl Score {
    /// Maps a squared Euclidean distance to a similarity score: `1 / (1 + distance)`.
    ///
    /// Zero distance maps to 1.0 and the score falls monotonically toward 0.0.
    /// Finite components far apart (around 1e20) overflow the squared distance
    /// to infinity; those scores are clamped to `f32::MIN_POSITIVE` so every
    /// score stays strictly positive.
    #[must_use]
    pub fn from_distance(distance: f32) -> Self {
        debug_assert!(distance >= 0.0, "squared distance cannot be negative");
        Self((1.0 / (1.0 + distance.max(0.0))).max(f32::MIN_POSITIVE))
    }

    /// Returns the underlying f32 value.
    #[must_use]
    pub fn get(&self) -> f32 {
        self.0
    }

    /// Whether this score clears `threshold` (inclusive lower bound).
    #[must_use]
    pub fn passes(&self, threshold: f32) -> bool {
        self.0 >= threshold
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Type-safe wrapper for vector dimensions.
///
/// Fixed once per store; every inserted or queried vector is validated
/// against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// The default 768-dimensional store.
    #[must_use]
    pub const fn default_768() -> Self {
        Self(DEFAULT_DIMENSION)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension and only finite components.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        if let Some(position) = vector.iter().position(|v| !v.is_finite()) {
            return Err(VectorError::NonFiniteComponent { position });
        }
        Ok(())
    }
}

impl TryFrom<usize> for VectorDimension {
    type Error = VectorError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VectorDimension> for usize {
    fn from(value: VectorDimension) -> Self {
        value.0
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur during vector operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all embeddings come from the same model as the store"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Vector component at position {position} is not finite\nSuggestion: Check the embedding producer for NaN or infinite outputs"
    )]
    NonFiniteComponent { position: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error("Invalid neighbor count: k must be at least 1\nSuggestion: Request one or more results")]
    InvalidK,
}
