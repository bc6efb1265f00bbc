use crate::storage::Metadata;
use crate::vector::{Neighbor, Ordinal, Score};
use serde::Serialize;

/// One search result: the stored payload and how similar it is to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub metadata: Metadata,
    pub score: Score,
}

/// Scores neighbors and keeps those with `score >= threshold`.
///
/// `1 / (1 + d)` is decreasing in `d`, so the ascending-distance order of
/// `neighbors` is already descending-score order and survives the filter.
pub(crate) fn score_and_filter(
    neighbors: Vec<Neighbor>,
    threshold: f32,
) -> impl Iterator<Item = (Ordinal, Score)> {
    neighbors
        .into_iter()
        .map(|n| (n.ordinal, Score::from_distance(n.distance)))
        .filter(move |(_, score)| score.passes(threshold))
}
