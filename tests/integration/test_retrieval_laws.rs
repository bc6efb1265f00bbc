//! Property-based tests for store invariants
//!
//! 1. Alignment: vector count == document count after any ingest sequence
//! 2. Ordering: scores are non-increasing, ties ordered by ordinal
//! 3. Threshold: every hit has score >= threshold and at most k hits
//! 4. Determinism: same insert sequence and query give identical results
//! 5. Exactness: results match a brute-force scan

use crate::common::{dimension, doc};
use proptest::prelude::*;
use retriever::{Document, RetrievalPipeline};

const DIM: usize = 3;

fn embedding_strategy() -> impl Strategy<Value = Vec<f32>> {
    // Small integer grid makes exact ties common
    prop::collection::vec((-3i8..=3).prop_map(f32::from), DIM..=DIM)
}

/// A batch where each entry may carry a wrong-length embedding.
fn batch_strategy() -> impl Strategy<Value = Vec<(Vec<f32>, bool)>> {
    prop::collection::vec((embedding_strategy(), prop::bool::weighted(0.1)), 0..6)
}

fn build(batches: &[Vec<(Vec<f32>, bool)>]) -> (RetrievalPipeline, Vec<Vec<f32>>) {
    let pipeline = RetrievalPipeline::new(dimension(DIM));
    let mut accepted = Vec::new();
    let mut next = 0usize;

    for batch in batches {
        let documents: Vec<Document> = batch
            .iter()
            .map(|(embedding, truncate)| {
                next += 1;
                let mut embedding = embedding.clone();
                if *truncate {
                    embedding.pop();
                }
                doc(&format!("doc-{next}"), embedding)
            })
            .collect();

        let valid = documents.iter().all(|d| d.embedding.len() == DIM);
        let embeddings: Vec<Vec<f32>> = documents.iter().map(|d| d.embedding.clone()).collect();
        let result = pipeline.ingest(documents);

        assert_eq!(result.is_ok(), valid);
        if valid {
            accepted.extend(embeddings);
        }
    }

    (pipeline, accepted)
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

proptest! {
    #[test]
    fn proptest_alignment(batches in prop::collection::vec(batch_strategy(), 0..8)) {
        let (pipeline, accepted) = build(&batches);

        let counts = pipeline.counts();
        prop_assert!(counts.is_aligned());
        prop_assert_eq!(counts.documents, accepted.len());
        prop_assert_eq!(pipeline.describe().total_documents, accepted.len());
    }

    #[test]
    fn proptest_ordering_and_threshold(
        batches in prop::collection::vec(batch_strategy(), 1..6),
        query in embedding_strategy(),
        k in 1usize..12,
        threshold in 0.0f32..1.0,
    ) {
        let (pipeline, _) = build(&batches);
        let hits = pipeline.search(&query, k, threshold).unwrap();

        prop_assert!(hits.len() <= k);
        for hit in &hits {
            prop_assert!(hit.score.get() >= threshold);
            prop_assert!(hit.score.get() > 0.0 && hit.score.get() <= 1.0);
        }
        for pair in hits.windows(2) {
            prop_assert!(pair[0].score.get() >= pair[1].score.get());
            if pair[0].score == pair[1].score {
                // Names encode insertion order
                let a: usize = pair[0].text["doc-".len()..].parse().unwrap();
                let b: usize = pair[1].text["doc-".len()..].parse().unwrap();
                prop_assert!(a < b);
            }
        }
    }

    #[test]
    fn proptest_determinism(
        batches in prop::collection::vec(batch_strategy(), 1..6),
        query in embedding_strategy(),
        k in 1usize..12,
    ) {
        let (first, _) = build(&batches);
        let (second, _) = build(&batches);

        let a = first.search(&query, k, 0.0).unwrap();
        let b = second.search(&query, k, 0.0).unwrap();
        prop_assert_eq!(&a, &b);

        // Repeating the query on the same store changes nothing
        prop_assert_eq!(first.search(&query, k, 0.0).unwrap(), a);
    }

    #[test]
    fn proptest_matches_brute_force(
        batches in prop::collection::vec(batch_strategy(), 1..6),
        query in embedding_strategy(),
        k in 1usize..12,
    ) {
        let (pipeline, accepted) = build(&batches);
        let hits = pipeline.search(&query, k, 0.0).unwrap();

        let mut expected: Vec<(f32, usize)> = accepted
            .iter()
            .enumerate()
            .map(|(ordinal, e)| (squared_distance(e, &query), ordinal))
            .collect();
        expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        expected.truncate(k);

        prop_assert_eq!(hits.len(), expected.len());
        for (hit, (distance, _)) in hits.iter().zip(&expected) {
            let score = 1.0 / (1.0 + distance);
            prop_assert!((hit.score.get() - score).abs() < 1e-6);
        }
    }
}
