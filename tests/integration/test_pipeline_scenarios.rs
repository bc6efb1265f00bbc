//! End-to-end ingestion and search scenarios against the in-memory store.

use crate::common::{abc_pipeline, dimension, doc, doc_with};
use retriever::{RetrievalError, RetrievalPipeline, VectorError};
use serde_json::{Value, json};

fn texts(hits: &[retriever::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.text.as_str()).collect()
}

#[test]
fn test_top_two_at_half_threshold() {
    let pipeline = abc_pipeline();

    let hits = pipeline.search(&[0.0; 4], 2, 0.5).unwrap();

    assert_eq!(texts(&hits), vec!["A", "B"]);
    assert_eq!(hits[0].score.get(), 1.0);
    assert_eq!(hits[1].score.get(), 0.5);
}

#[test]
fn test_threshold_above_tied_score() {
    let pipeline = abc_pipeline();

    let hits = pipeline.search(&[0.0; 4], 2, 0.6).unwrap();
    assert_eq!(texts(&hits), vec!["A"]);
}

#[test]
fn test_tie_broken_by_insertion_order() {
    let pipeline = abc_pipeline();

    // B and C are both at distance 1 from the origin
    let hits = pipeline.search(&[0.0; 4], 3, 0.0).unwrap();
    assert_eq!(texts(&hits), vec!["A", "B", "C"]);
}

#[test]
fn test_threshold_applies_after_top_k() {
    let pipeline = abc_pipeline();

    // B and C would pass the threshold but only one neighbor is retrieved
    let hits = pipeline.search(&[0.0; 4], 1, 0.0).unwrap();
    assert_eq!(texts(&hits), vec!["A"]);
}

#[test]
fn test_short_embedding_rejects_whole_batch() {
    let pipeline = abc_pipeline();

    let result = pipeline.ingest(vec![
        doc("D", vec![0.5; 4]),
        doc("E", vec![0.25; 4]),
        doc("F", vec![0.0; 3]),
    ]);

    assert!(matches!(
        result,
        Err(RetrievalError::Vector(VectorError::DimensionMismatch {
            expected: 4,
            actual: 3
        }))
    ));
    assert_eq!(pipeline.count(), 3);
    let hits = pipeline.search(&[0.5; 4], 10, 0.0).unwrap();
    assert_eq!(hits.len(), 3);
}

#[test]
fn test_non_finite_embedding_rejected() {
    let pipeline = abc_pipeline();

    let result = pipeline.ingest(vec![doc("G", vec![0.0, f32::INFINITY, 0.0, 0.0])]);
    assert!(matches!(
        result,
        Err(RetrievalError::Vector(VectorError::NonFiniteComponent { position: 1 }))
    ));
    assert_eq!(pipeline.count(), 3);

    let query = pipeline.search(&[f32::NAN, 0.0, 0.0, 0.0], 1, 0.0);
    assert!(matches!(query, Err(RetrievalError::Vector(_))));
}

#[test]
fn test_top_k_larger_than_store() {
    let pipeline = abc_pipeline();
    let hits = pipeline.search(&[0.0; 4], 50, 0.0).unwrap();
    assert_eq!(hits.len(), 3);
}

#[test]
fn test_nothing_clears_threshold() {
    let pipeline = abc_pipeline();
    let hits = pipeline.search(&[10.0; 4], 3, 0.9).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_metadata_round_trips_verbatim() {
    let pipeline = RetrievalPipeline::new(dimension(3));
    let metadata = json!({
        "source": "10-K",
        "ticker": "AAPL",
        "sections": ["risk", "outlook"],
        "nested": {"page": 12, "confidence": 0.93},
        "reviewed": null
    });
    pipeline
        .ingest(vec![
            doc_with("Apple supply chain risk", metadata.clone(), vec![1.0, 2.0, 3.0]),
            doc("unrelated", vec![-5.0, -5.0, -5.0]),
        ])
        .unwrap();

    let hits = pipeline.search(&[1.0, 2.0, 3.0], 1, 0.5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "Apple supply chain risk");
    assert_eq!(Value::Object(hits[0].metadata.clone()), metadata);

    // Key order survives as well
    let keys: Vec<&str> = hits[0].metadata.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["source", "ticker", "sections", "nested", "reviewed"]);
}

#[test]
fn test_batches_append_in_order() {
    let pipeline = RetrievalPipeline::new(dimension(1));
    let first = pipeline.ingest(vec![doc("one", vec![1.0]), doc("two", vec![2.0])]).unwrap();
    let second = pipeline.ingest(vec![doc("three", vec![3.0])]).unwrap();

    assert_eq!(first.ordinals.start.get(), 0);
    assert_eq!(first.ordinals.end.get(), 2);
    assert_eq!(second.ordinals.start.get(), 2);
    assert_eq!(second.total_documents, 3);

    let hits = pipeline.search(&[3.0], 3, 0.0).unwrap();
    assert_eq!(texts(&hits), vec!["three", "two", "one"]);
}

#[test]
fn test_info_reflects_ingestion() {
    let pipeline = RetrievalPipeline::new(dimension(768));
    let empty = pipeline.describe();
    assert_eq!(empty.dimension, 768);
    assert_eq!(empty.total_documents, 0);

    pipeline.ingest(vec![doc("x", vec![0.1; 768])]).unwrap();
    let after = pipeline.describe();
    assert_eq!(after.total_documents, 1);
    assert!(after.last_updated >= empty.last_updated);

    // last_updated serializes as RFC 3339
    let value = serde_json::to_value(&after).unwrap();
    let stamp = value["last_updated"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
}
