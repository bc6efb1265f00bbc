//! A journaled store must come back identical after a restart.

use crate::common::{dimension, doc, doc_with, random_batch};
use rand::SeedableRng;
use rand::rngs::StdRng;
use retriever::{BatchJournal, JournalError, RetrievalError, RetrievalPipeline, Settings};
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tempfile::TempDir;

#[test]
fn test_restart_reproduces_results() {
    let temp_dir = TempDir::new().unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let queries: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32 * 0.2 - 0.4; 16]).collect();

    let before = {
        let pipeline = RetrievalPipeline::open(dimension(16), temp_dir.path(), true).unwrap();
        for batch in 0..6 {
            pipeline
                .ingest(random_batch(&mut rng, &format!("b{batch}"), 10, 16))
                .unwrap();
        }
        pipeline
            .ingest(vec![doc_with(
                "tagged",
                json!({"region": "APAC", "weight": 0.25}),
                vec![0.0; 16],
            )])
            .unwrap();

        let results: Vec<_> = queries
            .iter()
            .map(|q| pipeline.search(q, 7, 0.0).unwrap())
            .collect();
        (results, pipeline.describe())
    };

    let reopened = RetrievalPipeline::open(dimension(16), temp_dir.path(), true).unwrap();
    let after: Vec<_> = queries
        .iter()
        .map(|q| reopened.search(q, 7, 0.0).unwrap())
        .collect();

    assert_eq!(after, before.0);
    assert_eq!(reopened.describe(), before.1);
    assert_eq!(reopened.count(), 61);
}

#[test]
fn test_rejected_and_empty_batches_are_not_journaled() {
    let temp_dir = TempDir::new().unwrap();
    let wal = temp_dir.path().join(BatchJournal::FILE_NAME);

    let pipeline = RetrievalPipeline::open(dimension(2), temp_dir.path(), true).unwrap();
    pipeline.ingest(vec![doc("kept", vec![1.0, 1.0])]).unwrap();
    let size = fs::metadata(&wal).unwrap().len();

    assert!(pipeline.ingest(vec![doc("bad", vec![1.0])]).is_err());
    pipeline.ingest(Vec::new()).unwrap();
    assert_eq!(fs::metadata(&wal).unwrap().len(), size);
    drop(pipeline);

    let reopened = RetrievalPipeline::open(dimension(2), temp_dir.path(), true).unwrap();
    assert_eq!(reopened.count(), 1);
}

#[test]
fn test_torn_tail_is_dropped_on_restart() {
    let temp_dir = TempDir::new().unwrap();

    let pipeline = RetrievalPipeline::open(dimension(2), temp_dir.path(), true).unwrap();
    pipeline.ingest(vec![doc("a", vec![0.0, 0.0])]).unwrap();
    pipeline.ingest(vec![doc("b", vec![1.0, 0.0])]).unwrap();
    drop(pipeline);

    let mut file = OpenOptions::new()
        .append(true)
        .open(temp_dir.path().join(BatchJournal::FILE_NAME))
        .unwrap();
    file.write_all(b"0123abcd\t{\"recorded_at\":\"2025-").unwrap();
    drop(file);

    let reopened = RetrievalPipeline::open(dimension(2), temp_dir.path(), true).unwrap();
    assert_eq!(reopened.count(), 2);

    // The store keeps accepting writes after recovery
    reopened.ingest(vec![doc("c", vec![0.0, 1.0])]).unwrap();
    drop(reopened);
    let again = RetrievalPipeline::open(dimension(2), temp_dir.path(), true).unwrap();
    assert_eq!(again.count(), 3);
}

#[test]
fn test_dimension_change_is_refused() {
    let temp_dir = TempDir::new().unwrap();
    drop(RetrievalPipeline::open(dimension(4), temp_dir.path(), true).unwrap());

    let err = RetrievalPipeline::open(dimension(5), temp_dir.path(), true).unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::Journal(JournalError::DimensionConflict {
            journal: 4,
            configured: 5
        })
    ));
    assert!(!err.is_client_error());
}

#[test]
fn test_from_settings_honors_journal_section() {
    let temp_dir = TempDir::new().unwrap();

    let mut settings = Settings::default();
    settings.store.dimension = 3;
    settings.journal.enabled = true;
    settings.journal.path = temp_dir.path().join("journal");
    settings.journal.sync = false;

    let pipeline = RetrievalPipeline::from_settings(&settings).unwrap();
    assert!(pipeline.is_journaled());
    pipeline.ingest(vec![doc("x", vec![1.0, 2.0, 3.0])]).unwrap();
    drop(pipeline);

    let reopened = RetrievalPipeline::from_settings(&settings).unwrap();
    assert_eq!(reopened.count(), 1);

    settings.journal.enabled = false;
    let memory_only = RetrievalPipeline::from_settings(&settings).unwrap();
    assert!(!memory_only.is_journaled());
    assert_eq!(memory_only.count(), 0);
}
