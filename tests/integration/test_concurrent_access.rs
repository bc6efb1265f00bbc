//! Readers running alongside writers must never see a half-applied batch.

use crate::common::{dimension, doc, random_batch};
use rand::SeedableRng;
use rand::rngs::StdRng;
use retriever::RetrievalPipeline;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const DIM: usize = 8;
const BATCH: usize = 16;

#[test]
fn test_readers_observe_whole_batches() {
    let pipeline = Arc::new(RetrievalPipeline::new(dimension(DIM)));
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(w);
                for round in 0..25 {
                    let batch = random_batch(&mut rng, &format!("w{w}-r{round}"), BATCH, DIM);
                    pipeline.ingest(batch).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|r| {
            let pipeline = Arc::clone(&pipeline);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let query = vec![r as f32 * 0.1; DIM];
                let mut observations = 0usize;
                while !done.load(Ordering::Acquire) {
                    let counts = pipeline.counts();
                    assert!(counts.is_aligned(), "saw {counts:?}");
                    assert_eq!(counts.documents % BATCH, 0, "saw a partial batch");

                    let info = pipeline.describe();
                    assert_eq!(info.total_documents % BATCH, 0);

                    let hits = pipeline.search(&query, 5, 0.0).unwrap();
                    assert!(hits.len() <= 5);
                    observations += 1;
                }
                observations
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(pipeline.count(), 4 * 25 * BATCH);
    assert!(pipeline.counts().is_aligned());
}

#[test]
fn test_rejected_batches_under_contention_leave_no_trace() {
    let pipeline = Arc::new(RetrievalPipeline::new(dimension(2)));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                for i in 0..50 {
                    let embedding = if (t + i) % 3 == 0 {
                        vec![0.0; 3]
                    } else {
                        vec![t as f32, i as f32]
                    };
                    let _ = pipeline.ingest(vec![
                        doc(&format!("{t}-{i}-a"), vec![1.0, 1.0]),
                        doc(&format!("{t}-{i}-b"), embedding),
                    ]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let accepted = (0..8)
        .flat_map(|t| (0..50).map(move |i| (t + i) % 3 != 0))
        .filter(|ok| *ok)
        .count();
    assert_eq!(pipeline.count(), accepted * 2);
    assert!(pipeline.counts().is_aligned());
}
