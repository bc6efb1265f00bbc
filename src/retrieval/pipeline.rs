//! The single gate in front of the vector index and the document store.
//!
//! Both containers live behind one `RwLock`: ingestion takes it exclusively
//! and writes the index and the store as one step, searches and `describe`
//! share it. Readers therefore never observe one container ahead of the
//! other, and a rejected batch leaves both untouched.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::{RetrievalError, RetrievalResult};
use crate::journal::{BatchJournal, JournalError, Replay};
use crate::retrieval::hit::{SearchHit, score_and_filter};
use crate::storage::{Document, DocumentStore, Payload};
use crate::vector::{FlatIndex, Ordinal, OrdinalRange, VectorDimension, VectorIndex};

/// Outcome of a successful `ingest` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReceipt {
    /// Number of documents added by this call.
    pub accepted: usize,
    /// Ordinals assigned to the batch, in submission order.
    pub ordinals: OrdinalRange,
    /// Store size once the batch is visible.
    pub total_documents: usize,
}

/// Snapshot of store metadata returned by `describe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub dimension: usize,
    pub total_documents: usize,
    pub last_updated: DateTime<Utc>,
}

/// Sizes of both containers taken under one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub vectors: usize,
    pub documents: usize,
}

impl StoreCounts {
    pub fn is_aligned(&self) -> bool {
        self.vectors == self.documents
    }
}

struct StoreState<I> {
    index: I,
    documents: DocumentStore,
    last_updated: DateTime<Utc>,
    journal: Option<BatchJournal>,
}

impl<I: VectorIndex> StoreState<I> {
    /// Writes a validated batch into both containers.
    fn apply(
        &mut self,
        documents: Vec<Document>,
        recorded_at: DateTime<Utc>,
    ) -> RetrievalResult<OrdinalRange> {
        let (embeddings, payloads): (Vec<Vec<f32>>, Vec<Payload>) =
            documents.into_iter().map(Document::into_parts).unzip();

        let indexed = self.index.insert_batch(&embeddings)?;
        let stored = self.documents.append_batch(payloads);

        if indexed != stored {
            error!(%indexed, %stored, "Index and document store ordinals diverged");
            return Err(RetrievalError::InvariantViolation {
                reason: format!("index assigned {indexed} but document store assigned {stored}"),
            });
        }

        self.last_updated = recorded_at;
        Ok(indexed)
    }
}

/// Query pipeline over a vector index and its document store.
///
/// Constructed once at startup and shared by reference (usually an `Arc`)
/// with every request handler.
pub struct RetrievalPipeline<I = FlatIndex> {
    dimension: VectorDimension,
    state: RwLock<StoreState<I>>,
}

impl<I> std::fmt::Debug for RetrievalPipeline<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("RetrievalPipeline");
        debug.field("dimension", &self.dimension);
        match self.state.try_read() {
            Some(state) => debug
                .field("documents", &state.documents.count())
                .field("journaled", &state.journal.is_some()),
            None => debug.field("state", &"<locked>"),
        };
        debug.finish()
    }
}

impl RetrievalPipeline<FlatIndex> {
    /// Creates an empty, memory-only store with an exact flat index.
    pub fn new(dimension: VectorDimension) -> Self {
        Self::from_parts(FlatIndex::new(dimension))
    }

    /// Creates a flat-index store backed by the journal in `dir`, replaying it.
    pub fn open(dimension: VectorDimension, dir: &Path, sync: bool) -> RetrievalResult<Self> {
        Self::with_index_and_journal(FlatIndex::new(dimension), dir, sync)
    }

    /// Builds the store described by `settings`: dimension plus optional journal.
    pub fn from_settings(settings: &Settings) -> RetrievalResult<Self> {
        let dimension = VectorDimension::new(settings.store.dimension)?;
        if settings.journal.enabled {
            Self::open(dimension, &settings.journal.path, settings.journal.sync)
        } else {
            Ok(Self::new(dimension))
        }
    }
}

impl<I: VectorIndex> RetrievalPipeline<I> {
    /// Wraps an existing, empty index.
    pub fn with_index(index: I) -> RetrievalResult<Self> {
        Self::ensure_empty(&index)?;
        Ok(Self::from_parts(index))
    }

    /// Wraps an empty index and replays the journal in `dir` into it.
    pub fn with_index_and_journal(index: I, dir: &Path, sync: bool) -> RetrievalResult<Self> {
        Self::ensure_empty(&index)?;
        let (journal, replay) = BatchJournal::open(dir, index.dimension(), sync)?;

        let pipeline = Self::from_parts(index);
        pipeline.replay(replay)?;
        pipeline.state.write().journal = Some(journal);
        Ok(pipeline)
    }

    fn from_parts(index: I) -> Self {
        Self {
            dimension: index.dimension(),
            state: RwLock::new(StoreState {
                index,
                documents: DocumentStore::new(),
                last_updated: Utc::now(),
                journal: None,
            }),
        }
    }

    fn ensure_empty(index: &I) -> RetrievalResult<()> {
        if index.is_empty() {
            Ok(())
        } else {
            Err(RetrievalError::InvariantViolation {
                reason: format!(
                    "index already holds {} vectors with no matching documents",
                    index.len()
                ),
            })
        }
    }

    fn replay(&self, replay: Replay) -> RetrievalResult<()> {
        let batch_count = replay.batches.len();
        let mut state = self.state.write();

        for (line, batch) in replay.batches {
            self.validate_batch(&batch.documents)
                .map_err(|e| JournalError::Corrupted {
                    line,
                    reason: format!("batch fails validation: {e}"),
                })?;
            state.apply(batch.documents, batch.recorded_at)?;
        }
        let documents = state.documents.count();
        drop(state);

        info!(
            batches = batch_count,
            documents,
            truncated_bytes = replay.truncated_bytes,
            "Replayed journal"
        );
        Ok(())
    }

    fn validate_batch(&self, documents: &[Document]) -> Result<(), crate::vector::VectorError> {
        for (position, document) in documents.iter().enumerate() {
            if let Err(e) = self.dimension.validate_vector(&document.embedding) {
                debug!(position, "Document failed embedding validation");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Adds a batch of documents, all-or-nothing.
    ///
    /// Every embedding is validated before either container is touched. With
    /// a journal attached the batch is made durable before it becomes visible.
    /// An empty batch is a no-op.
    pub fn ingest(&self, documents: Vec<Document>) -> RetrievalResult<IngestReceipt> {
        if documents.is_empty() {
            let total_documents = self.state.read().documents.count();
            debug!("Ignoring empty ingestion batch");
            return Ok(IngestReceipt {
                accepted: 0,
                ordinals: OrdinalRange::empty_at(Ordinal::from_index(total_documents)),
                total_documents,
            });
        }

        if let Err(e) = self.validate_batch(&documents) {
            warn!(batch = documents.len(), "Rejected ingestion batch: {e}");
            return Err(e.into());
        }

        let accepted = documents.len();
        let mut state = self.state.write();

        let recorded_at = match state.journal.as_mut() {
            Some(journal) => journal.append(&documents)?,
            None => Utc::now(),
        };
        let ordinals = state.apply(documents, recorded_at)?;
        let total_documents = state.documents.count();
        drop(state);

        info!(accepted, %ordinals, total_documents, "Added documents to vector store");
        Ok(IngestReceipt {
            accepted,
            ordinals,
            total_documents,
        })
    }

    /// Finds up to `top_k` documents nearest to `query` with `score >= threshold`.
    ///
    /// Results are ordered by descending score, equal scores by ascending
    /// ordinal. An empty result is normal when nothing clears the threshold.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> RetrievalResult<Vec<SearchHit>> {
        if threshold.is_nan() {
            return Err(RetrievalError::invalid_request("threshold must be a number"));
        }

        let state = self.state.read();
        let neighbors = state.index.query(query, top_k)?;
        let candidates = neighbors.len();

        let hits = score_and_filter(neighbors, threshold)
            .map(|(ordinal, score)| match state.documents.get(ordinal) {
                Ok(payload) => Ok(SearchHit {
                    text: payload.text.clone(),
                    metadata: payload.metadata.clone(),
                    score,
                }),
                Err(e) => {
                    error!(%ordinal, "Index returned an ordinal with no document: {e}");
                    Err(RetrievalError::InvariantViolation {
                        reason: e.to_string(),
                    })
                }
            })
            .collect::<RetrievalResult<Vec<_>>>()?;
        drop(state);

        debug!(top_k, threshold, candidates, kept = hits.len(), "Search completed");
        Ok(hits)
    }

    /// Dimension, document count and freshness, read under one shared lock.
    pub fn describe(&self) -> IndexInfo {
        let state = self.state.read();
        IndexInfo {
            dimension: self.dimension.get(),
            total_documents: state.documents.count(),
            last_updated: state.last_updated,
        }
    }

    /// Fixed dimension of the store.
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Number of stored documents.
    pub fn count(&self) -> usize {
        self.state.read().documents.count()
    }

    /// Sizes of the index and the document store observed together.
    pub fn counts(&self) -> StoreCounts {
        let state = self.state.read();
        StoreCounts {
            vectors: state.index.len(),
            documents: state.documents.count(),
        }
    }

    /// Whether accepted batches are written to a journal.
    pub fn is_journaled(&self) -> bool {
        self.state.read().journal.is_some()
    }
}
