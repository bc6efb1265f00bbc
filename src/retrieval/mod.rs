//! Query pipeline: the only component that touches both the vector index and
//! the document store.
//!
//! Ingestion validates a batch before writing it to both containers under one
//! exclusive lock. Search converts distances to similarity scores
//! (`1 / (1 + distance)`), joins payloads by ordinal and drops anything below
//! the caller's threshold.

mod hit;
mod pipeline;

pub use hit::SearchHit;
pub use pipeline::{IndexInfo, IngestReceipt, RetrievalPipeline, StoreCounts};
