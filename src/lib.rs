//! In-memory vector similarity retrieval.
//!
//! Documents (text, metadata, embedding) are ingested in batches into an
//! exact flat index and a parallel document store that share ordinals.
//! Searches return the nearest documents by squared Euclidean distance,
//! scored as `1 / (1 + distance)` and filtered by a similarity threshold.

pub mod config;
pub mod display;
pub mod error;
pub mod journal;
pub mod logging;
pub mod retrieval;
#[cfg(feature = "http-server")]
pub mod server;
pub mod storage;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use error::{RetrievalError, RetrievalResult};
pub use journal::{BatchJournal, JournalError};
pub use retrieval::{IndexInfo, IngestReceipt, RetrievalPipeline, SearchHit, StoreCounts};
pub use storage::{Document, DocumentStore, Metadata, Payload, StorageError};
pub use vector::{
    FlatIndex, Neighbor, Ordinal, OrdinalRange, Score, VectorDimension, VectorError, VectorIndex,
};
