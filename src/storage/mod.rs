//! Document payload storage.
//!
//! Holds the text and metadata of every ingested document at the same
//! ordinal its embedding occupies in the vector index.

pub mod document;
pub mod error;

pub use document::{Document, DocumentStore, Metadata, Payload};
pub use error::{StorageError, StorageResult};
