use crate::storage::{StorageError, StorageResult};
use crate::vector::{Ordinal, OrdinalRange};
use serde::{Deserialize, Serialize};

/// Open key/value metadata attached to a document. Stored and returned unchanged.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A document as submitted for ingestion: payload plus its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Metadata, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            metadata,
            embedding,
        }
    }

    /// Splits the document into the embedding (for the index) and the payload (for the store).
    pub fn into_parts(self) -> (Vec<f32>, Payload) {
        (
            self.embedding,
            Payload {
                text: self.text,
                metadata: self.metadata,
            },
        )
    }
}

/// The part of a document the store keeps: text and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub text: String,
    pub metadata: Metadata,
}

/// Append-only payload storage addressed by ordinal.
///
/// Grows only through [`DocumentStore::append_batch`], which must be paired
/// with the index insertion of the same batch.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    payloads: Vec<Payload>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends payloads in order and returns the ordinals they now occupy.
    pub fn append_batch(&mut self, payloads: Vec<Payload>) -> OrdinalRange {
        let range = OrdinalRange::starting_at(Ordinal::from_index(self.payloads.len()), payloads.len());
        self.payloads.extend(payloads);
        range
    }

    pub fn get(&self, ordinal: Ordinal) -> StorageResult<&Payload> {
        self.payloads
            .get(ordinal.as_index())
            .ok_or(StorageError::OutOfRange {
                ordinal,
                count: self.payloads.len(),
            })
    }

    pub fn count(&self) -> usize {
        self.payloads.len()
    }
}
