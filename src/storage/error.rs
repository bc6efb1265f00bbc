use crate::vector::Ordinal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Document not found at ordinal {ordinal}: store holds {count} documents")]
    OutOfRange { ordinal: Ordinal, count: usize },
}

pub type StorageResult<T> = Result<T, StorageError>;
