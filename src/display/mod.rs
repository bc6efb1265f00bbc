//! Terminal rendering for CLI output.

pub mod tables;

pub use tables::{TableBuilder, create_hits_table, create_info_table, create_ingest_table};
