//! Idempotent ingestion of bank transaction batches

pub mod importer;

pub use importer::*;
