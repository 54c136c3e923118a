//! Reconciliation of invoices against bank transactions
//!
//! Contains the deterministic scoring heuristic, the tenant-wide proposal
//! engine, the match confirmation lifecycle, and explanation assembly.

pub mod confirm;
pub mod core;
pub mod engine;
pub mod explain;
pub mod scoring;

pub use confirm::*;
pub use core::*;
pub use engine::*;
pub use explain::*;
pub use scoring::*;
