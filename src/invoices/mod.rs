//! Invoice administration

pub mod invoice;

pub use invoice::*;
