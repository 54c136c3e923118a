//! Tenant administration

pub mod tenant;

pub use tenant::*;
