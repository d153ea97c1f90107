//! Reference-data boundary for the contract mapping engine.
//!
//! This crate owns the models and the provider abstraction for per-ticker
//! futures reference attributes (current contract code, maturity dates,
//! contract size, tick size). The mapping engine consumes
//! [`providers::ReferenceDataSource`] and never talks to a vendor API
//! directly; retry policy lives here, behind
//! [`providers::RetryingSource`], not in the engine.

#![deny(missing_docs)]

pub mod errors;
pub mod models;
pub mod providers;

pub use errors::Error;
