//! Generic-to-actual futures contract mapping and rollover engine.
//!
//! Resolves which dated contract an "Nth nearest month" generic ticker
//! points to on any trade date, registers dated contracts lazily, maintains
//! the historical (trade date, generic) -> contract mapping table, and
//! classifies rollover urgency. Reference data comes from the `refdata`
//! collaborator; persistence is SQLite via diesel.

#![deny(missing_docs)]

pub mod codegen;
pub mod config;
pub mod dates;
pub mod db;
pub mod engine;
pub mod errors;
pub mod mapping;
pub mod models;
pub mod registry;
pub mod resolver;
pub mod rollover;
#[allow(missing_docs)] // diesel `table!` expansion
pub mod schema;
pub mod sync;
