//! Database utilities for connections and schema migrations.
//!
//! - [`connection::connect_sqlite`] opens a connection with WAL,
//!   foreign_keys=ON, and a 5000ms busy_timeout.
//! - [`migrate::run_sqlite`] applies the embedded diesel migrations.
//!
//! The batch job may run as multiple OS processes against the same file;
//! the PRAGMAs plus the schema's unique constraints are what make
//! concurrent get-or-create and upsert safe (no in-process mutex).

pub mod connection;
pub mod migrate;
