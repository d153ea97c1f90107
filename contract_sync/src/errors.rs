//! Error taxonomy for the mapping engine.
//!
//! Configuration-class errors ([`MappingError::UnknownExchange`],
//! [`MappingError::InsufficientActiveMonths`]) indicate a setup bug and abort
//! a batch run; per-generic data errors are collected into the run report
//! instead. [`MappingError::Persistence`] wraps storage failures untouched —
//! retry policy belongs to the caller, not to the registry or the mapping
//! manager.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the contract mapping engine.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Calendar month outside [1, 12].
    #[error("invalid calendar month: {month}")]
    InvalidMonth {
        /// The offending month value.
        month: u32,
    },

    /// Calendar year outside the supported 4-digit range.
    #[error("invalid calendar year: {year}")]
    InvalidYear {
        /// The offending year value.
        year: i32,
    },

    /// Generic rank must be 1-indexed.
    #[error("generic rank must be >= 1, got {rank}")]
    InvalidRank {
        /// The offending rank value.
        rank: u32,
    },

    /// The exchange code has no configuration entry.
    #[error("unknown exchange: {code}")]
    UnknownExchange {
        /// The unconfigured exchange code.
        code: String,
    },

    /// Malformed exchange configuration: zero active months.
    #[error("exchange {code} has no active months configured")]
    InsufficientActiveMonths {
        /// The misconfigured exchange code.
        code: String,
    },

    /// No active generic exists at the requested (exchange, rank).
    #[error("no active generic on exchange {exchange} at rank {rank}")]
    GenericNotFound {
        /// The exchange code.
        exchange: String,
        /// The requested nearness rank.
        rank: u32,
    },

    /// Strict mapping lookup found no row.
    #[error("no mapping for generic {generic_id} on {trade_date}")]
    MappingNotFound {
        /// The generic instrument id.
        generic_id: i32,
        /// The requested trade date.
        trade_date: NaiveDate,
    },

    /// A date column held a value that does not parse as ISO-8601.
    #[error("unparseable date in storage: {raw}")]
    BadStoredDate {
        /// The raw column value.
        raw: String,
    },

    /// Storage failure, propagated untouched.
    #[error("storage error")]
    Persistence(#[from] diesel::result::Error),
}

impl MappingError {
    /// True for errors that indicate a configuration/setup bug affecting
    /// every generic on the exchange, which must abort a batch run rather
    /// than be skipped.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MappingError::UnknownExchange { .. } | MappingError::InsufficientActiveMonths { .. }
        )
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, MappingError>;
