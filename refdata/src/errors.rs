//! Error type for reference-data sources.

use thiserror::Error;

/// The unified error type for the `refdata` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An error originating from the upstream data vendor (API error,
    /// malformed payload, rate limit after retries were exhausted).
    #[error("provider error: {0}")]
    Provider(String),

    /// The source has no reference data for the requested ticker.
    #[error("no reference data for ticker {ticker}")]
    Missing {
        /// The ticker that was requested.
        ticker: String,
    },
}
