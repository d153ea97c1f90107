//! Source abstraction for futures reference data.
//!
//! [`ReferenceDataSource`] is the unified interface the mapping engine uses
//! to look up per-ticker reference attributes. Concrete vendor clients
//! implement it behind their own crates; this crate ships two
//! implementations:
//!
//! - [`FixtureSource`] — an in-memory map, used by tests and offline
//!   backfills that replay previously captured vendor snapshots.
//! - [`RetryingSource`] — a decorator adding bounded attempts with a fixed
//!   backoff. Side-effect-free lookups are safe to retry here; the engine
//!   itself never retries.
//!
//! The trait is async and object-safe (`dyn ReferenceDataSource`) so the
//! engine can select a source at runtime.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Error;
use crate::models::ContractRefData;

/// Trait for fetching per-ticker reference data from a vendor.
#[async_trait]
pub trait ReferenceDataSource {
    /// Look up the reference attributes for `ticker` as of `as_of`.
    ///
    /// Returns [`Error::Missing`] when the source knows nothing about the
    /// ticker, [`Error::Provider`] for vendor-side failures.
    async fn contract_reference(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<ContractRefData, Error>;
}

/// In-memory source backed by a ticker -> record map.
#[derive(Debug, Default, Clone)]
pub struct FixtureSource {
    entries: HashMap<String, ContractRefData>,
}

impl FixtureSource {
    /// An empty source; every lookup returns [`Error::Missing`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of one ticker's record.
    pub fn with_entry(mut self, ticker: impl Into<String>, data: ContractRefData) -> Self {
        self.entries.insert(ticker.into(), data);
        self
    }

    /// Insert or replace one ticker's record.
    pub fn insert(&mut self, ticker: impl Into<String>, data: ContractRefData) {
        self.entries.insert(ticker.into(), data);
    }
}

#[async_trait]
impl ReferenceDataSource for FixtureSource {
    async fn contract_reference(
        &self,
        ticker: &str,
        _as_of: NaiveDate,
    ) -> Result<ContractRefData, Error> {
        self.entries.get(ticker).cloned().ok_or_else(|| Error::Missing {
            ticker: ticker.to_string(),
        })
    }
}

/// Decorator adding bounded retries with a fixed backoff to any source.
///
/// Only [`Error::Provider`] failures are retried; [`Error::Missing`] is a
/// definitive answer and surfaces immediately.
pub struct RetryingSource<S> {
    inner: S,
    attempts: u32,
    backoff: Duration,
}

impl<S> RetryingSource<S> {
    /// Wrap `inner`, retrying failed lookups up to `attempts` total tries
    /// with `backoff` between them.
    pub fn new(inner: S, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }
}

#[async_trait]
impl<S> ReferenceDataSource for RetryingSource<S>
where
    S: ReferenceDataSource + Send + Sync,
{
    async fn contract_reference(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<ContractRefData, Error> {
        let mut last_err = None;
        for attempt in 1..=self.attempts {
            match self.inner.contract_reference(ticker, as_of).await {
                Ok(data) => return Ok(data),
                Err(e @ Error::Missing { .. }) => return Err(e),
                Err(e) => {
                    tracing::debug!(ticker, attempt, error = %e, "reference lookup failed");
                    last_err = Some(e);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Provider("no attempts made".into())))
    }
}
