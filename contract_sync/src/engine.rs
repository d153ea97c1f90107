//! Batch orchestration: resolve, register, and map generics for one date.
//!
//! [`resolve_and_map`] is the composition surface price-ingestion callers
//! use; [`run_date`] drives a whole trading day. Reference data is fetched
//! concurrently (bounded, to respect upstream rate limits); database writes
//! then run sequentially on the single connection. One generic failing
//! never aborts its siblings — the run ends with a partial-success report —
//! but configuration-class errors abort immediately, since they affect
//! every generic on the exchange.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use diesel::prelude::*;
use futures::stream::{self, StreamExt};
use refdata::models::ContractRefData;
use refdata::providers::ReferenceDataSource;

use crate::codegen;
use crate::config::Exchanges;
use crate::errors::{MappingError, Result};
use crate::mapping;
use crate::models::{GenericContractMapping, GenericFuture};
use crate::registry::{self, ContractCache, ContractSpec};
use crate::resolver;
use crate::rollover::{self, RolloverDecision};
use crate::schema::generic_future;

/// Share of failed generics above which the run report is flagged for
/// operator attention.
pub const HIGH_FAILURE_RATE: f64 = 0.10;

/// Outcome of mapping one generic on one trade date.
#[derive(Debug, Clone)]
pub struct MappingOutcome {
    /// The generic's ticker.
    pub generic_ticker: String,
    /// The dated contract it resolved to.
    pub contract_ticker: String,
    /// The stored mapping row.
    pub mapping: GenericContractMapping,
    /// Rollover urgency derived from the fresh mapping.
    pub decision: RolloverDecision,
}

/// A generic that could not be mapped, with the reason.
#[derive(Debug, Clone)]
pub struct FailedGeneric {
    /// The generic's ticker.
    pub ticker: String,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Partial-success report for one trade date.
#[derive(Debug, Default)]
pub struct DateRunReport {
    /// Successfully mapped generics.
    pub succeeded: Vec<MappingOutcome>,
    /// Generics that failed, with reasons.
    pub failed: Vec<FailedGeneric>,
}

impl DateRunReport {
    /// Fraction of processed generics that failed (0.0 when none ran).
    pub fn failure_rate(&self) -> f64 {
        let total = self.succeeded.len() + self.failed.len();
        if total == 0 {
            0.0
        } else {
            self.failed.len() as f64 / total as f64
        }
    }

    /// True when the failure rate crosses [`HIGH_FAILURE_RATE`].
    pub fn needs_attention(&self) -> bool {
        !self.failed.is_empty() && self.failure_rate() > HIGH_FAILURE_RATE
    }
}

impl fmt::Display for DateRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.succeeded.is_empty() && self.failed.is_empty() {
            return write!(f, "No generics processed");
        }
        if !self.succeeded.is_empty() {
            writeln!(f, "Mapped ({})", self.succeeded.len())?;
            for o in &self.succeeded {
                let dte = match o.mapping.days_to_expiry {
                    Some(d) => d.to_string(),
                    None => "?".to_string(),
                };
                writeln!(
                    f,
                    "+ {}  {}  dte={}  roll={}",
                    o.generic_ticker, o.contract_ticker, dte, o.decision
                )?;
            }
        }
        if !self.failed.is_empty() {
            if !self.succeeded.is_empty() {
                writeln!(f)?;
            }
            writeln!(f, "Failed ({})", self.failed.len())?;
            for fg in &self.failed {
                writeln!(f, "- {}: {}", fg.ticker, fg.reason)?;
            }
        }
        Ok(())
    }
}

/// Resolve `generic` for `trade_date`, get-or-create the contract, and
/// upsert the day's mapping.
///
/// `maturity` carries the upstream reference attributes when the caller
/// fetched them; `None` degrades to a mapping with unknown days-to-expiry.
pub fn resolve_and_map(
    conn: &mut SqliteConnection,
    cache: &mut ContractCache,
    config: &Exchanges,
    generic: &GenericFuture,
    trade_date: NaiveDate,
    maturity: Option<&ContractRefData>,
) -> Result<MappingOutcome> {
    let cfg = config.exchange(&generic.exchange_code)?;
    let month = resolver::resolve(cfg, &generic.exchange_code, generic.rank as u32, trade_date)?;
    let ticker = codegen::contract_code(&cfg.prefix, month.month, month.year, cfg.year_policy()?)?;

    if let Some(m) = maturity
        && m.contract_code != ticker
    {
        // Vendor disagreement is informational: our resolution is the
        // authority for which month the generic points at.
        tracing::debug!(
            generic = %generic.ticker,
            vendor = %m.contract_code,
            resolved = %ticker,
            "vendor contract code differs from resolved code"
        );
    }

    let spec = ContractSpec {
        ticker: &ticker,
        exchange_code: &generic.exchange_code,
        metal: &generic.metal,
        month,
        maturity,
    };
    let contract_id = registry::get_or_create_actual_contract(conn, cache, &spec)?;
    let stored = mapping::upsert_mapping(conn, trade_date, generic.id, contract_id)?;

    let decision = match stored.days_to_expiry {
        Some(dte) => rollover::classify(dte, generic.rollover_window),
        None => RolloverDecision::Immediate,
    };

    Ok(MappingOutcome {
        generic_ticker: generic.ticker.clone(),
        contract_ticker: ticker,
        mapping: stored,
        decision,
    })
}

/// Resolve-and-map by (exchange, rank): the surface exposed to
/// price-ingestion callers that do not hold a [`GenericFuture`] row.
/// Returns the mapped actual contract id.
pub fn resolve_and_map_rank(
    conn: &mut SqliteConnection,
    cache: &mut ContractCache,
    config: &Exchanges,
    exchange_code: &str,
    rank: u32,
    trade_date: NaiveDate,
) -> Result<i32> {
    let generic = generic_future::table
        .filter(generic_future::exchange_code.eq(exchange_code))
        .filter(generic_future::rank.eq(rank as i32))
        .filter(generic_future::active.eq(true))
        .select(GenericFuture::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| MappingError::GenericNotFound {
            exchange: exchange_code.to_string(),
            rank,
        })?;

    let outcome = resolve_and_map(conn, cache, config, &generic, trade_date, None)?;
    Ok(outcome.mapping.actual_contract_id)
}

/// Process one trading day across every active generic.
///
/// Phase 1 fetches reference data for all generics with at most
/// `concurrency` in-flight lookups. Phase 2 resolves and upserts
/// sequentially. A vendor lookup failure degrades that generic to an
/// unknown-maturity mapping; a resolution or storage failure is collected
/// into the report; a configuration-class error aborts the run.
pub async fn run_date(
    conn: &mut SqliteConnection,
    config: &Exchanges,
    trade_date: NaiveDate,
    source: &(dyn ReferenceDataSource + Sync),
    concurrency: usize,
) -> Result<DateRunReport> {
    let generics = mapping::active_generics(conn)?;

    // Config-class validation up front: an unconfigured exchange is a
    // setup bug affecting all of its generics, not a data blip.
    for g in &generics {
        let cfg = config.exchange(&g.exchange_code)?;
        if cfg.active_months.is_empty() {
            return Err(MappingError::InsufficientActiveMonths {
                code: g.exchange_code.clone(),
            });
        }
    }

    let refdata_by_id: HashMap<i32, std::result::Result<ContractRefData, refdata::Error>> =
        stream::iter(generics.iter().map(|g| {
            let ticker = g.ticker.clone();
            let id = g.id;
            async move { (id, source.contract_reference(&ticker, trade_date).await) }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut cache = ContractCache::new();
    let mut report = DateRunReport::default();

    for generic in &generics {
        let maturity = match refdata_by_id.get(&generic.id) {
            Some(Ok(data)) => Some(data),
            Some(Err(e)) => {
                tracing::warn!(
                    generic = %generic.ticker,
                    error = %e,
                    "no reference data; mapping with unknown maturity"
                );
                None
            }
            None => None,
        };

        match resolve_and_map(conn, &mut cache, config, generic, trade_date, maturity) {
            Ok(outcome) => report.succeeded.push(outcome),
            Err(e) if e.is_config_error() => return Err(e),
            Err(e) => {
                tracing::warn!(generic = %generic.ticker, error = %e, "mapping failed");
                report.failed.push(FailedGeneric {
                    ticker: generic.ticker.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if report.needs_attention() {
        tracing::warn!(
            trade_date = %trade_date,
            failed = report.failed.len(),
            rate = report.failure_rate(),
            "high mapping failure rate; operator attention required"
        );
    } else {
        tracing::info!(
            trade_date = %trade_date,
            mapped = report.succeeded.len(),
            failed = report.failed.len(),
            "date run complete"
        );
    }

    Ok(report)
}
