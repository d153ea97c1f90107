//! Actual-contract registry: get-or-create of dated contracts.
//!
//! Contracts are created lazily the first time any generic resolves to
//! them. The create path is insert-if-absent under the table's unique
//! constraint followed by a re-read ("create, catch-duplicate, re-fetch"),
//! never test-then-insert, so two job processes racing on the same code
//! cannot produce two rows. Once created, a contract's maturity-defining
//! fields are immutable; only null contract_size / tick_size are
//! back-filled ("fill but never overwrite").
//!
//! Every lookup filters by (exchange_code, ticker, contract_year). The year
//! filter matters: with the single-digit year policy, "LPX5" names both
//! Nov-2025 and Nov-2035, and the `contract_year` column is what keeps the
//! two apart.

use std::collections::HashMap;

use chrono::NaiveDate;
use diesel::prelude::*;
use refdata::models::ContractRefData;

use crate::codegen;
use crate::dates;
use crate::errors::{MappingError, Result};
use crate::models::{ActualContract, NewActualContract};
use crate::resolver::ContractMonthYear;
use crate::schema::actual_contract;

/// Run-scoped cache of resolved contract ids.
///
/// Constructor-injected into the call graph and dropped with the batch run;
/// never a module-level singleton, so a long-running service cannot observe
/// stale entries across runs.
#[derive(Debug, Default)]
pub struct ContractCache {
    ids: HashMap<(String, String, i32), i32>,
}

impl ContractCache {
    /// An empty cache for one batch run.
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, exchange: &str, ticker: &str, year: i32) -> Option<i32> {
        self.ids.get(&(exchange.to_string(), ticker.to_string(), year)).copied()
    }

    fn put(&mut self, exchange: &str, ticker: &str, year: i32, id: i32) {
        self.ids.insert((exchange.to_string(), ticker.to_string(), year), id);
    }

    /// Number of cached contract ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Everything the registry needs to create a contract row.
#[derive(Debug, Clone)]
pub struct ContractSpec<'a> {
    /// Canonical dated ticker from the code generator.
    pub ticker: &'a str,
    /// Owning exchange code.
    pub exchange_code: &'a str,
    /// Commodity/metal identifier.
    pub metal: &'a str,
    /// Resolved contract month.
    pub month: ContractMonthYear,
    /// Upstream maturity attributes, when available.
    pub maturity: Option<&'a ContractRefData>,
}

/// Look up a contract by its identifying triple.
pub fn find_contract(
    conn: &mut SqliteConnection,
    exchange_code: &str,
    ticker: &str,
    contract_year: i32,
) -> Result<Option<ActualContract>> {
    let row = actual_contract::table
        .filter(actual_contract::exchange_code.eq(exchange_code))
        .filter(actual_contract::ticker.eq(ticker))
        .filter(actual_contract::contract_year.eq(contract_year))
        .select(ActualContract::as_select())
        .first(conn)
        .optional()?;
    Ok(row)
}

/// Load a contract row by primary key.
pub fn contract_by_id(conn: &mut SqliteConnection, id: i32) -> Result<ActualContract> {
    Ok(actual_contract::table
        .find(id)
        .select(ActualContract::as_select())
        .first(conn)?)
}

/// Get or create the dated contract described by `spec`, returning its id.
///
/// On a hit, the supplied maturity attributes are ignored except to
/// back-fill previously-null contract_size / tick_size. On a miss, the row
/// is inserted with `on_conflict do_nothing` and re-read, so a duplicate
/// insert racing from another process degrades into a plain lookup.
/// Storage failures propagate untouched; retry policy belongs to the
/// caller.
pub fn get_or_create_actual_contract(
    conn: &mut SqliteConnection,
    cache: &mut ContractCache,
    spec: &ContractSpec<'_>,
) -> Result<i32> {
    if let Some(id) = cache.get(spec.exchange_code, spec.ticker, spec.month.year) {
        return Ok(id);
    }

    if let Some(existing) = find_contract(conn, spec.exchange_code, spec.ticker, spec.month.year)? {
        backfill_optional_fields(conn, &existing, spec.maturity)?;
        cache.put(spec.exchange_code, spec.ticker, spec.month.year, existing.id);
        return Ok(existing.id);
    }

    let month_start = spec
        .month
        .first_day()
        .ok_or(MappingError::InvalidMonth {
            month: spec.month.month,
        })?;
    let month_letter = codegen::month_code(spec.month.month)?.to_string();
    let month_start_s = dates::to_db(month_start);
    let last_tradeable_s = spec.maturity.and_then(|m| m.last_tradeable).map(dates::to_db);
    let delivery_s = spec.maturity.and_then(|m| m.delivery).map(dates::to_db);

    let row = NewActualContract {
        ticker: spec.ticker,
        exchange_code: spec.exchange_code,
        metal: spec.metal,
        contract_year: spec.month.year,
        contract_month: spec.month.month as i32,
        month_code: &month_letter,
        contract_month_start: &month_start_s,
        last_tradeable: last_tradeable_s.as_deref(),
        delivery: delivery_s.as_deref(),
        contract_size: spec.maturity.and_then(|m| m.contract_size),
        tick_size: spec.maturity.and_then(|m| m.tick_size),
    };

    diesel::insert_into(actual_contract::table)
        .values(&row)
        .on_conflict((
            actual_contract::exchange_code,
            actual_contract::ticker,
            actual_contract::contract_year,
        ))
        .do_nothing()
        .execute(conn)?;

    // Re-read: either our insert landed or a concurrent writer won the
    // race. Both end at the same row.
    let created = find_contract(conn, spec.exchange_code, spec.ticker, spec.month.year)?
        .ok_or(diesel::result::Error::NotFound)?;
    cache.put(spec.exchange_code, spec.ticker, spec.month.year, created.id);
    Ok(created.id)
}

/// Fill null contract_size / tick_size from late-arriving reference data.
/// Existing non-null values are never overwritten.
fn backfill_optional_fields(
    conn: &mut SqliteConnection,
    existing: &ActualContract,
    maturity: Option<&ContractRefData>,
) -> Result<()> {
    let Some(m) = maturity else { return Ok(()) };

    if existing.contract_size.is_none()
        && let Some(size) = m.contract_size
    {
        diesel::update(
            actual_contract::table
                .find(existing.id)
                .filter(actual_contract::contract_size.is_null()),
        )
        .set(actual_contract::contract_size.eq(size))
        .execute(conn)?;
    }

    if existing.tick_size.is_none()
        && let Some(tick) = m.tick_size
    {
        diesel::update(
            actual_contract::table
                .find(existing.id)
                .filter(actual_contract::tick_size.is_null()),
        )
        .set(actual_contract::tick_size.eq(tick))
        .execute(conn)?;
    }

    Ok(())
}

/// Parse a contract's last tradeable date, if stored.
pub fn last_tradeable_date(contract: &ActualContract) -> Result<Option<NaiveDate>> {
    contract
        .last_tradeable
        .as_deref()
        .map(dates::from_db)
        .transpose()
}
