//! Mapping table manager: the (trade date, generic) -> contract history.
//!
//! `days_to_expiry` is always derived from the mapped contract's last
//! tradeable date at write time; it is recomputed whenever the row is
//! rewritten and never edited independently. A same-day upsert may rewrite
//! the row (correcting a mapping before end-of-day finalization); past
//! days' rows are frozen by convention — corrections go through
//! [`delete_mappings_for_date`] plus a re-run, not in-place edits.

use chrono::NaiveDate;
use diesel::prelude::*;

use crate::dates;
use crate::errors::{MappingError, Result};
use crate::models::{GenericContractMapping, GenericFuture, NewGenericContractMapping};
use crate::registry;
use crate::schema::{actual_contract, generic_contract_mapping, generic_future};

/// Insert or rewrite the mapping for (trade_date, generic_id).
///
/// Computes `days_to_expiry` from the contract's last tradeable date (null
/// when maturity is unknown — no heuristic estimate) and refreshes the
/// generic's cached maturity date. Upserts under the
/// UNIQUE(trade_date, generic_id) constraint, so re-running a batch date is
/// idempotent and concurrent writers cannot duplicate a row.
pub fn upsert_mapping(
    conn: &mut SqliteConnection,
    trade_date: NaiveDate,
    generic_id: i32,
    actual_contract_id: i32,
) -> Result<GenericContractMapping> {
    let contract = registry::contract_by_id(conn, actual_contract_id)?;
    let last_tradeable = registry::last_tradeable_date(&contract)?;
    let days_to_expiry =
        last_tradeable.map(|ltd| dates::days_between(trade_date, ltd) as i32);

    let date_s = dates::to_db(trade_date);
    let row = NewGenericContractMapping {
        trade_date: &date_s,
        generic_id,
        actual_contract_id,
        days_to_expiry,
    };

    diesel::insert_into(generic_contract_mapping::table)
        .values(&row)
        .on_conflict((
            generic_contract_mapping::trade_date,
            generic_contract_mapping::generic_id,
        ))
        .do_update()
        .set((
            generic_contract_mapping::actual_contract_id.eq(actual_contract_id),
            generic_contract_mapping::days_to_expiry.eq(days_to_expiry),
        ))
        .execute(conn)?;

    // Maturity cache refresh is the one mutation generics see after setup.
    diesel::update(generic_future::table.find(generic_id))
        .set(generic_future::last_maturity.eq(contract.last_tradeable.as_deref()))
        .execute(conn)?;

    let stored = generic_contract_mapping::table
        .filter(generic_contract_mapping::trade_date.eq(&date_s))
        .filter(generic_contract_mapping::generic_id.eq(generic_id))
        .select(GenericContractMapping::as_select())
        .first(conn)?;
    Ok(stored)
}

/// The mapped contract id for (generic_id, trade_date), or `None` when no
/// mapping exists — a normal state for future dates and newly added
/// generics.
pub fn get_actual_contract_id(
    conn: &mut SqliteConnection,
    generic_id: i32,
    trade_date: NaiveDate,
) -> Result<Option<i32>> {
    let id = generic_contract_mapping::table
        .filter(generic_contract_mapping::trade_date.eq(dates::to_db(trade_date)))
        .filter(generic_contract_mapping::generic_id.eq(generic_id))
        .select(generic_contract_mapping::actual_contract_id)
        .first::<i32>(conn)
        .optional()?;
    Ok(id)
}

/// Strict variant of [`get_actual_contract_id`]: a missing mapping is a
/// [`MappingError::MappingNotFound`].
pub fn get_actual_contract_id_strict(
    conn: &mut SqliteConnection,
    generic_id: i32,
    trade_date: NaiveDate,
) -> Result<i32> {
    get_actual_contract_id(conn, generic_id, trade_date)?.ok_or(MappingError::MappingNotFound {
        generic_id,
        trade_date,
    })
}

/// The latest mapping with trade_date <= `as_of`, if any.
///
/// ISO dates sort lexicographically, so the TEXT comparison below orders
/// chronologically.
pub fn latest_mapping(
    conn: &mut SqliteConnection,
    generic_id: i32,
    as_of: NaiveDate,
) -> Result<Option<GenericContractMapping>> {
    let row = generic_contract_mapping::table
        .filter(generic_contract_mapping::generic_id.eq(generic_id))
        .filter(generic_contract_mapping::trade_date.le(dates::to_db(as_of)))
        .order(generic_contract_mapping::trade_date.desc())
        .select(GenericContractMapping::as_select())
        .first(conn)
        .optional()?;
    Ok(row)
}

/// Delete every mapping row for one trade date.
///
/// This is the correction workflow for a bad day: drop the day's rows and
/// re-run the batch (idempotent upserts make the re-run safe). Returns the
/// number of rows removed.
pub fn delete_mappings_for_date(conn: &mut SqliteConnection, trade_date: NaiveDate) -> Result<usize> {
    let n = diesel::delete(
        generic_contract_mapping::table
            .filter(generic_contract_mapping::trade_date.eq(dates::to_db(trade_date))),
    )
    .execute(conn)?;
    Ok(n)
}

/// One line of the current-positions report: an active generic, its latest
/// mapping, and the mapped contract's ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRow {
    /// The generic instrument.
    pub generic: GenericFuture,
    /// Trade date of the latest mapping (ISO-8601).
    pub trade_date: String,
    /// Canonical ticker of the mapped contract.
    pub contract_ticker: String,
    /// Derived days to expiry as of that trade date.
    pub days_to_expiry: Option<i32>,
}

/// For each active generic: its latest mapping on or before `as_of`,
/// joined to the mapped contract. Generics with no mapping yet are
/// omitted.
///
/// Serves both the rollover detector's "what is the latest mapping"
/// lookup (per generic) and the operator report.
pub fn current_positions(
    conn: &mut SqliteConnection,
    as_of: NaiveDate,
) -> Result<Vec<PositionRow>> {
    let generics = active_generics(conn)?;

    let mut rows = Vec::with_capacity(generics.len());
    for generic in generics {
        let Some(mapping) = latest_mapping(conn, generic.id, as_of)? else {
            continue;
        };
        let ticker = actual_contract::table
            .find(mapping.actual_contract_id)
            .select(actual_contract::ticker)
            .first::<String>(conn)?;
        rows.push(PositionRow {
            generic,
            trade_date: mapping.trade_date,
            contract_ticker: ticker,
            days_to_expiry: mapping.days_to_expiry,
        });
    }
    Ok(rows)
}

/// All active generics, ordered by exchange then rank.
pub fn active_generics(conn: &mut SqliteConnection) -> Result<Vec<GenericFuture>> {
    Ok(generic_future::table
        .filter(generic_future::active.eq(true))
        .order((generic_future::exchange_code.asc(), generic_future::rank.asc()))
        .select(GenericFuture::as_select())
        .load(conn)?)
}
