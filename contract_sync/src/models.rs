//! Diesel models mapping to the database schema.
//!
//! These types mirror the tables defined in the embedded migrations and in
//! [`crate::schema`]:
//! - [`crate::schema::exchange`] — configuration mirror seeded from TOML
//! - [`crate::schema::generic_future`] — logical "Nth nearest" instruments
//! - [`crate::schema::actual_contract`] — concrete dated contracts
//! - [`crate::schema::generic_contract_mapping`] — per-day generic -> contract history
//!
//! Date columns are TEXT ISO-8601; see [`crate::dates`] for round-trips.

use diesel::prelude::*;

use crate::schema::*;

/// A row in [`crate::schema::exchange`]: one configured exchange.
#[derive(Debug, Clone, Queryable, Identifiable, AsChangeset, Selectable)]
#[diesel(table_name = exchange, primary_key(code), check_for_backend(diesel::sqlite::Sqlite))]
pub struct Exchange {
    /// Normalized lowercase exchange code (primary key), e.g. "lme".
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Product prefix for dated tickers, e.g. "LP".
    pub prefix: String,
    /// Active months as an ascending CSV string, e.g. "1,3,5,7,9,12".
    pub active_months: String,
    /// Year-suffix digit count (1 or 2).
    pub year_digits: i32,
    /// Default rollover window in days.
    pub rollover_window: i32,
}

/// Insertable/changeset form of [`Exchange`].
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = exchange)]
pub struct NewExchange<'a> {
    /// Normalized lowercase exchange code.
    pub code: &'a str,
    /// Human-readable name.
    pub name: &'a str,
    /// Product prefix for dated tickers.
    pub prefix: &'a str,
    /// Active months as an ascending CSV string.
    pub active_months: &'a str,
    /// Year-suffix digit count (1 or 2).
    pub year_digits: i32,
    /// Default rollover window in days.
    pub rollover_window: i32,
}

/// A row in [`crate::schema::generic_future`].
///
/// (exchange_code, rank) is unique among active generics; rows are
/// deactivated, never deleted, once mapping history references them.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, AsChangeset, Selectable)]
#[diesel(table_name = generic_future, check_for_backend(diesel::sqlite::Sqlite))]
pub struct GenericFuture {
    /// Database primary key.
    pub id: i32,
    /// Exchange-qualified symbol, e.g. "LP1". Globally unique.
    pub ticker: String,
    /// FK to [`Exchange::code`].
    pub exchange_code: String,
    /// 1-indexed nearness rank.
    pub rank: i32,
    /// Commodity/metal identifier.
    pub metal: String,
    /// Whether this generic participates in daily runs.
    pub active: bool,
    /// Rollover window in days (resolved override or exchange default).
    pub rollover_window: i32,
    /// Cached last tradeable date of the currently mapped contract
    /// (ISO-8601), refreshed on every mapping upsert.
    pub last_maturity: Option<String>,
}

/// Insertable form of [`GenericFuture`] for config seeding.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = generic_future)]
pub struct NewGenericFuture<'a> {
    /// Exchange-qualified symbol.
    pub ticker: &'a str,
    /// FK to [`Exchange::code`].
    pub exchange_code: &'a str,
    /// 1-indexed nearness rank.
    pub rank: i32,
    /// Commodity/metal identifier.
    pub metal: &'a str,
    /// Whether this generic participates in daily runs.
    pub active: bool,
    /// Rollover window in days.
    pub rollover_window: i32,
}

/// A row in [`crate::schema::actual_contract`]: one dated contract.
///
/// Maturity-defining fields (contract year/month, last tradeable date) are
/// immutable after creation; only null `contract_size` / `tick_size` may be
/// back-filled.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = actual_contract, check_for_backend(diesel::sqlite::Sqlite))]
pub struct ActualContract {
    /// Database primary key.
    pub id: i32,
    /// Canonical dated ticker, e.g. "LPN5". Unique together with
    /// (exchange_code, contract_year) — the year column disambiguates
    /// single-digit decade collisions.
    pub ticker: String,
    /// FK to [`Exchange::code`].
    pub exchange_code: String,
    /// Commodity/metal identifier.
    pub metal: String,
    /// Authoritative 4-digit contract year.
    pub contract_year: i32,
    /// Contract month in [1, 12].
    pub contract_month: i32,
    /// Futures month letter, e.g. "N".
    pub month_code: String,
    /// First day of the contract month (ISO-8601).
    pub contract_month_start: String,
    /// Last tradeable date (ISO-8601), if known upstream.
    pub last_tradeable: Option<String>,
    /// Delivery date (ISO-8601), if known upstream.
    pub delivery: Option<String>,
    /// Contract size in lot units, if known upstream.
    pub contract_size: Option<f64>,
    /// Minimum price increment, if known upstream.
    pub tick_size: Option<f64>,
}

/// Insertable form of [`ActualContract`] for the registry's create path.
#[derive(Debug, Insertable)]
#[diesel(table_name = actual_contract)]
pub struct NewActualContract<'a> {
    /// Canonical dated ticker.
    pub ticker: &'a str,
    /// FK to [`Exchange::code`].
    pub exchange_code: &'a str,
    /// Commodity/metal identifier.
    pub metal: &'a str,
    /// Authoritative 4-digit contract year.
    pub contract_year: i32,
    /// Contract month in [1, 12].
    pub contract_month: i32,
    /// Futures month letter.
    pub month_code: &'a str,
    /// First day of the contract month (ISO-8601).
    pub contract_month_start: &'a str,
    /// Last tradeable date (ISO-8601).
    pub last_tradeable: Option<&'a str>,
    /// Delivery date (ISO-8601).
    pub delivery: Option<&'a str>,
    /// Contract size in lot units.
    pub contract_size: Option<f64>,
    /// Minimum price increment.
    pub tick_size: Option<f64>,
}

/// A row in [`crate::schema::generic_contract_mapping`].
///
/// Unique per (trade_date, generic_id). `days_to_expiry` is derived from
/// the contract's last tradeable date and recomputed on every rewrite,
/// never edited independently.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = generic_contract_mapping, check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(belongs_to(GenericFuture, foreign_key = generic_id))]
#[diesel(belongs_to(ActualContract, foreign_key = actual_contract_id))]
pub struct GenericContractMapping {
    /// Database primary key.
    pub id: i32,
    /// Trade date (ISO-8601).
    pub trade_date: String,
    /// FK to [`GenericFuture::id`].
    pub generic_id: i32,
    /// FK to [`ActualContract::id`].
    pub actual_contract_id: i32,
    /// `last_tradeable - trade_date` in calendar days; null when the
    /// contract's maturity is unknown.
    pub days_to_expiry: Option<i32>,
}

/// Insertable form of [`GenericContractMapping`].
#[derive(Debug, Insertable)]
#[diesel(table_name = generic_contract_mapping)]
pub struct NewGenericContractMapping<'a> {
    /// Trade date (ISO-8601).
    pub trade_date: &'a str,
    /// FK to [`GenericFuture::id`].
    pub generic_id: i32,
    /// FK to [`ActualContract::id`].
    pub actual_contract_id: i32,
    /// Derived days to expiry, if the maturity is known.
    pub days_to_expiry: Option<i32>,
}
