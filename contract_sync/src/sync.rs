//! Exchange configuration synchronization into SQLite.
//!
//! ## What this does
//! - Takes a normalized [`Exchanges`](crate::config::Exchanges) file.
//! - Computes a **diff** between the file (desired) and the DB (current).
//! - Applies the diff with idempotent UPSERTs inside a single
//!   `BEGIN IMMEDIATE` transaction.
//!
//! ## Deactivation, not deletion
//! A generic that disappears from the file is marked inactive, never
//! deleted: mapping history references it through an `ON DELETE RESTRICT`
//! foreign key, and deleting would orphan that history. Exchanges are never
//! pruned for the same reason.
//!
//! ## Dry-run
//! With `SyncOptions::dry_run`, the structured [`ExchangeDiff`] is returned
//! and nothing is written. The diff has a `Display` impl for operator
//! output.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use diesel::prelude::*;

use crate::config::Exchanges;
use crate::models::{Exchange, GenericFuture, NewExchange, NewGenericFuture};
use crate::schema::{exchange, generic_future};

/// Options for configuration synchronization.
pub struct SyncOptions {
    /// If true, compute the diff only and write nothing.
    pub dry_run: bool,
}

/// What needs to change to make the DB match the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeDiff {
    /// Exchange codes whose rows are created or updated.
    pub exchanges_upsert: BTreeSet<String>,
    /// Generic tickers whose rows are created or updated (including
    /// re-activation).
    pub generics_upsert: BTreeSet<String>,
    /// Active generic tickers in the DB that the file no longer lists.
    pub generics_deactivate: BTreeSet<String>,
}

impl ExchangeDiff {
    /// True if there is nothing to write.
    pub fn is_noop(&self) -> bool {
        self.exchanges_upsert.is_empty()
            && self.generics_upsert.is_empty()
            && self.generics_deactivate.is_empty()
    }
}

impl fmt::Display for ExchangeDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote_any = false;
        let mut section = |title: &str,
                           items: &BTreeSet<String>,
                           sign: char,
                           f: &mut fmt::Formatter<'_>|
         -> fmt::Result {
            if items.is_empty() {
                return Ok(());
            }
            if wrote_any {
                writeln!(f)?;
            }
            writeln!(f, "{title}")?;
            for _ in 0..title.len() {
                write!(f, "-")?;
            }
            writeln!(f)?;
            for item in items {
                writeln!(f, "{sign} {item}")?;
            }
            wrote_any = true;
            Ok(())
        };

        section("Exchanges (UPSERT)", &self.exchanges_upsert, '+', f)?;
        section("Generics (UPSERT)", &self.generics_upsert, '+', f)?;
        section("Generics (DEACTIVATE)", &self.generics_deactivate, '-', f)?;

        if !wrote_any {
            write!(f, "No changes")
        } else {
            Ok(())
        }
    }
}

/// Encode an active-month set as the ascending CSV the `exchange` table
/// stores.
pub fn months_csv(months: &[u32]) -> String {
    months
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

struct Current {
    exchanges: BTreeMap<String, Exchange>,
    generics: BTreeMap<String, GenericFuture>,
}

fn read_current(conn: &mut SqliteConnection) -> anyhow::Result<Current> {
    let exchanges = exchange::table
        .select(Exchange::as_select())
        .load(conn)?
        .into_iter()
        .map(|e| (e.code.clone(), e))
        .collect();

    let generics = generic_future::table
        .select(GenericFuture::as_select())
        .load(conn)?
        .into_iter()
        .map(|g| (g.ticker.clone(), g))
        .collect();

    Ok(Current { exchanges, generics })
}

fn make_diff(file: &Exchanges, current: &Current) -> ExchangeDiff {
    let mut diff = ExchangeDiff::default();
    let mut wanted_tickers = BTreeSet::new();

    for (code, cfg) in &file.exchanges {
        let csv = months_csv(&cfg.active_months);
        let unchanged = current.exchanges.get(code).is_some_and(|e| {
            e.name == cfg.name
                && e.prefix == cfg.prefix
                && e.active_months == csv
                && e.year_digits == cfg.year_digits
                && e.rollover_window == cfg.rollover_window
        });
        if !unchanged {
            diff.exchanges_upsert.insert(code.clone());
        }

        for g in &cfg.generics {
            wanted_tickers.insert(g.ticker.clone());
            let window = cfg.window_for(g);
            let unchanged = current.generics.get(&g.ticker).is_some_and(|row| {
                row.exchange_code == *code
                    && row.rank == g.rank as i32
                    && row.metal == g.metal
                    && row.rollover_window == window
                    && row.active
            });
            if !unchanged {
                diff.generics_upsert.insert(g.ticker.clone());
            }
        }
    }

    for (ticker, row) in &current.generics {
        if row.active && !wanted_tickers.contains(ticker) {
            diff.generics_deactivate.insert(ticker.clone());
        }
    }

    diff
}

fn apply_diff(
    conn: &mut SqliteConnection,
    file: &Exchanges,
    diff: &ExchangeDiff,
) -> anyhow::Result<()> {
    // Deactivations first: a rename keeps the old row's rank until it is
    // flipped inactive, and the partial unique index on
    // (exchange_code, rank) WHERE active only admits the new row after.
    for ticker in &diff.generics_deactivate {
        diesel::update(generic_future::table.filter(generic_future::ticker.eq(ticker)))
            .set(generic_future::active.eq(false))
            .execute(conn)?;
    }

    for (code, cfg) in &file.exchanges {
        if diff.exchanges_upsert.contains(code) {
            let csv = months_csv(&cfg.active_months);
            let row = NewExchange {
                code,
                name: &cfg.name,
                prefix: &cfg.prefix,
                active_months: &csv,
                year_digits: cfg.year_digits,
                rollover_window: cfg.rollover_window,
            };
            diesel::insert_into(exchange::table)
                .values(&row)
                .on_conflict(exchange::code)
                .do_update()
                .set(&row)
                .execute(conn)?;
        }

        for g in &cfg.generics {
            if !diff.generics_upsert.contains(&g.ticker) {
                continue;
            }
            let row = NewGenericFuture {
                ticker: &g.ticker,
                exchange_code: code,
                rank: g.rank as i32,
                metal: &g.metal,
                active: true,
                rollover_window: cfg.window_for(g),
            };
            // last_maturity is deliberately untouched: it is a runtime
            // cache owned by the mapping manager, not configuration.
            diesel::insert_into(generic_future::table)
                .values(&row)
                .on_conflict(generic_future::ticker)
                .do_update()
                .set(&row)
                .execute(conn)?;
        }
    }

    Ok(())
}

/// Sync the exchange/generic configuration into SQLite.
///
/// Returns the applied (or, in dry-run, the would-be) diff. Runs in a
/// single immediate transaction so a concurrent daily job sees either the
/// old configuration or the new one, never half of each.
pub fn sync_exchanges(
    conn: &mut SqliteConnection,
    file: &Exchanges,
    opt: SyncOptions,
) -> anyhow::Result<ExchangeDiff> {
    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let current = read_current(conn)?;
        let diff = make_diff(file, &current);

        if !opt.dry_run && !diff.is_noop() {
            apply_diff(conn, file, &diff)?;
        }

        tracing::info!(
            exchanges = diff.exchanges_upsert.len(),
            generics = diff.generics_upsert.len(),
            deactivated = diff.generics_deactivate.len(),
            dry_run = opt.dry_run,
            "exchange config sync"
        );
        Ok(diff)
    })
}
