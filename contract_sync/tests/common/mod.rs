#![allow(dead_code)]

use contract_sync::db::{connection, migrate};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text};
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}
#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    n: i64,
}
#[derive(QueryableByName)]
struct FkViolation {
    #[diesel(sql_type = Text)]
    table: String,
}

pub struct TestDb {
    _dir: TempDir, // keep alive for the life of the test
    pub path: String,
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
    let row: CountRow = diesel::sql_query(format!("SELECT COUNT(*) AS n FROM {table}"))
        .get_result(conn)
        .expect("count");
    row.n
}

pub fn fk_check_empty(conn: &mut SqliteConnection) {
    let violations: Vec<FkViolation> = diesel::sql_query("PRAGMA foreign_key_check;")
        .load(conn)
        .expect("fk check");
    assert!(
        violations.is_empty(),
        "foreign key violations in: {:?}",
        violations.iter().map(|v| &v.table).collect::<Vec<_>>()
    );
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal"); // WAL is persistent per DB file

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

/// A two-generic LME setup used by most mapping tests.
pub fn lme_toml() -> &'static str {
    r#"
[exchanges.lme]
name = "London Metal Exchange"
prefix = "LP"
active_months = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
rollover_window = 3

  [[exchanges.lme.generics]]
  ticker = "LP1"
  rank = 1
  metal = "copper"

  [[exchanges.lme.generics]]
  ticker = "LP2"
  rank = 2
  metal = "copper"
"#
}

/// Load, normalize, and sync `toml_str`, returning the parsed config.
pub fn seed_config(
    conn: &mut SqliteConnection,
    toml_str: &str,
) -> contract_sync::config::Exchanges {
    let exchanges = contract_sync::config::load_exchanges_str(toml_str).expect("config");
    contract_sync::sync::sync_exchanges(
        conn,
        &exchanges,
        contract_sync::sync::SyncOptions { dry_run: false },
    )
    .expect("seed sync");
    exchanges
}
