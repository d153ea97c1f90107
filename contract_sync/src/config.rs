//! Exchange configuration: parsing, normalization, and loading.
//!
//! One authoritative TOML file describes every exchange the engine knows:
//! product prefix, active-months set, year-suffix policy, default rollover
//! window, and the generic tickers to seed. This replaces the upstream
//! pattern of per-script hard-coded month lists, which drifted apart over
//! time.
//!
//! Key behaviors:
//! - Normalization lowercases and trims exchange codes, uppercases product
//!   prefixes, sorts and de-duplicates active months, and resolves each
//!   generic's rollover window (per-generic override, else exchange default).
//! - Validation fails fast: months outside [1,12], an empty active-month
//!   set, duplicate ranks or tickers, and rank 0 are all load-time errors,
//!   never runtime surprises.
//!
//! Entrypoints: [`load_exchanges_str`], [`load_exchanges_path`], and
//! [`normalize_exchanges`] for callers that build the structure in code.

use std::collections::HashSet;

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::codegen::YearPolicy;
use crate::errors::{MappingError, Result as EngineResult};

/// Top-level file mapping exchange codes to their configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Exchanges {
    /// Map of exchange code -> configuration. Codes are normalized
    /// (trimmed, lowercase) by [`normalize_exchanges`].
    pub exchanges: IndexMap<String, ExchangeCfg>,
}

/// Configuration payload for one exchange.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeCfg {
    /// Human-readable exchange name (e.g., "London Metal Exchange").
    pub name: String,
    /// Product prefix for dated tickers (e.g., "LP"); normalized uppercase.
    pub prefix: String,
    /// Calendar months in which the exchange lists a deliverable contract.
    /// Sorted and de-duplicated during normalization; must be non-empty.
    pub active_months: Vec<u32>,
    /// Year-suffix digit count for tickers: 1 (compatibility default) or 2.
    #[serde(default = "default_year_digits")]
    pub year_digits: i32,
    /// Default rollover window (days-to-expiry threshold) for this
    /// exchange's generics.
    pub rollover_window: i32,
    /// Generic tickers to seed for this exchange.
    #[serde(default)]
    pub generics: Vec<GenericCfg>,
}

fn default_year_digits() -> i32 {
    1
}

/// One generic ("Nth nearest") instrument to seed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenericCfg {
    /// Exchange-qualified symbol (e.g., "LP1").
    pub ticker: String,
    /// 1-indexed nearness rank.
    pub rank: u32,
    /// Commodity/metal identifier (e.g., "copper").
    pub metal: String,
    /// Optional override of the exchange's default rollover window.
    pub rollover_window: Option<i32>,
}

impl ExchangeCfg {
    /// The configured year-suffix policy.
    pub fn year_policy(&self) -> EngineResult<YearPolicy> {
        YearPolicy::from_digits(self.year_digits)
    }

    /// The rollover window for one generic: its override, else the
    /// exchange default.
    pub fn window_for(&self, g: &GenericCfg) -> i32 {
        g.rollover_window.unwrap_or(self.rollover_window)
    }
}

impl Exchanges {
    /// Look up one exchange's configuration by normalized code.
    pub fn exchange(&self, code: &str) -> EngineResult<&ExchangeCfg> {
        self.exchanges
            .get(code)
            .ok_or_else(|| MappingError::UnknownExchange {
                code: code.to_string(),
            })
    }
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Number of exchange keys that changed when lowercasing/trimming.
    pub exchanges_renamed: usize,
    /// Count of removed duplicate active months.
    pub months_deduped: usize,
}

/// Normalize and validate an exchange file in place.
///
/// What normalization does:
/// - Lowercase + trim exchange codes; reject duplicates after normalization
/// - Uppercase + trim product prefixes; reject empty prefixes
/// - Sort + de-duplicate active months; reject months outside [1,12] and
///   empty month sets
/// - Reject rank 0, duplicate ranks, and duplicate tickers per exchange;
///   tickers are trimmed
/// - Reject negative rollover windows (exchange default and overrides)
pub fn normalize_exchanges(file: &mut Exchanges) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    let mut rebuilt: IndexMap<String, ExchangeCfg> = IndexMap::new();
    let old = std::mem::take(&mut file.exchanges);

    for (raw_code, mut cfg) in old {
        let code = raw_code.trim().to_lowercase();
        if code.is_empty() {
            bail!("exchange code cannot be empty after trimming");
        }
        if code != raw_code {
            report.exchanges_renamed += 1;
        }
        if rebuilt.contains_key(&code) {
            bail!("duplicate exchange code after normalization: {code}");
        }

        cfg.prefix = cfg.prefix.trim().to_uppercase();
        if cfg.prefix.is_empty() {
            bail!("exchange {code}: product prefix cannot be empty");
        }

        if cfg.year_digits != 1 && cfg.year_digits != 2 {
            bail!("exchange {code}: year_digits must be 1 or 2");
        }
        if cfg.rollover_window < 0 {
            bail!("exchange {code}: rollover_window cannot be negative");
        }

        // Active months: validate, sort ascending, dedupe.
        for &m in &cfg.active_months {
            if !(1..=12).contains(&m) {
                bail!("exchange {code}: active month {m} outside [1,12]");
            }
        }
        let before = cfg.active_months.len();
        cfg.active_months.sort_unstable();
        cfg.active_months.dedup();
        report.months_deduped += before - cfg.active_months.len();
        if cfg.active_months.is_empty() {
            bail!("exchange {code}: no active months configured");
        }

        let mut seen_ranks = HashSet::new();
        let mut seen_tickers = HashSet::new();
        for g in &mut cfg.generics {
            g.ticker = g.ticker.trim().to_string();
            if g.ticker.is_empty() {
                bail!("exchange {code}: generic ticker cannot be empty");
            }
            if g.rank < 1 {
                bail!("exchange {code}: generic {} has rank 0", g.ticker);
            }
            if let Some(w) = g.rollover_window
                && w < 0
            {
                bail!("exchange {code}: generic {} has a negative rollover window", g.ticker);
            }
            if !seen_ranks.insert(g.rank) {
                bail!("exchange {code}: duplicate generic rank {}", g.rank);
            }
            if !seen_tickers.insert(g.ticker.clone()) {
                bail!("exchange {code}: duplicate generic ticker {}", g.ticker);
            }
        }

        rebuilt.insert(code, cfg);
    }

    file.exchanges = rebuilt;
    Ok(report)
}

/// Parse and normalize an exchange file from a TOML string.
pub fn load_exchanges_str(toml_str: &str) -> anyhow::Result<Exchanges> {
    let mut file: Exchanges = toml::from_str(toml_str).context("failed to parse exchanges TOML")?;
    normalize_exchanges(&mut file).context("normalize_exchanges failed")?;
    Ok(file)
}

/// Read an exchange TOML file from disk, parse, and normalize it.
pub fn load_exchanges_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Exchanges> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read exchanges file {}", path.as_ref().display()))?;
    load_exchanges_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [exchanges.LME]
        name = "London Metal Exchange"
        prefix = "lp"
        active_months = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
        rollover_window = 3

        [[exchanges.LME.generics]]
        ticker = "LP1"
        rank = 1
        metal = "copper"

        [[exchanges.LME.generics]]
        ticker = "LP2"
        rank = 2
        metal = "copper"
        rollover_window = 5

        [exchanges.comex]
        name = "COMEX"
        prefix = "HG"
        active_months = [3, 1, 5, 7, 9, 12, 9]
        year_digits = 2
        rollover_window = 10
    "#;

    #[test]
    fn normalizes_codes_months_and_prefixes() {
        let file = load_exchanges_str(SAMPLE).unwrap();

        let (code, lme) = file.exchanges.first().unwrap();
        assert_eq!(code, "lme");
        assert_eq!(lme.prefix, "LP");
        assert_eq!(lme.active_months, (1..=12).collect::<Vec<_>>());
        assert_eq!(lme.window_for(&lme.generics[0]), 3);
        assert_eq!(lme.window_for(&lme.generics[1]), 5);

        let comex = file.exchange("comex").unwrap();
        assert_eq!(comex.active_months, vec![1, 3, 5, 7, 9, 12]); // sorted + deduped
        assert_eq!(comex.year_policy().unwrap(), YearPolicy::TwoDigit);
    }

    #[test]
    fn unknown_exchange_lookup_errors() {
        let file = load_exchanges_str(SAMPLE).unwrap();
        assert!(matches!(
            file.exchange("shfe"),
            Err(MappingError::UnknownExchange { .. })
        ));
    }

    #[test]
    fn empty_active_months_rejected() {
        let toml_str = r#"
            [exchanges.lme]
            name = "LME"
            prefix = "LP"
            active_months = []
            rollover_window = 3
        "#;
        let err = load_exchanges_str(toml_str).unwrap_err();
        // The loader wraps validation errors in context; check the chain.
        assert!(format!("{err:#}").contains("no active months"));
    }

    #[test]
    fn month_out_of_range_rejected() {
        let toml_str = r#"
            [exchanges.lme]
            name = "LME"
            prefix = "LP"
            active_months = [1, 13]
            rollover_window = 3
        "#;
        assert!(load_exchanges_str(toml_str).is_err());
    }

    #[test]
    fn duplicate_rank_rejected() {
        let toml_str = r#"
            [exchanges.lme]
            name = "LME"
            prefix = "LP"
            active_months = [1]
            rollover_window = 3
            [[exchanges.lme.generics]]
            ticker = "LP1"
            rank = 1
            metal = "copper"
            [[exchanges.lme.generics]]
            ticker = "LP1B"
            rank = 1
            metal = "copper"
        "#;
        let err = load_exchanges_str(toml_str).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate generic rank"));
    }

    #[test]
    fn duplicate_exchange_code_after_normalization_rejected() {
        let toml_str = r#"
            [exchanges.lme]
            name = "LME"
            prefix = "LP"
            active_months = [1]
            rollover_window = 3

            [exchanges." LME "]
            name = "LME again"
            prefix = "LP"
            active_months = [1]
            rollover_window = 3
        "#;
        let err = load_exchanges_str(toml_str).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate exchange code"));
    }

    #[test]
    fn snapshot_normalized_exchanges() {
        let toml_str = r#"
            [exchanges.COMEX]
            name = "COMEX"
            prefix = "hg"
            active_months = [3, 1, 5, 7, 9, 12, 9]
            year_digits = 2
            rollover_window = 10

            [[exchanges.COMEX.generics]]
            ticker = "HG1"
            rank = 1
            metal = "copper"
        "#;
        let file = load_exchanges_str(toml_str).unwrap();
        insta::assert_json_snapshot!(&file, @r#"
        {
          "exchanges": {
            "comex": {
              "name": "COMEX",
              "prefix": "HG",
              "active_months": [
                1,
                3,
                5,
                7,
                9,
                12
              ],
              "year_digits": 2,
              "rollover_window": 10,
              "generics": [
                {
                  "ticker": "HG1",
                  "rank": 1,
                  "metal": "copper",
                  "rollover_window": null
                }
              ]
            }
          }
        }
        "#);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn active_months_sorted_unique_after_normalization(
            months in proptest::collection::vec(1u32..=12, 1..24),
        ) {
            let mut file = Exchanges { exchanges: IndexMap::new() };
            file.exchanges.insert("lme".into(), ExchangeCfg {
                name: "LME".into(),
                prefix: "LP".into(),
                active_months: months,
                year_digits: 1,
                rollover_window: 3,
                generics: vec![],
            });

            normalize_exchanges(&mut file).unwrap();
            let got = &file.exchanges["lme"].active_months;
            prop_assert!(got.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(!got.is_empty());
        }
    }
}
