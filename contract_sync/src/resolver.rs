//! Generic-to-actual contract month resolution.
//!
//! Given an exchange's ordered active-month set and a 1-indexed nearness
//! rank, [`resolve`] walks forward from the as-of date's calendar month and
//! picks the rank-th active (year, month). The as-of month itself is a
//! candidate when it is active: rank 1 on 2025-07-07 for a monthly exchange
//! is July 2025, not August. Pure functions of their inputs, so historical
//! backfills are reproducible regardless of processing order.

use chrono::{Datelike, NaiveDate};

use crate::config::ExchangeCfg;
use crate::errors::{MappingError, Result};

/// A resolved contract delivery month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractMonthYear {
    /// 4-digit calendar year.
    pub year: i32,
    /// Calendar month in [1, 12].
    pub month: u32,
}

impl ContractMonthYear {
    /// First calendar day of the contract month.
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

/// Resolve the rank-th active contract month on or after `as_of`.
///
/// `active_months` must be sorted ascending and de-duplicated (the config
/// normalization guarantees this). Errors with the exchange `code` attached
/// when the set is empty, and with [`MappingError::InvalidRank`] for rank 0.
pub fn resolve_months(
    code: &str,
    active_months: &[u32],
    rank: u32,
    as_of: NaiveDate,
) -> Result<ContractMonthYear> {
    if rank == 0 {
        return Err(MappingError::InvalidRank { rank });
    }
    if active_months.is_empty() {
        return Err(MappingError::InsufficientActiveMonths {
            code: code.to_string(),
        });
    }

    let mut remaining = rank;
    let mut year = as_of.year();
    loop {
        for &month in active_months {
            if year == as_of.year() && month < as_of.month() {
                continue;
            }
            remaining -= 1;
            if remaining == 0 {
                return Ok(ContractMonthYear { year, month });
            }
        }
        year += 1;
    }
}

/// Resolve against a configured exchange.
pub fn resolve(cfg: &ExchangeCfg, code: &str, rank: u32, as_of: NaiveDate) -> Result<ContractMonthYear> {
    resolve_months(code, &cfg.active_months, rank, as_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const MONTHLY: [u32; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
    const ODD_CYCLE: [u32; 6] = [1, 3, 5, 7, 9, 12];

    #[test]
    fn lme_monthly_resolution() {
        let as_of = d(2025, 7, 7);
        let r = |rank| resolve_months("lme", &MONTHLY, rank, as_of).unwrap();
        assert_eq!(r(1), ContractMonthYear { year: 2025, month: 7 });
        assert_eq!(r(2), ContractMonthYear { year: 2025, month: 8 });
        assert_eq!(r(13), ContractMonthYear { year: 2026, month: 7 });
    }

    #[test]
    fn comex_odd_month_cycle() {
        let as_of = d(2025, 7, 7);
        let r = |rank| resolve_months("comex", &ODD_CYCLE, rank, as_of).unwrap();
        assert_eq!(r(1), ContractMonthYear { year: 2025, month: 7 }); // July is active
        assert_eq!(r(2), ContractMonthYear { year: 2025, month: 9 });
        assert_eq!(r(3), ContractMonthYear { year: 2025, month: 12 });
        assert_eq!(r(4), ContractMonthYear { year: 2026, month: 1 });
    }

    #[test]
    fn inactive_current_month_skips_forward() {
        // As of February, the odd cycle's nearest month is March.
        let as_of = d(2025, 2, 10);
        let got = resolve_months("comex", &ODD_CYCLE, 1, as_of).unwrap();
        assert_eq!(got, ContractMonthYear { year: 2025, month: 3 });
    }

    #[test]
    fn december_as_of_wraps_into_next_year() {
        let as_of = d(2025, 12, 31);
        let r = |rank| resolve_months("comex", &ODD_CYCLE, rank, as_of).unwrap();
        assert_eq!(r(1), ContractMonthYear { year: 2025, month: 12 });
        assert_eq!(r(2), ContractMonthYear { year: 2026, month: 1 });
    }

    #[test]
    fn empty_active_months_is_a_config_error() {
        let err = resolve_months("broken", &[], 1, d(2025, 7, 7)).unwrap_err();
        assert!(matches!(err, MappingError::InsufficientActiveMonths { .. }));
        assert!(err.is_config_error());
    }

    #[test]
    fn rank_zero_rejected() {
        let err = resolve_months("lme", &MONTHLY, 0, d(2025, 7, 7)).unwrap_err();
        assert!(matches!(err, MappingError::InvalidRank { rank: 0 }));
    }

    use proptest::prelude::*;

    fn month_set() -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::btree_set(1u32..=12, 1..12)
            .prop_map(|s| s.into_iter().collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic(
            months in month_set(),
            rank in 1u32..40,
            day in 0u32..3000,
        ) {
            let as_of = d(2020, 1, 1) + chrono::Duration::days(day as i64);
            let a = resolve_months("x", &months, rank, as_of).unwrap();
            let b = resolve_months("x", &months, rank, as_of).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn rank_is_strictly_monotonic(
            months in month_set(),
            rank in 1u32..40,
            day in 0u32..3000,
        ) {
            let as_of = d(2020, 1, 1) + chrono::Duration::days(day as i64);
            let near = resolve_months("x", &months, rank, as_of).unwrap();
            let next = resolve_months("x", &months, rank + 1, as_of).unwrap();
            prop_assert!(
                (next.year, next.month) > (near.year, near.month),
                "rank {} -> {:?} not after {:?}", rank + 1, next, near
            );
        }

        #[test]
        fn resolved_month_is_active_and_not_in_the_past(
            months in month_set(),
            rank in 1u32..40,
            day in 0u32..3000,
        ) {
            let as_of = d(2020, 1, 1) + chrono::Duration::days(day as i64);
            let got = resolve_months("x", &months, rank, as_of).unwrap();
            prop_assert!(months.contains(&got.month));
            prop_assert!((got.year, got.month) >= (as_of.year(), as_of.month()));
        }
    }
}
