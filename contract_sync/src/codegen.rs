//! Dated-contract ticker generation.
//!
//! Pure functions mapping (prefix, calendar month, year) to a canonical
//! contract code using the standard futures month-letter convention. No I/O;
//! safe to call concurrently.

use serde::{Deserialize, Serialize};

use crate::errors::{MappingError, Result};

/// Standard futures month letters for Jan..Dec.
pub const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];

/// How the calendar year is encoded in the ticker suffix.
///
/// `SingleDigit` reproduces the upstream convention ("LPN5" for Jul-2025)
/// and collides across decades; the authoritative year lives in the
/// `contract_year` column, so the collision is cosmetic as long as lookups
/// filter by year (the registry does). `TwoDigit` ("LPN25") avoids the
/// collision for exchanges that opt in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearPolicy {
    /// Final digit of the year ("5" for 2025 and 2035).
    SingleDigit,
    /// Final two digits of the year ("25" for 2025).
    TwoDigit,
}

impl YearPolicy {
    /// Build a policy from the configured digit count (1 or 2).
    pub fn from_digits(digits: i32) -> Result<Self> {
        match digits {
            1 => Ok(YearPolicy::SingleDigit),
            2 => Ok(YearPolicy::TwoDigit),
            other => Err(MappingError::InvalidYear { year: other }),
        }
    }

    /// Number of digits this policy emits.
    pub fn digits(self) -> i32 {
        match self {
            YearPolicy::SingleDigit => 1,
            YearPolicy::TwoDigit => 2,
        }
    }

    fn suffix(self, year: i32) -> String {
        match self {
            YearPolicy::SingleDigit => format!("{}", year.rem_euclid(10)),
            YearPolicy::TwoDigit => format!("{:02}", year.rem_euclid(100)),
        }
    }
}

/// Month-letter code for a calendar month in [1, 12].
pub fn month_code(month: u32) -> Result<char> {
    match month {
        1..=12 => Ok(MONTH_CODES[(month - 1) as usize]),
        _ => Err(MappingError::InvalidMonth { month }),
    }
}

/// Canonical dated-contract ticker: prefix + month letter + year suffix.
///
/// `year` must be a 4-digit calendar year. Referentially transparent; the
/// caller supplies the exchange's configured `prefix` and [`YearPolicy`].
pub fn contract_code(prefix: &str, month: u32, year: i32, policy: YearPolicy) -> Result<String> {
    if !(1000..=9999).contains(&year) {
        return Err(MappingError::InvalidYear { year });
    }
    let letter = month_code(month)?;
    Ok(format!("{prefix}{letter}{}", policy.suffix(year)))
}
