//! Rollover detection.
//!
//! A pure three-way classification re-evaluated fresh on every call; the
//! mapping table is the source of truth and no "rollover in progress"
//! state is persisted. Detection is read-only — the actual re-mapping
//! happens when the daily run re-invokes the resolver and mapping manager.

use chrono::NaiveDate;
use diesel::SqliteConnection;

use crate::errors::Result;
use crate::mapping;
use crate::models::GenericFuture;

/// Days past the rollover window during which a generic is flagged as
/// approaching its roll.
pub const ROLLOVER_GRACE_DAYS: i32 = 5;

/// How urgently a generic needs to advance to the next contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverDecision {
    /// Comfortably far from expiry.
    None,
    /// Within the grace band above the rollover window.
    Soon,
    /// At or inside the rollover window, unmapped, or maturity unknown:
    /// roll (or map) now.
    Immediate,
}

impl std::fmt::Display for RolloverDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RolloverDecision::None => "none",
            RolloverDecision::Soon => "soon",
            RolloverDecision::Immediate => "immediate",
        };
        write!(f, "{s}")
    }
}

/// Classify a known days-to-expiry against a rollover window.
///
/// The window boundary is inclusive: `days_to_expiry == window` is already
/// `Immediate`.
pub fn classify(days_to_expiry: i32, rollover_window: i32) -> RolloverDecision {
    if days_to_expiry <= rollover_window {
        RolloverDecision::Immediate
    } else if days_to_expiry <= rollover_window + ROLLOVER_GRACE_DAYS {
        RolloverDecision::Soon
    } else {
        RolloverDecision::None
    }
}

/// Decide whether `generic` must roll as of `as_of`.
///
/// Reads the latest mapping with trade_date <= `as_of`. No mapping means
/// the generic needs its first-time mapping (`Immediate`). A mapping with
/// unknown days-to-expiry also returns `Immediate`: the upstream source
/// lacked maturity data and the next run must refresh it rather than sit
/// on an unverifiable position.
pub fn needs_rollover(
    conn: &mut SqliteConnection,
    generic: &GenericFuture,
    as_of: NaiveDate,
) -> Result<RolloverDecision> {
    let Some(current) = mapping::latest_mapping(conn, generic.id, as_of)? else {
        return Ok(RolloverDecision::Immediate);
    };

    match current.days_to_expiry {
        Some(dte) => Ok(classify(dte, generic.rollover_window)),
        None => Ok(RolloverDecision::Immediate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_boundary_is_inclusive() {
        assert_eq!(classify(3, 3), RolloverDecision::Immediate);
        assert_eq!(classify(0, 3), RolloverDecision::Immediate);
        assert_eq!(classify(-2, 3), RolloverDecision::Immediate); // already expired
    }

    #[test]
    fn grace_band_is_window_plus_one_through_plus_five() {
        assert_eq!(classify(4, 3), RolloverDecision::Soon);
        assert_eq!(classify(8, 3), RolloverDecision::Soon);
        assert_eq!(classify(9, 3), RolloverDecision::None);
    }

    #[test]
    fn far_from_expiry_is_none() {
        assert_eq!(classify(120, 3), RolloverDecision::None);
    }

    #[test]
    fn zero_window_still_rolls_at_zero() {
        assert_eq!(classify(0, 0), RolloverDecision::Immediate);
        assert_eq!(classify(1, 0), RolloverDecision::Soon);
        assert_eq!(classify(6, 0), RolloverDecision::None);
    }
}
