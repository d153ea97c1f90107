//! Reference-data models returned by a [`crate::providers::ReferenceDataSource`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-ticker reference attributes as of a trade date.
///
/// Every field except `contract_code` may be absent: upstream vendors
/// routinely lack maturity or sizing data for far-dated contracts. Consumers
/// must degrade gracefully (e.g. a null `days_to_expiry` downstream) rather
/// than invent estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRefData {
    /// The dated contract code the ticker currently points at
    /// (vendor-specific, e.g. "LPN5").
    pub contract_code: String,
    /// Last date the contract can trade.
    pub last_tradeable: Option<NaiveDate>,
    /// Physical delivery date.
    pub delivery: Option<NaiveDate>,
    /// Contract size in the commodity's lot unit (e.g. 25.0 tonnes).
    pub contract_size: Option<f64>,
    /// Minimum price increment.
    pub tick_size: Option<f64>,
}

impl ContractRefData {
    /// A record carrying only the contract code, with all optional
    /// attributes unknown.
    pub fn bare(contract_code: impl Into<String>) -> Self {
        Self {
            contract_code: contract_code.into(),
            last_tradeable: None,
            delivery: None,
            contract_size: None,
            tick_size: None,
        }
    }
}
