// file: src/models/records.rs
// description: raw rate, claim and regulatory filing records as stored on disk
// reference: sample data layout under the data directory

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub provider: String,
    pub state: String,
    pub insurance_type: String,
    pub coverage_level: String,
    pub monthly_rate: f64,
    pub deductible: u32,
    pub coverage_amount: u64,
    pub customer_age_group: String,
    pub rating_factor: f64,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claim_id: String,
    pub provider: String,
    pub state: String,
    pub insurance_type: String,
    pub claim_amount: f64,
    pub claim_type: String,
    pub claim_date: String,
    pub settlement_days: u32,
    #[serde(deserialize_with = "flexible_bool")]
    pub fraud_indicator: bool,
}

/// Accepts `true`/`false` in any case plus `1`/`0`, so files exported by
/// spreadsheet tools load as well as our own.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean value: {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryFiling {
    pub filing_id: String,
    pub state: String,
    pub filing_date: String,
    pub effective_date: String,
    pub filing_type: String,
    pub description: String,
    pub impact: String,
    pub provider: String,
}

impl RegulatoryFiling {
    /// Filings submitted jointly carry `Multiple` instead of a provider name.
    pub fn single_provider(&self) -> Option<&str> {
        if self.provider.eq_ignore_ascii_case("multiple") {
            None
        } else {
            Some(self.provider.as_str())
        }
    }
}

/// Everything the loader reads from one data directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub rates: Vec<RateRecord>,
    pub claims: Vec<ClaimRecord>,
    pub filings: Vec<RegulatoryFiling>,
}

impl Dataset {
    pub fn record_count(&self) -> usize {
        self.rates.len() + self.claims.len() + self.filings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}
