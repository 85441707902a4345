// file: src/data/generator.rs
// description: reproducible sample rate, claims and regulatory data generation
// reference: https://docs.rs/rand

use crate::data::loader::{CLAIMS_FILE, FILINGS_FILE, RATES_FILE};
use crate::error::{PipelineError, Result};
use crate::models::{ClaimRecord, Dataset, RateRecord, RegulatoryFiling};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PROVIDERS: [&str; 10] = [
    "StateFarm",
    "Geico",
    "Progressive",
    "Allstate",
    "USAA",
    "Liberty Mutual",
    "Farmers",
    "Nationwide",
    "Travelers",
    "AmFam",
];

pub const STATES: [&str; 10] = ["CA", "TX", "FL", "NY", "PA", "IL", "OH", "GA", "NC", "MI"];

pub const INSURANCE_TYPES: [&str; 4] = ["auto", "home", "life", "health"];

const COVERAGE_LEVELS: [&str; 3] = ["Basic", "Standard", "Premium"];
const DEDUCTIBLES: [u32; 4] = [250, 500, 1000, 2500];
const COVERAGE_AMOUNTS: [u64; 4] = [50_000, 100_000, 250_000, 500_000];
const AGE_GROUPS: [&str; 5] = ["18-25", "26-35", "36-50", "51-65", "65+"];
const CLAIM_TYPES: [&str; 5] = ["Collision", "Theft", "Weather", "Liability", "Medical"];

pub struct SampleDataGenerator {
    rng: StdRng,
    reference_date: NaiveDate,
}

impl SampleDataGenerator {
    /// Same seed and reference date always yield the same dataset.
    pub fn new(seed: u64, reference_date: NaiveDate) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            reference_date,
        }
    }

    pub fn generate(&mut self, rate_records: usize, claim_records: usize) -> Dataset {
        Dataset {
            rates: self.generate_rates(rate_records),
            claims: self.generate_claims(claim_records),
            filings: Self::regulatory_filings(),
        }
    }

    pub fn generate_rates(&mut self, count: usize) -> Vec<RateRecord> {
        info!("Generating {} sample rate records", count);

        (0..count)
            .map(|_| {
                let provider = self.pick(&PROVIDERS);
                let state = self.pick(&STATES);
                let insurance_type = self.pick(&INSURANCE_TYPES);
                let coverage_level = self.pick(&COVERAGE_LEVELS);
                let monthly_rate = round2(self.rng.gen_range(80.0..=400.0));
                let deductible = *DEDUCTIBLES.choose(&mut self.rng).unwrap_or(&500);
                let coverage_amount = *COVERAGE_AMOUNTS.choose(&mut self.rng).unwrap_or(&100_000);
                let customer_age_group = self.pick(&AGE_GROUPS);
                let rating_factor = round2(self.rng.gen_range(0.8..=1.5));
                let age_days = self.rng.gen_range(1..=30);

                RateRecord {
                    provider,
                    state,
                    insurance_type,
                    coverage_level,
                    monthly_rate,
                    deductible,
                    coverage_amount,
                    customer_age_group,
                    rating_factor,
                    last_updated: self.days_ago(age_days),
                }
            })
            .collect()
    }

    pub fn generate_claims(&mut self, count: usize) -> Vec<ClaimRecord> {
        info!("Generating {} sample claim records", count);

        (0..count)
            .map(|_| {
                let age_days = self.rng.gen_range(1..=730);
                let claim_date = self.days_ago(age_days);
                let fraud_indicator = self.rng.gen_bool(0.05) && self.rng.gen_bool(0.5);

                ClaimRecord {
                    claim_id: format!("CLM{}", self.rng.gen_range(100_000..=999_999)),
                    provider: self.pick(&PROVIDERS),
                    state: self.pick(&STATES),
                    insurance_type: self.pick(&INSURANCE_TYPES),
                    claim_amount: round2(self.rng.gen_range(500.0..=25_000.0)),
                    claim_type: self.pick(&CLAIM_TYPES),
                    claim_date,
                    settlement_days: self.rng.gen_range(5..=60),
                    fraud_indicator,
                }
            })
            .collect()
    }

    pub fn regulatory_filings() -> Vec<RegulatoryFiling> {
        vec![
            RegulatoryFiling {
                filing_id: "REG001".to_string(),
                state: "CA".to_string(),
                filing_date: "2025-01-05".to_string(),
                effective_date: "2025-02-01".to_string(),
                filing_type: "Rate Change".to_string(),
                description: "Auto insurance rate adjustment - average increase of 3.2%"
                    .to_string(),
                impact: "Rate increases for comprehensive coverage in high-risk areas"
                    .to_string(),
                provider: "StateFarm".to_string(),
            },
            RegulatoryFiling {
                filing_id: "REG002".to_string(),
                state: "TX".to_string(),
                filing_date: "2025-01-07".to_string(),
                effective_date: "2025-03-01".to_string(),
                filing_type: "New Product".to_string(),
                description: "Introduction of usage-based insurance program".to_string(),
                impact: "Potential rate reductions for low-mileage drivers".to_string(),
                provider: "Progressive".to_string(),
            },
            RegulatoryFiling {
                filing_id: "REG003".to_string(),
                state: "FL".to_string(),
                filing_date: "2025-01-08".to_string(),
                effective_date: "2025-02-15".to_string(),
                filing_type: "Regulatory Change".to_string(),
                description: "Updated hurricane coverage requirements".to_string(),
                impact: "Mandatory coverage changes for coastal properties".to_string(),
                provider: "Multiple".to_string(),
            },
        ]
    }

    /// Writes the three sample files into `dir`, creating it if needed.
    pub fn save(dataset: &Dataset, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|source| PipelineError::FileOperation {
            path: dir.to_path_buf(),
            source,
        })?;

        let rates_path = dir.join(RATES_FILE);
        write_csv(&rates_path, &dataset.rates)?;

        let claims_path = dir.join(CLAIMS_FILE);
        write_csv(&claims_path, &dataset.claims)?;

        let filings_path = dir.join(FILINGS_FILE);
        let json = serde_json::to_string_pretty(&dataset.filings)?;
        fs::write(&filings_path, json).map_err(|source| PipelineError::FileOperation {
            path: filings_path.clone(),
            source,
        })?;

        info!(
            "Sample data saved to {}: {} rates, {} claims, {} filings",
            dir.display(),
            dataset.rates.len(),
            dataset.claims.len(),
            dataset.filings.len()
        );

        Ok(vec![rates_path, claims_path, filings_path])
    }

    fn pick(&mut self, options: &[&str]) -> String {
        options
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default()
            .to_string()
    }

    fn days_ago(&self, days: u64) -> String {
        self.reference_date
            .checked_sub_days(Days::new(days))
            .unwrap_or(self.reference_date)
            .format("%Y-%m-%d")
            .to_string()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn write_csv<T: serde::Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        PipelineError::Serialization(format!("Failed to open {}: {}", path.display(), e))
    })?;

    for record in records {
        writer.serialize(record).map_err(|e| {
            PipelineError::Serialization(format!("Failed to write {}: {}", path.display(), e))
        })?;
    }

    writer.flush().map_err(|source| PipelineError::FileOperation {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn test_generation_is_reproducible() {
        let first = SampleDataGenerator::new(7, reference()).generate(50, 20);
        let second = SampleDataGenerator::new(7, reference()).generate(50, 20);
        assert_eq!(first, second);

        let other = SampleDataGenerator::new(8, reference()).generate(50, 20);
        assert_ne!(first.rates, other.rates);
    }

    #[test]
    fn test_values_stay_in_range() {
        let dataset = SampleDataGenerator::new(1, reference()).generate(200, 100);
        assert_eq!(dataset.rates.len(), 200);
        assert_eq!(dataset.claims.len(), 100);
        assert_eq!(dataset.filings.len(), 3);

        for rate in &dataset.rates {
            assert!((80.0..=400.0).contains(&rate.monthly_rate));
            assert!((0.8..=1.5).contains(&rate.rating_factor));
            assert!(PROVIDERS.contains(&rate.provider.as_str()));
            assert!(rate.last_updated.as_str() < "2025-06-30");
            assert!(rate.last_updated.as_str() >= "2025-05-31");
        }

        for claim in &dataset.claims {
            assert!((500.0..=25_000.0).contains(&claim.claim_amount));
            assert!((5..=60).contains(&claim.settlement_days));
            assert!(claim.claim_id.starts_with("CLM"));
            assert_eq!(claim.claim_id.len(), 9);
        }
    }

    #[test]
    fn test_save_writes_three_files() {
        let temp = TempDir::new().unwrap();
        let dataset = SampleDataGenerator::new(3, reference()).generate(5, 5);

        let written = SampleDataGenerator::save(&dataset, temp.path()).unwrap();
        assert_eq!(written.len(), 3);
        for path in written {
            assert!(path.exists());
        }

        let rates = fs::read_to_string(temp.path().join(RATES_FILE)).unwrap();
        assert!(rates.starts_with("provider,state,insurance_type"));
        assert_eq!(rates.lines().count(), 6);
    }
}
