// file: src/data/loader.rs
// description: reads rate, claims and regulatory files from the data directory
// reference: https://docs.rs/csv, https://docs.rs/walkdir

use crate::error::{PipelineError, Result};
use crate::models::{ClaimRecord, Dataset, RateRecord, RegulatoryFiling};
use crate::utils::Validator;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const RATES_FILE: &str = "sample_rates.csv";
pub const CLAIMS_FILE: &str = "claims_data.csv";
pub const FILINGS_FILE: &str = "regulatory_filings.json";

pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Loads every known file. Fails on the first malformed file or row so a
    /// partial dataset never reaches the index.
    pub fn load(&self) -> Result<Dataset> {
        info!("Loading data from {}", self.data_dir.display());
        Validator::validate_directory(&self.data_dir)
            .map_err(|e| PipelineError::MissingData(e.to_string()))?;

        let files = self.discover()?;

        let rates_path = files.get(RATES_FILE).ok_or_else(|| {
            PipelineError::MissingData(format!(
                "{} not found in {}; run `setup` to generate sample data",
                RATES_FILE,
                self.data_dir.display()
            ))
        })?;
        let claims_path = files.get(CLAIMS_FILE).ok_or_else(|| {
            PipelineError::MissingData(format!(
                "{} not found in {}; run `setup` to generate sample data",
                CLAIMS_FILE,
                self.data_dir.display()
            ))
        })?;

        let rates: Vec<RateRecord> = read_csv(rates_path)?;
        for (idx, rate) in rates.iter().enumerate() {
            validate_rate(rate).map_err(|message| {
                PipelineError::data_format(display(rates_path), row_message(idx, &message))
            })?;
        }

        let claims: Vec<ClaimRecord> = read_csv(claims_path)?;
        for (idx, claim) in claims.iter().enumerate() {
            validate_claim(claim).map_err(|message| {
                PipelineError::data_format(display(claims_path), row_message(idx, &message))
            })?;
        }

        let filings = match files.get(FILINGS_FILE) {
            Some(path) => read_filings(path)?,
            None => {
                warn!("{} not found, continuing without filings", FILINGS_FILE);
                Vec::new()
            }
        };

        if rates.is_empty() {
            return Err(PipelineError::MissingData(format!(
                "{} contains no rate records",
                display(rates_path)
            )));
        }

        info!(
            "Loaded {} rates, {} claims, {} filings",
            rates.len(),
            claims.len(),
            filings.len()
        );

        Ok(Dataset {
            rates,
            claims,
            filings,
        })
    }

    fn discover(&self) -> Result<HashMap<String, PathBuf>> {
        let mut files = HashMap::new();

        for entry in WalkDir::new(&self.data_dir)
            .max_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if matches!(name.as_str(), RATES_FILE | CLAIMS_FILE | FILINGS_FILE) {
                debug!("Found data file: {}", entry.path().display());
                files.insert(name, entry.path().to_path_buf());
            } else {
                debug!("Ignoring unknown file: {}", entry.path().display());
            }
        }

        Ok(files)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

// Row 0 sits on line 2, under the header.
fn row_message(idx: usize, message: &str) -> String {
    format!("line {}: {}", idx + 2, message)
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| PipelineError::data_format(display(path), e.to_string()))?;

    reader
        .deserialize::<T>()
        .map(|row| row.map_err(|e| PipelineError::data_format(display(path), e.to_string())))
        .collect()
}

fn read_filings(path: &Path) -> Result<Vec<RegulatoryFiling>> {
    let file = File::open(path).map_err(|source| PipelineError::FileOperation {
        path: path.to_path_buf(),
        source,
    })?;

    let filings: Vec<RegulatoryFiling> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PipelineError::data_format(display(path), e.to_string()))?;

    for (idx, filing) in filings.iter().enumerate() {
        if filing.filing_id.trim().is_empty() || filing.state.trim().is_empty() {
            return Err(PipelineError::data_format(
                display(path),
                format!("filing {} is missing filing_id or state", idx),
            ));
        }
    }

    Ok(filings)
}

fn require(field: &str, value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is empty", field))
    } else {
        Ok(())
    }
}

fn require_amount(field: &str, value: f64) -> std::result::Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        Err(format!("{} must be a non-negative number, got {}", field, value))
    } else {
        Ok(())
    }
}

fn validate_rate(rate: &RateRecord) -> std::result::Result<(), String> {
    require("provider", &rate.provider)?;
    require("state", &rate.state)?;
    require("insurance_type", &rate.insurance_type)?;
    require_amount("monthly_rate", rate.monthly_rate)
}

fn validate_claim(claim: &ClaimRecord) -> std::result::Result<(), String> {
    require("claim_id", &claim.claim_id)?;
    require("provider", &claim.provider)?;
    require("state", &claim.state)?;
    require("insurance_type", &claim.insurance_type)?;
    require_amount("claim_amount", claim.claim_amount)
}
