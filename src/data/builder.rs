// file: src/data/builder.rs
// description: aggregates raw records into narrative documents for indexing
// reference: grouped summaries over rates, claims and filings

use crate::data::loader::{CLAIMS_FILE, FILINGS_FILE, RATES_FILE};
use crate::models::{Dataset, Document, DocumentKind};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

type GroupKey = (String, String, String);

#[derive(Debug, Default)]
struct Stats {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Stats {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Default)]
struct RateGroup {
    rate: Stats,
    deductible: Stats,
    coverage: Stats,
}

#[derive(Debug, Default)]
struct ClaimGroup {
    amount: Stats,
    settlement: Stats,
}

#[derive(Debug, Default)]
struct MarketGroup {
    rate: Stats,
    providers: BTreeSet<String>,
}

/// Turns a [`Dataset`] into documents. Output order is fully determined by
/// the records, so rebuilding from the same files yields the same documents.
pub struct DocumentBuilder;

impl DocumentBuilder {
    pub fn build(dataset: &Dataset) -> Vec<Document> {
        let mut documents = Vec::new();

        documents.extend(Self::rate_summaries(dataset));
        documents.extend(Self::claims_summaries(dataset));
        documents.extend(Self::market_overviews(dataset));
        documents.extend(Self::filing_documents(dataset));

        info!("Prepared {} documents for indexing", documents.len());
        documents
    }

    fn rate_summaries(dataset: &Dataset) -> Vec<Document> {
        let mut groups: BTreeMap<GroupKey, RateGroup> = BTreeMap::new();
        for rate in &dataset.rates {
            let group = groups
                .entry((
                    rate.provider.clone(),
                    rate.state.clone(),
                    rate.insurance_type.clone(),
                ))
                .or_default();
            group.rate.push(rate.monthly_rate);
            group.deductible.push(rate.deductible as f64);
            group.coverage.push(rate.coverage_amount as f64);
        }

        groups
            .into_iter()
            .map(|((provider, state, ins_type), group)| {
                let text = format!(
                    "{provider} offers {ins_type} insurance in {state} with average monthly rate ${:.2}, \
                     ranging from ${:.2} to ${:.2}. Based on {} policies. \
                     Average deductible is ${:.2}, average coverage amount is ${:.2}.",
                    group.rate.mean(),
                    group.rate.min,
                    group.rate.max,
                    group.rate.count,
                    group.deductible.mean(),
                    group.coverage.mean(),
                );
                Document::new(
                    DocumentKind::RateSummary,
                    &format!("{}/{}/{}", provider, state, ins_type),
                    state,
                    Some(ins_type),
                    Some(provider),
                    RATES_FILE.to_string(),
                    text,
                )
            })
            .collect()
    }

    fn claims_summaries(dataset: &Dataset) -> Vec<Document> {
        let mut groups: BTreeMap<GroupKey, ClaimGroup> = BTreeMap::new();
        for claim in &dataset.claims {
            let group = groups
                .entry((
                    claim.provider.clone(),
                    claim.state.clone(),
                    claim.insurance_type.clone(),
                ))
                .or_default();
            group.amount.push(claim.claim_amount);
            group.settlement.push(claim.settlement_days as f64);
        }

        groups
            .into_iter()
            .map(|((provider, state, ins_type), group)| {
                let text = format!(
                    "{provider} in {state} for {ins_type} insurance has processed {} claims \
                     with average amount ${:.2}. Total claims value: ${:.2}, largest claim: ${:.2}. \
                     Average settlement time: {:.2} days.",
                    group.amount.count,
                    group.amount.mean(),
                    group.amount.sum,
                    group.amount.max,
                    group.settlement.mean(),
                );
                Document::new(
                    DocumentKind::ClaimsSummary,
                    &format!("{}/{}/{}", provider, state, ins_type),
                    state,
                    Some(ins_type),
                    Some(provider),
                    CLAIMS_FILE.to_string(),
                    text,
                )
            })
            .collect()
    }

    fn market_overviews(dataset: &Dataset) -> Vec<Document> {
        let mut groups: BTreeMap<(String, String), MarketGroup> = BTreeMap::new();
        for rate in &dataset.rates {
            let group = groups
                .entry((rate.state.clone(), rate.insurance_type.clone()))
                .or_default();
            group.rate.push(rate.monthly_rate);
            group.providers.insert(rate.provider.clone());
        }

        groups
            .into_iter()
            .map(|((state, ins_type), group)| {
                let text = format!(
                    "In {state}, {ins_type} insurance market has {} providers with average monthly \
                     rate of ${:.2}. Rates range from ${:.2} to ${:.2}.",
                    group.providers.len(),
                    group.rate.mean(),
                    group.rate.min,
                    group.rate.max,
                );
                Document::new(
                    DocumentKind::MarketOverview,
                    &format!("{}/{}", state, ins_type),
                    state,
                    Some(ins_type),
                    None,
                    RATES_FILE.to_string(),
                    text,
                )
            })
            .collect()
    }

    fn filing_documents(dataset: &Dataset) -> Vec<Document> {
        dataset
            .filings
            .iter()
            .map(|filing| {
                let mut text = format!(
                    "Regulatory filing {} in {}: {} Filed on {}, effective {}. Impact: {}.",
                    filing.filing_id,
                    filing.state,
                    filing.description,
                    filing.filing_date,
                    filing.effective_date,
                    filing.impact,
                );
                if let Some(provider) = filing.single_provider() {
                    text.push_str(&format!(" Filed by {}.", provider));
                }

                Document::new(
                    DocumentKind::RegulatoryFiling,
                    &filing.filing_id,
                    filing.state.clone(),
                    infer_line(&filing.description),
                    filing.single_provider().map(str::to_string),
                    FILINGS_FILE.to_string(),
                    text,
                )
            })
            .collect()
    }
}

/// Filings carry no line of business column; pick it up from the text.
fn infer_line(description: &str) -> Option<String> {
    let lower = description.to_lowercase();
    ["auto", "home", "life", "health"]
        .into_iter()
        .find(|line| lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == *line))
        .map(str::to_string)
}
