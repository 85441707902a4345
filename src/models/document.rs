// file: src/models/document.rs
// description: core document model derived from raw records
// reference: internal data structures

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    RateSummary,
    ClaimsSummary,
    MarketOverview,
    RegulatoryFiling,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateSummary => "rate_summary",
            Self::ClaimsSummary => "claims_summary",
            Self::MarketOverview => "market_overview",
            Self::RegulatoryFiling => "regulatory_filing",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rate_summary" => Ok(Self::RateSummary),
            "claims_summary" => Ok(Self::ClaimsSummary),
            "market_overview" => Ok(Self::MarketOverview),
            "regulatory_filing" => Ok(Self::RegulatoryFiling),
            other => Err(format!("unknown document kind: {}", other)),
        }
    }
}

/// A source record in narrative form. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub kind: DocumentKind,
    pub jurisdiction: String,
    pub line_of_business: Option<String>,
    pub provider: Option<String>,
    pub source: String,
    pub text: String,
    pub content_hash: String,
}

impl Document {
    pub fn new(
        kind: DocumentKind,
        key: &str,
        jurisdiction: String,
        line_of_business: Option<String>,
        provider: Option<String>,
        source: String,
        text: String,
    ) -> Self {
        let id = format!("{}:{}", kind.as_str(), key);
        let content_hash = Self::compute_hash(&text);

        Self {
            id,
            kind,
            jurisdiction,
            line_of_business,
            provider,
            source,
            text,
            content_hash,
        }
    }

    fn compute_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_creation() {
        let doc = Document::new(
            DocumentKind::RateSummary,
            "Geico/CA/auto",
            "CA".to_string(),
            Some("auto".to_string()),
            Some("Geico".to_string()),
            "sample_rates.csv".to_string(),
            "Geico offers auto insurance in CA".to_string(),
        );

        assert_eq!(doc.id, "rate_summary:Geico/CA/auto");
        assert_eq!(doc.content_hash.len(), 64);
        assert_eq!(doc.kind, DocumentKind::RateSummary);
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [
            DocumentKind::RateSummary,
            DocumentKind::ClaimsSummary,
            DocumentKind::MarketOverview,
            DocumentKind::RegulatoryFiling,
        ] {
            assert_eq!(kind.as_str().parse::<DocumentKind>().unwrap(), kind);
        }
        assert!("policy".parse::<DocumentKind>().is_err());
    }
}
