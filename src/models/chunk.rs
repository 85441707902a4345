// file: src/models/chunk.rs
// description: bounded text span of a document used for retrieval
// reference: internal data structures

use crate::models::document::{Document, DocumentKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub position: u32,
    pub text: String,
    pub kind: DocumentKind,
    pub jurisdiction: String,
    pub line_of_business: Option<String>,
    pub provider: Option<String>,
}

impl Chunk {
    pub fn from_document(document: &Document, position: u32, text: String) -> Self {
        Self {
            id: format!("{}#{}", document.id, position),
            document_id: document.id.clone(),
            position,
            text,
            kind: document.kind,
            jurisdiction: document.jurisdiction.clone(),
            line_of_business: document.line_of_business.clone(),
            provider: document.provider.clone(),
        }
    }

    /// Case-insensitive match against an insurance type filter. Chunks
    /// without a line of business never match a concrete filter.
    pub fn matches_line(&self, insurance_type: &str) -> bool {
        self.line_of_business
            .as_deref()
            .is_some_and(|line| line.eq_ignore_ascii_case(insurance_type))
    }

    pub fn matches_region(&self, region: &str) -> bool {
        self.jurisdiction.eq_ignore_ascii_case(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_traces_to_document() {
        let doc = Document::new(
            DocumentKind::MarketOverview,
            "TX/home",
            "TX".to_string(),
            Some("home".to_string()),
            None,
            "sample_rates.csv".to_string(),
            "In TX, home insurance market has 4 providers".to_string(),
        );

        let chunk = Chunk::from_document(&doc, 2, "home insurance".to_string());
        assert_eq!(chunk.id, "market_overview:TX/home#2");
        assert_eq!(chunk.document_id, doc.id);
        assert!(chunk.matches_line("HOME"));
        assert!(chunk.matches_region("tx"));
        assert!(!chunk.matches_region("CA"));
    }
}
