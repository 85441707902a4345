// file: src/server/state.rs
// description: shared state handed to every request handler
// reference: axum State extractor

use crate::agent::MarketIntelligenceAgent;
use crate::config::ServerConfig;
use crate::index::IndexManifest;
use crate::models::ALL;
use crate::utils::{HealthCheck, HealthReport};
use std::sync::Arc;
use tokio::sync::Semaphore;

const DEFAULT_INSURANCE_TYPES: [&str; 4] = ["auto", "home", "life", "health"];
const DEFAULT_REGIONS: [&str; 5] = ["CA", "TX", "FL", "NY", "PA"];

/// Select options for the query form, `all` first.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub insurance_types: Vec<String>,
    pub regions: Vec<String>,
}

impl FilterOptions {
    pub fn from_values(insurance_types: Vec<String>, regions: Vec<String>) -> Self {
        Self {
            insurance_types: with_all(insurance_types, &DEFAULT_INSURANCE_TYPES),
            regions: with_all(regions, &DEFAULT_REGIONS),
        }
    }
}

fn with_all(values: Vec<String>, fallback: &[&str]) -> Vec<String> {
    let values: Vec<String> = if values.is_empty() {
        fallback.iter().map(|v| v.to_string()).collect()
    } else {
        values
    };

    std::iter::once(ALL.to_string())
        .chain(values.into_iter().filter(|v| !v.eq_ignore_ascii_case(ALL)))
        .collect()
}

pub struct AppState {
    pub agent: MarketIntelligenceAgent,
    pub config: ServerConfig,
    pub manifest: Option<IndexManifest>,
    pub options: FilterOptions,
    /// Shared by every query route.
    pub query_permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        agent: MarketIntelligenceAgent,
        config: ServerConfig,
        manifest: Option<IndexManifest>,
    ) -> Self {
        let options = FilterOptions::from_values(
            agent.index().lines_of_business(),
            agent.index().jurisdictions(),
        );

        let query_permits = Arc::new(Semaphore::new(config.max_concurrent_queries.max(1)));

        Self {
            agent,
            config,
            manifest,
            options,
            query_permits,
        }
    }

    pub fn health(&self) -> HealthReport {
        let index = self.agent.index();
        let index_check = if index.is_empty() {
            HealthCheck::unhealthy("index", "no chunks loaded; run `setup`")
        } else {
            HealthCheck::healthy("index", format!("{} chunks", index.len()))
        };

        let manifest_check = match &self.manifest {
            Some(manifest) => HealthCheck::healthy(
                "embeddings",
                format!(
                    "{}/{} ({} dimensions)",
                    manifest.provider, manifest.model, manifest.dimension
                ),
            ),
            None => HealthCheck::degraded("embeddings", "no index manifest loaded"),
        };

        HealthReport::new(vec![
            index_check,
            manifest_check,
            HealthCheck::healthy("llm", self.agent.model().to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_fall_back_to_defaults() {
        let options = FilterOptions::from_values(Vec::new(), Vec::new());
        assert_eq!(options.insurance_types, vec!["all", "auto", "home", "life", "health"]);
        assert_eq!(options.regions, vec!["all", "CA", "TX", "FL", "NY", "PA"]);
    }

    #[test]
    fn test_options_use_indexed_values() {
        let options = FilterOptions::from_values(
            vec!["auto".to_string(), "life".to_string()],
            vec!["GA".to_string()],
        );
        assert_eq!(options.insurance_types, vec!["all", "auto", "life"]);
        assert_eq!(options.regions, vec!["all", "GA"]);
    }
}
