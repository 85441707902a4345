// file: src/agent/skills.rs
// description: keyword routing to analysis skills and their prompt templates
// reference: internal prompt templates

use crate::models::{Query, SkillKind};

const BENCHMARK_KEYWORDS: [&str; 8] = [
    "benchmark", "compare", "rate", "cheapest", "lowest", "provider", "price", "premium",
];

const TREND_KEYWORDS: [&str; 6] = ["trend", "pattern", "claim", "change", "increase", "decrease"];

pub const TREND_PERIOD: &str = "12 months";

/// Substring match on the lowercased query, so "rates" and "claims" route
/// like "rate" and "claim". Benchmark keywords win over trend keywords.
pub fn select_skill(query: &str) -> SkillKind {
    let lowered = query.to_lowercase();

    if BENCHMARK_KEYWORDS.iter().any(|word| lowered.contains(word)) {
        SkillKind::BenchmarkRates
    } else if TREND_KEYWORDS.iter().any(|word| lowered.contains(word)) {
        SkillKind::AnalyzeTrends
    } else {
        SkillKind::GenerateRecommendations
    }
}

pub fn render_prompt(skill: SkillKind, query: &Query, data: &str) -> String {
    let body = match skill {
        SkillKind::BenchmarkRates => benchmark_rates(query, data),
        SkillKind::AnalyzeTrends => analyze_trends(data),
        SkillKind::GenerateRecommendations => generate_recommendations(data),
    };

    format!("{}\nUser question: {}\n", body, query.text.trim())
}

fn benchmark_rates(query: &Query, data: &str) -> String {
    let insurance_type = query.insurance_type_filter().unwrap_or("all insurance types");
    let region = query.region_filter().unwrap_or("all states");

    format!(
        r#"You are an expert insurance market analyst.

Insurance Type: {insurance_type}
Region: {region}

Data:
{data}

Answer the user's query with a concise, easy-to-understand summary.
Include key stats, top providers and rates if relevant.
If the data spans multiple regions or products, mention any notable trends or differences.
Avoid rigid bullet formatting unless listing providers/rates is most relevant.

Example:
"The average auto insurance premium in California is $195. The three cheapest providers are Progressive ($185), Geico ($190), and StateFarm ($200). Progressive's rate is currently the lowest in the market."
"#
    )
}

fn analyze_trends(data: &str) -> String {
    format!(
        r#"You are analyzing insurance market trends.

Historical Data:
{data}

Summarize key claim or premium trends for the past {TREND_PERIOD} in a concise and business-friendly manner.
Highlight only the most significant changes, actionable insights, or shifts.
Use percentages or numbers where possible, and keep each point clear and brief.

Example:
"Claims volume rose 12% in the last 12 months, with a spike in Q2. Average premiums increased by 7%. Progressive gained 2% market share while losses rose for small providers."
"#
    )
}

fn generate_recommendations(data: &str) -> String {
    format!(
        r#"You are a pricing strategy advisor for insurance.

Market Data:
{data}

Give 3-5 actionable recommendations for pricing strategy, each as a short and clear statement.
No lengthy rationale, just the action and a brief reason. Use numbers/targets if possible.

Example:
- Lower rates 5% for low-risk zip codes to boost competitiveness.
- Increase premiums for high claim segments by 8% to improve profitability.
- Add young driver discounts to expand market share.
"#
    )
}
