// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use market_intel::utils::logging::{
    format_error, format_info, format_score, format_step, format_success, format_warning,
};
use market_intel::{
    AppState, Config, GeminiClient, IndexBuilder, IndexManifest, LanceDbClient, MarkdownRenderer,
    MarketIntelligenceAgent, Query, Validator, build_embedder, generate_sample_data, load_index,
    reset_index, server,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

const SUMMARY_FILE: &str = "setup_summary.txt";
const SMOKE_TEST_QUERY: &str = "Compare auto insurance rates in California";

#[derive(Parser)]
#[command(name = "market_intel")]
#[command(author = "cipher")]
#[command(version)]
#[command(about = "Insurance market intelligence assistant using LanceDB and Gemini", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate sample data, build the index and write the setup summary
    Setup {
        /// Use the files already in the data directory
        #[arg(long)]
        skip_generate: bool,

        #[arg(long)]
        seed: Option<u64>,

        /// Ask a test question once the index is built (needs GOOGLE_API_KEY)
        #[arg(long)]
        smoke_test: bool,
    },

    /// Write sample rate, claims and filings files
    Generate {
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, value_name = "NUM")]
        rates: Option<usize>,

        #[arg(long, value_name = "NUM")]
        claims: Option<usize>,
    },

    /// Rebuild the vector index from the data directory
    Build,

    /// Start the web interface
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer a single question from the command line
    Ask {
        query: String,

        #[arg(short = 't', long)]
        insurance_type: Option<String>,

        #[arg(short, long)]
        region: Option<String>,
    },

    /// Show the closest chunks for a query without calling the model
    Search {
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    Stats,

    Reset {
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    market_intel::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Insurance Market Intelligence");

    let mut config = if cli.config.exists() {
        info!("Loading configuration from: {}", cli.config.display());
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using defaults and environment",
            cli.config.display()
        );
        Config::load(None).context("Failed to load configuration")?
    };

    match cli.command {
        Commands::Setup {
            skip_generate,
            seed,
            smoke_test,
        } => {
            if let Some(seed) = seed {
                config.data.seed = seed;
            }
            cmd_setup(&config, skip_generate, smoke_test, cli.color).await?;
        }
        Commands::Generate {
            seed,
            rates,
            claims,
        } => {
            if let Some(seed) = seed {
                config.data.seed = seed;
            }
            if let Some(rates) = rates {
                config.data.rate_records = rates;
            }
            if let Some(claims) = claims {
                config.data.claim_records = claims;
            }
            config.validate().context("Invalid generation settings")?;
            cmd_generate(&config)?;
        }
        Commands::Build => {
            cmd_build(&config, cli.color).await?;
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                Validator::validate_port(port)?;
                config.server.port = port;
            }
            cmd_serve(&config).await?;
        }
        Commands::Ask {
            query,
            insurance_type,
            region,
        } => {
            let mut query = Query::new(query);
            query.insurance_type = insurance_type;
            query.region = region;
            cmd_ask(&config, &query).await?;
        }
        Commands::Search { query, limit } => {
            cmd_search(&config, &query, limit).await?;
        }
        Commands::Stats => {
            cmd_stats(&config).await?;
        }
        Commands::Reset { confirm } => {
            cmd_reset(&config, confirm).await?;
        }
    }

    Ok(())
}

async fn cmd_setup(config: &Config, skip_generate: bool, smoke_test: bool, colored: bool) -> Result<()> {
    let total = if smoke_test { 4 } else { 3 };

    if skip_generate {
        println!("{}", format_step(1, total, "Using existing data files"));
    } else {
        println!("{}", format_step(1, total, "Generating sample data"));
        cmd_generate(config)?;
    }

    println!("{}", format_step(2, total, "Building vector index"));
    let report = build(config, colored).await?;

    println!("{}", format_step(3, total, "Writing setup summary"));
    report
        .write_summary(Path::new(SUMMARY_FILE))
        .context("Failed to write setup summary")?;
    println!("\n{}", report.summary_text());

    if smoke_test {
        println!("{}", format_step(4, total, "Testing the agent"));
        if config.llm.api_key.is_none() {
            println!(
                "{}",
                format_warning("GOOGLE_API_KEY not set, skipping the test query")
            );
        } else {
            let query = Query::new(SMOKE_TEST_QUERY)
                .with_insurance_type("auto")
                .with_region("CA");
            cmd_ask(config, &query).await?;
        }
    }

    println!("{}", format_success("Setup complete"));
    Ok(())
}

fn cmd_generate(config: &Config) -> Result<()> {
    let (dataset, files) = generate_sample_data(config, Utc::now().date_naive())
        .context("Failed to generate sample data")?;

    for file in &files {
        println!("{}", format_info(&format!("Wrote {}", file.display())));
    }
    println!(
        "{}",
        format_success(&format!(
            "Generated {} rates, {} claims and {} filings (seed {})",
            dataset.rates.len(),
            dataset.claims.len(),
            dataset.filings.len(),
            config.data.seed
        ))
    );

    Ok(())
}

async fn cmd_build(config: &Config, colored: bool) -> Result<()> {
    let report = build(config, colored).await?;
    println!("\n{}", report.summary_text());
    Ok(())
}

async fn build(config: &Config, colored: bool) -> Result<market_intel::BuildReport> {
    let embedder = build_embedder(&config.embedding).context("Failed to create embedder")?;
    info!(
        "Embedding with {} ({}, {} dimensions)",
        embedder.name(),
        embedder.model(),
        embedder.dimension()
    );

    let report = IndexBuilder::new(config.clone(), embedder)
        .with_progress(true, colored)
        .build()
        .await
        .context("Index build failed; the previous index was left untouched")?;

    println!(
        "{}",
        format_success(&format!(
            "Indexed {} documents as {} chunks",
            report.documents, report.chunks
        ))
    );
    Ok(report)
}

async fn load_agent(config: &Config) -> Result<(MarketIntelligenceAgent, IndexManifest)> {
    let embedder = build_embedder(&config.embedding).context("Failed to create embedder")?;
    let (index, manifest) = load_index(config, embedder.as_ref())
        .await
        .context("Failed to load the vector index")?;
    let llm = GeminiClient::from_config(&config.llm).context("Failed to create Gemini client")?;

    let agent = MarketIntelligenceAgent::new(
        embedder,
        Arc::new(index),
        Arc::new(llm),
        config.retrieval.clone(),
    );
    Ok((agent, manifest))
}

async fn cmd_serve(config: &Config) -> Result<()> {
    server::ensure_password(&config.server)?;

    let (agent, manifest) = load_agent(config).await?;
    let state = Arc::new(AppState::new(agent, config.server.clone(), Some(manifest)));

    info!("{}", state.health().format());
    server::serve(state).await.context("Server failed")?;
    Ok(())
}

async fn cmd_ask(config: &Config, query: &Query) -> Result<()> {
    Validator::validate_query_text(&query.text)?;
    Validator::validate_filter_value("insurance_type", query.insurance_type.as_deref())?;
    Validator::validate_filter_value("region", query.region.as_deref())?;

    let (agent, _) = load_agent(config).await?;
    let answer = match agent.answer(query).await {
        Ok(answer) => answer,
        Err(e) => {
            println!("{}", format_error(&e.to_string()));
            return Err(e).context("Query failed");
        }
    };

    println!("\nQuestion: \"{}\"", answer.query);
    println!("Skill: {}", answer.skill.title());
    println!("{}", "=".repeat(80));
    println!("{}", MarkdownRenderer::new().to_plain_text(&answer.text));
    println!("{}", "=".repeat(80));

    if answer.filters_relaxed {
        println!(
            "{}",
            format_warning("No records matched the filters; showing unfiltered evidence")
        );
    }

    println!("\nEvidence:");
    for evidence in &answer.evidence {
        println!(
            "{}",
            format_score(evidence.rank, evidence.score, &evidence.document_id)
        );
    }
    println!(
        "\nConfidence: {:.0}%  Answer id: {}",
        answer.confidence * 100.0,
        answer.id
    );

    Ok(())
}

async fn cmd_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    Validator::validate_query_text(query)?;
    info!("Searching for: {}", query);

    let embedder = build_embedder(&config.embedding).context("Failed to create embedder")?;
    let (index, _) = load_index(config, embedder.as_ref())
        .await
        .context("Failed to load the vector index")?;

    let embedding = embedder
        .embed(query)
        .await
        .context("Failed to embed query")?;
    let results = index.search(&embedding, limit).context("Vector search failed")?;

    if results.is_empty() {
        println!("\nNo results found for query: \"{}\"\n", query);
        return Ok(());
    }

    println!("\nSearch Results for: \"{}\"\n", query);
    println!("Found {} result(s)\n", results.len());
    println!("{}", "=".repeat(80));

    for result in &results {
        println!("\n{}", format_score(result.rank, result.score, &result.chunk.id));
        println!(
            "   {} | {} | {}",
            result.chunk.kind,
            result.chunk.jurisdiction,
            result.chunk.line_of_business.as_deref().unwrap_or("-")
        );
        println!("   Preview:");
        for line in result.preview(300).lines().take(5) {
            println!("     {}", line);
        }
    }

    println!("\n{}", "=".repeat(80));
    info!("Search complete");

    Ok(())
}

async fn cmd_stats(config: &Config) -> Result<()> {
    info!("Gathering statistics");

    let client = LanceDbClient::new(config.index.clone())
        .await
        .context("Failed to create LanceDB client")?;

    if !client.ping().await? {
        error!("Cannot connect to LanceDB");
        return Err(anyhow::anyhow!("Database connection failed"));
    }

    println!("Store: {}", client.uri());
    println!("Documents: {}", client.get_document_count().await?);
    println!("Chunks: {}", client.get_chunk_count().await?);

    if client.table_exists(client.documents_table()).await? {
        let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for document in client.load_documents().await? {
            *by_kind.entry(document.kind.to_string()).or_default() += 1;
        }
        for (kind, count) in by_kind {
            println!("  {}: {}", kind, count);
        }
    }

    match IndexManifest::load(&config.index.manifest_path) {
        Ok(manifest) => {
            println!(
                "Embeddings: {}/{} ({} dimensions)",
                manifest.provider, manifest.model, manifest.dimension
            );
            println!(
                "Chunking: {} chars, {} overlap",
                manifest.chunk_size, manifest.chunk_overlap
            );
            println!("Data: {}", manifest.data_dir);
            println!(
                "Built at: {}",
                manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        Err(e) => println!("{}", format_warning(&e.to_string())),
    }

    Ok(())
}

async fn cmd_reset(config: &Config, confirm: bool) -> Result<()> {
    if !confirm {
        error!("This will delete the vector index. Use --confirm to proceed");
        return Ok(());
    }

    warn!("Resetting index - all indexed data will be lost");
    reset_index(config).await.context("Failed to reset index")?;
    println!("{}", format_success("Index reset complete"));

    Ok(())
}
