use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use acc_core::Fetcher;
use acc_inference::{create_model, InferenceConfig};
use acc_scrapers::dedup::DEFAULT_MAX_PER_DOMAIN;
use acc_scrapers::{default_providers, CrawlLimits, CrawlManager, HttpFetcher, SearchConfig};
use acc_storage::{create_storage, StorageKind, DEFAULT_CONTENT_DIR};

mod logging;
mod prompt;
mod report;

#[derive(Parser, Debug)]
#[command(author, version, about = "AI-driven content crawler", long_about = None)]
pub struct Cli {
    /// Maximum number of content pieces to collect
    #[arg(long, default_value_t = 15)]
    max_content: usize,
    /// Maximum number of pages to visit
    #[arg(long, default_value_t = 50)]
    max_pages: usize,
    /// Topic to crawl for. Asked interactively when omitted.
    #[arg(long)]
    query: Option<String>,
    /// Maximum items kept from one domain. Asked interactively when omitted.
    #[arg(long)]
    max_per_domain: Option<usize>,
    #[arg(long, default_value = DEFAULT_CONTENT_DIR)]
    output_dir: PathBuf,
    /// Where accepted content goes: json or memory
    #[arg(long, default_value = "json")]
    storage: StorageKind,
    /// Gemini model name, overrides GOOGLE_MODEL
    #[arg(long)]
    model: Option<String>,
    #[arg(long, default_value = logging::DEFAULT_LOG_FILE)]
    log_file: PathBuf,
    /// Upper bound of the random pause between steps, in milliseconds
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(&cli.log_file)?;

    let mut inference_config = InferenceConfig::from_env();
    if let Some(model) = &cli.model {
        inference_config = inference_config.with_model(model);
    }
    let model = create_model(&inference_config).context("Failed to initialise the inference model")?;
    info!("🧠 Inference model initialized successfully (using {})", model.name());

    let query = match cli.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => query.to_string(),
        _ => prompt::prompt_query()?,
    };
    let max_per_domain = match cli.max_per_domain {
        Some(0) => DEFAULT_MAX_PER_DOMAIN,
        Some(n) => n,
        None => prompt::prompt_max_per_domain()?,
    };

    let storage = create_storage(cli.storage, &cli.output_dir)
        .await
        .with_context(|| format!("Failed to prepare storage in {}", cli.output_dir.display()))?;
    info!("💾 Storage initialized successfully (using {:?})", cli.storage);

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);
    let providers = default_providers(&SearchConfig::from_env(), fetcher.clone())?;
    let limits = CrawlLimits {
        max_content: cli.max_content,
        max_pages: cli.max_pages,
        max_per_domain,
        max_delay: Duration::from_millis(cli.delay_ms),
    };

    println!("\nSearching for content about: {}", query);
    println!("Crawling has started. This may take a few minutes...\n");

    let report = CrawlManager::new(query, fetcher, providers, model, storage)
        .with_limits(limits)
        .run()
        .await;

    print!("{}", report::Summary(&report));
    Ok(())
}
