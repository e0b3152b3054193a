use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reviewsignal_common::{categorize, score_or_neutral, BatchId, Config, SourceDescriptor};
use reviewsignal_ingest::{IngestDeps, IngestReport, PgReviewStore, ReviewStore};

#[derive(Parser)]
#[command(name = "reviewsignal", about = "Score and categorize reviews from CSV, JSON and API sources")]
struct Cli {
    /// Field holding the review text (overrides REVIEWSIGNAL_TEXT_FIELD)
    #[arg(long, global = true)]
    text_field: Option<String>,

    /// Append scored records to Postgres (requires DATABASE_URL)
    #[arg(long, global = true)]
    persist: bool,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a single source
    Import {
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Import every source listed in a descriptor file
    Batch {
        #[arg(long)]
        sources: PathBuf,
    },
    /// Score and categorize one text
    Analyze { text: String },
    /// Per-category counts of a stored batch
    Count {
        #[arg(long)]
        batch: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = Config::from_env()?;
    if let Some(field) = &cli.text_field {
        config.text_field = field.clone();
    }
    config.log_redacted();

    match &cli.command {
        Command::Import {
            kind,
            path,
            api_key,
        } => {
            let descriptor = SourceDescriptor::parse(kind, path.as_str(), api_key.clone())?;
            let deps = deps(&cli, config).await?;
            let report = deps.build_coordinator()?.import(&descriptor).await?;
            print_report(&report, cli.json, deps.config.sample_size)?;
        }
        Command::Batch { sources } => {
            let raw = tokio::fs::read_to_string(sources)
                .await
                .with_context(|| format!("failed to read {}", sources.display()))?;
            let descriptors = SourceDescriptor::list_from_json(&raw)?;
            let deps = deps(&cli, config).await?;
            let report = deps.build_coordinator()?.process(&descriptors).await?;
            print_report(&report, cli.json, deps.config.sample_size)?;
        }
        Command::Analyze { text } => {
            let deps = IngestDeps::builder().config(config).build();
            let (sentiment, error) = score_or_neutral(deps.scorer().as_ref(), text);
            if let Some(error) = error {
                tracing::warn!(error = %error, "Scorer failed, scored neutral");
            }
            let category = categorize(sentiment.polarity);
            if cli.json {
                let out = serde_json::json!({
                    "polarity": sentiment.polarity,
                    "subjectivity": sentiment.subjectivity,
                    "category": category,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!(
                    "polarity={:.3} subjectivity={:.3} category={}",
                    sentiment.polarity, sentiment.subjectivity, category
                );
            }
        }
        Command::Count { batch } => {
            let store = connect_store(&config).await?;
            let summary = store
                .count_by_batch_and_category(&BatchId::new(batch.as_str()))
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reviewsignal=info,reviewsignal_ingest=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn deps(cli: &Cli, config: Config) -> Result<IngestDeps> {
    if !cli.persist {
        return Ok(IngestDeps::builder().config(config).build());
    }
    let store: Arc<dyn ReviewStore> = Arc::new(connect_store(&config).await?);
    Ok(IngestDeps::builder().config(config).store(store).build())
}

async fn connect_store(config: &Config) -> Result<PgReviewStore> {
    let store = PgReviewStore::connect(config.require_database_url()?).await?;
    store.migrate().await?;
    tracing::info!("Migrations complete");
    Ok(store)
}

fn print_report(report: &IngestReport, json: bool, sample_size: usize) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json(sample_size)?)?);
    } else {
        print_text_report(report, sample_size);
    }
    report.ensure_any_source_read()?;
    Ok(())
}

fn print_text_report(report: &IngestReport, sample_size: usize) {
    println!("batch {}", report.batch_id);
    println!("{}", report.summary);
    for outcome in &report.sources {
        match &outcome.error {
            Some(error) => println!("  {} FAILED: {error}", outcome.source),
            None => println!(
                "  {} scored={} skipped={}",
                outcome.source, outcome.scored, outcome.skipped
            ),
        }
    }
    for record in report.sample(sample_size) {
        println!(
            "  [{}] {:+.2} {}",
            record.category(),
            record.polarity(),
            record.text()
        );
    }
}
