use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use repostats::models::CollectionReport;
use repostats::{CollectorConfig, Config, Credentials, GitHubClient, RepositoryStatsCollector, Storage};

#[derive(Parser, Debug)]
#[command(name = "repostats")]
#[command(version = "0.1.0")]
#[command(about = "Collect repository statistics for a GitHub user")]
struct Args {
    /// GitHub user whose repositories are collected
    #[arg(short, long)]
    username: String,

    /// Output format (json, text)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Repositories whose details are fetched concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Database path for cached reports
    #[arg(long)]
    database: Option<String>,

    /// Reuse a cached report younger than the cache TTL
    #[arg(long)]
    cached: bool,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("repostats=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env()?;

    let storage = Storage::new(args.database.as_deref().unwrap_or(&config.database_path))?;

    let credentials = Credentials {
        token: config.github_token.clone(),
    };
    let client = GitHubClient::new(&config.api_url, config.retry_policy(), config.request_timeout)?;
    let mut collector_config = CollectorConfig::from(&config);
    if let Some(concurrency) = args.concurrency {
        collector_config.concurrency_limit = concurrency.max(1);
    }
    collector_config.show_progress = !args.quiet;
    let collector = RepositoryStatsCollector::new(client, collector_config);

    let cached = if args.cached {
        storage.load_report(&args.username, config.cache_ttl)?
    } else {
        None
    };

    let report = match cached {
        Some(report) if report.pending_details() == 0 => {
            tracing::info!("Using cached report from {}", report.fetched_at);
            report
        }
        Some(report) => {
            tracing::info!(
                "Resuming cached report with {} pending repositories",
                report.pending_details()
            );
            collector
                .resume(report, &credentials)
                .await
                .with_context(|| format!("Could not resume collection for {}", args.username))?
        }
        None => {
            tracing::info!("Starting collection for GitHub user: {}", args.username);
            collector
                .collect(&args.username, &credentials)
                .await
                .with_context(|| format!("Could not retrieve repository data for {}", args.username))?
        }
    };

    storage.save_report(&report)?;

    let failed = report.failed_details().count();
    if failed > 0 {
        tracing::warn!("Details could not be fetched for {} repositories", failed);
    }

    output_report(&report, &args)?;

    Ok(())
}

fn output_report(report: &CollectionReport, args: &Args) -> anyhow::Result<()> {
    let output = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(report)?,
        _ => repostats::report::format_text(report),
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}
