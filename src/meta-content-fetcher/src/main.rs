//! Meta content fetcher: pulls recent Facebook Page posts and Instagram
//! Business media with their insights and exports them as CSV or JSON.

use std::path::PathBuf;

use anyhow::Context;
use campaign_core::config::load_dotenv;
use campaign_core::{FetcherConfig, OutputFormat};
use campaign_integrations::export;
use campaign_integrations::meta::DEFAULT_LIMIT;
use campaign_integrations::{fetch_content, FetchOptions, FetchResult, GraphClient};
use clap::{Parser, ValueEnum};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputKind {
    /// CSV file under the results directory
    Csv,
    /// Flat list of normalized records
    Json,
    /// Social media and campaigns documents together
    All,
    /// Organic aggregates shaped as roi-calculator input
    Campaigns,
    /// Posts grouped by platform
    #[value(name = "social_media")]
    SocialMedia,
}

#[derive(Parser)]
#[command(name = "meta-content-fetcher")]
#[command(about = "Fetch Facebook Page and Instagram post statistics from the Meta Graph API")]
#[command(version)]
struct Cli {
    /// Graph API access token
    #[arg(long, env = "META_TOKEN", hide_env_values = true)]
    token: String,

    /// Facebook Page ID
    #[arg(long, env = "META_PAGE_ID")]
    page_id: String,

    /// What to produce
    #[arg(long, value_enum, default_value = "all")]
    output: OutputKind,

    /// Stdout format for non-CSV outputs
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Only fetch Instagram media
    #[arg(long)]
    instagram_only: bool,

    /// Maximum posts per platform
    #[arg(long, default_value_t = DEFAULT_LIMIT as u64, value_parser = clap::value_parser!(u64).range(1..))]
    limit: u64,

    /// CSV file name prefix
    #[arg(short = 'o', long)]
    out_file: Option<String>,

    /// Graph API version, e.g. v21.0
    #[arg(long)]
    api_version: Option<String>,
}

fn text_summary(kind: OutputKind, result: &FetchResult) -> String {
    let stamp = campaign_integrations::records::format_fetched_at(&result.fetched_at);
    let mut out = format!(
        "Fetched {} Instagram and {} Facebook posts at {stamp}\n",
        result.instagram.len(),
        result.facebook.len()
    );
    if matches!(kind, OutputKind::Campaigns | OutputKind::All) {
        let campaigns = export::campaigns_document(result);
        out.push_str(&format!("Campaign aggregates: {}\n", campaigns.campaigns.len()));
        for c in &campaigns.campaigns {
            out.push_str(&format!(
                "  {}: {} impressions, {} clicks\n",
                c.name, c.impressions, c.clicks
            ));
        }
    }
    out
}

fn main() -> anyhow::Result<()> {
    campaign_core::telemetry::init_tracing("warn");
    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    load_dotenv(&cwd).context("Failed to read .env")?;

    let cli = Cli::parse();
    let mut config = FetcherConfig::load().context("Invalid CAMPAIGN_ANALYTICS configuration")?;
    if let Some(version) = cli.api_version.clone() {
        config.api_version = version;
    }

    let client = GraphClient::new(&config, cli.token.clone()).context("Failed to build HTTP client")?;
    let options = FetchOptions {
        page_id: cli.page_id.clone(),
        limit: usize::try_from(cli.limit).unwrap_or(usize::MAX),
        instagram_only: cli.instagram_only,
    };
    info!(page_id = %options.page_id, limit = options.limit, "Fetching Meta content");

    let result = fetch_content(&client, &options).context("Meta Graph API fetch failed")?;

    if cli.output == OutputKind::Csv {
        let path = export::write_csv(&result, &config.results_dir, cli.out_file.as_deref())
            .context("Failed to write CSV export")?;
        eprintln!(
            "Saved {} records to {}",
            result.all_records().count(),
            path.display()
        );
        return Ok(());
    }

    let rendered = match cli.format {
        OutputFormat::Text => text_summary(cli.output, &result),
        OutputFormat::Json => match cli.output {
            OutputKind::Json => serde_json::to_string_pretty(&export::records_document(&result))?,
            OutputKind::SocialMedia => serde_json::to_string_pretty(&export::social_media_document(&result))?,
            OutputKind::Campaigns => serde_json::to_string_pretty(&export::campaigns_document(&result))?,
            OutputKind::All | OutputKind::Csv => {
                serde_json::to_string_pretty(&export::combined_document(&result))?
            }
        },
    };
    print!("{rendered}");
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}
