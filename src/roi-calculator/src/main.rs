//! ROI calculator: per-campaign efficiency metrics checked against channel
//! benchmarks, plus a portfolio summary.

use std::path::PathBuf;

use anyhow::Context;
use campaign_core::input::read_document;
use campaign_core::output::render;
use campaign_core::OutputFormat;
use campaign_reporting::roi;
use campaign_reporting::CampaignDocument;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "roi-calculator")]
#[command(about = "Campaign ROI with channel benchmark flags")]
#[command(version)]
struct Cli {
    /// Path to a JSON file with a `campaigns` array
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn main() -> anyhow::Result<()> {
    campaign_core::telemetry::init_tracing("warn");
    let cli = Cli::parse();

    let document: CampaignDocument = read_document(&cli.input)
        .with_context(|| format!("Failed to load campaigns from {}", cli.input.display()))?;
    document.validate()?;

    let report = roi::calculate(&document.campaigns);
    info!(
        campaigns = report.summary.campaigns,
        flagged = report.summary.flagged_campaigns,
        "Evaluated campaigns"
    );

    println!("{}", render(cli.format, &report, |r| r.to_string())?);
    Ok(())
}
