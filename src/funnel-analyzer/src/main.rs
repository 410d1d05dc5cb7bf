//! Funnel analyzer: stage-to-stage conversion, drop-off and bottlenecks,
//! with optional per-segment comparison.

use std::path::PathBuf;

use anyhow::Context;
use campaign_core::input::read_document;
use campaign_core::output::render;
use campaign_core::OutputFormat;
use campaign_reporting::funnel;
use campaign_reporting::FunnelDocument;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "funnel-analyzer")]
#[command(about = "Conversion funnel analysis with bottleneck detection")]
#[command(version)]
struct Cli {
    /// Path to a JSON file with a `funnel` object and optional `segments`
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn main() -> anyhow::Result<()> {
    campaign_core::telemetry::init_tracing("warn");
    let cli = Cli::parse();

    let document: FunnelDocument = read_document(&cli.input)
        .with_context(|| format!("Failed to load funnel from {}", cli.input.display()))?;
    info!(
        stages = document.funnel.stages.len(),
        segments = document.segments.len(),
        "Loaded funnel"
    );

    let report = funnel::analyze(&document)?;
    println!("{}", render(cli.format, &report, |r| r.to_string())?);
    Ok(())
}
