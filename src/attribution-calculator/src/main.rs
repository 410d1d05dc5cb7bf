//! Attribution calculator: distributes conversion credit and revenue across
//! the channels of each customer journey.

use std::path::PathBuf;

use anyhow::Context;
use campaign_core::input::read_document;
use campaign_core::output::render;
use campaign_core::OutputFormat;
use campaign_reporting::attribution::{self, DEFAULT_HALF_LIFE_DAYS};
use campaign_reporting::{AttributionModel, JourneyDocument};
use clap::{Parser, ValueEnum};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    FirstTouch,
    LastTouch,
    Linear,
    TimeDecay,
    PositionBased,
    /// Run every model and compare them side by side
    All,
}

impl ModelArg {
    fn model(self) -> Option<AttributionModel> {
        match self {
            Self::FirstTouch => Some(AttributionModel::FirstTouch),
            Self::LastTouch => Some(AttributionModel::LastTouch),
            Self::Linear => Some(AttributionModel::Linear),
            Self::TimeDecay => Some(AttributionModel::TimeDecay),
            Self::PositionBased => Some(AttributionModel::PositionBased),
            Self::All => None,
        }
    }
}

#[derive(Parser)]
#[command(name = "attribution-calculator")]
#[command(about = "Multi-touch attribution across customer journeys")]
#[command(version)]
struct Cli {
    /// Path to a JSON file with a `journeys` array
    input: PathBuf,

    /// Attribution model to apply
    #[arg(short, long, value_enum, default_value = "all")]
    model: ModelArg,

    /// Half-life in days for the time-decay model
    #[arg(long, default_value_t = DEFAULT_HALF_LIFE_DAYS)]
    half_life: f64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn main() -> anyhow::Result<()> {
    campaign_core::telemetry::init_tracing("warn");
    let cli = Cli::parse();

    let document: JourneyDocument = read_document(&cli.input)
        .with_context(|| format!("Failed to load journeys from {}", cli.input.display()))?;
    document.validate()?;
    info!(journeys = document.journeys.len(), "Loaded journeys");

    let rendered = match cli.model.model() {
        Some(model) => {
            let report = attribution::attribute(&document.journeys, model, cli.half_life)?;
            render(cli.format, &report, |r| r.to_string())?
        }
        None => {
            let comparison = attribution::compare_models(&document.journeys, cli.half_life)?;
            render(cli.format, &comparison, |c| c.to_string())?
        }
    };

    println!("{rendered}");
    Ok(())
}
