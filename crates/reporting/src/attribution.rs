//! Multi-touch revenue attribution: splits each converted journey's credit
//! across its touchpoints under one of five models and aggregates per channel.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use campaign_core::input::ensure_non_negative;
use campaign_core::output::fmt_currency;
use campaign_core::ratio::pct_or_zero;
use campaign_core::{AnalyticsError, AnalyticsResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

pub const DEFAULT_HALF_LIFE_DAYS: f64 = 7.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionModel {
    FirstTouch,
    LastTouch,
    Linear,
    TimeDecay,
    PositionBased,
}

impl AttributionModel {
    pub const ALL: [AttributionModel; 5] = [
        AttributionModel::FirstTouch,
        AttributionModel::LastTouch,
        AttributionModel::Linear,
        AttributionModel::TimeDecay,
        AttributionModel::PositionBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstTouch => "first_touch",
            Self::LastTouch => "last_touch",
            Self::Linear => "linear",
            Self::TimeDecay => "time_decay",
            Self::PositionBased => "position_based",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FirstTouch => "First-Touch",
            Self::LastTouch => "Last-Touch",
            Self::Linear => "Linear",
            Self::TimeDecay => "Time-Decay",
            Self::PositionBased => "Position-Based",
        }
    }
}

// ─── Input ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Touchpoint {
    pub channel: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub interaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    #[serde(alias = "journey_id")]
    pub id: String,
    pub touchpoints: Vec<Touchpoint>,
    pub converted: bool,
    #[serde(default)]
    pub revenue: f64,
}

impl Journey {
    /// Whether this journey hands out any credit.
    pub fn is_creditable(&self) -> bool {
        self.converted && !self.touchpoints.is_empty()
    }
}

/// Top-level shape of an attribution input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyDocument {
    pub journeys: Vec<Journey>,
}

impl JourneyDocument {
    /// Range checks serde cannot express.
    pub fn validate(&self) -> AnalyticsResult<()> {
        for (i, journey) in self.journeys.iter().enumerate() {
            ensure_non_negative(|| format!("journeys[{i}].revenue"), journey.revenue)?;
        }
        Ok(())
    }
}

/// Accepts RFC 3339, a naive ISO datetime (read as UTC) or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognized timestamp `{raw}`"))
    })
}

pub fn validate_half_life(half_life_days: f64) -> AnalyticsResult<()> {
    if half_life_days.is_finite() && half_life_days > 0.0 {
        Ok(())
    } else {
        Err(AnalyticsError::invalid_argument(
            "half-life",
            format!("must be a positive number of days, got {half_life_days}"),
        ))
    }
}

// ─── Model evaluation ───────────────────────────────────────────────────────

/// Per-touchpoint weights for one journey. Empty input yields an empty vector;
/// otherwise the weights sum to 1.
pub fn touchpoint_weights(
    model: AttributionModel,
    touchpoints: &[Touchpoint],
    half_life_days: f64,
) -> Vec<f64> {
    let n = touchpoints.len();
    if n == 0 {
        return Vec::new();
    }

    match model {
        AttributionModel::FirstTouch => {
            let mut weights = vec![0.0; n];
            weights[0] = 1.0;
            weights
        }
        AttributionModel::LastTouch => {
            let mut weights = vec![0.0; n];
            weights[n - 1] = 1.0;
            weights
        }
        AttributionModel::Linear => vec![1.0 / n as f64; n],
        AttributionModel::TimeDecay => time_decay_weights(touchpoints, half_life_days),
        AttributionModel::PositionBased => match n {
            1 => vec![1.0],
            2 => vec![0.5, 0.5],
            _ => {
                let interior = 0.2 / (n - 2) as f64;
                let mut weights = vec![interior; n];
                weights[0] = 0.4;
                weights[n - 1] = 0.4;
                weights
            }
        },
    }
}

fn time_decay_weights(touchpoints: &[Touchpoint], half_life_days: f64) -> Vec<f64> {
    let n = touchpoints.len();
    let last = touchpoints[n - 1].timestamp;
    let raw: Vec<f64> = touchpoints
        .iter()
        .map(|tp| {
            let age_days = (last - tp.timestamp).num_milliseconds() as f64 / MILLIS_PER_DAY;
            2f64.powf(-age_days / half_life_days)
        })
        .collect();

    let total: f64 = raw.iter().sum();
    if total > 0.0 && total.is_finite() {
        raw.into_iter().map(|w| w / total).collect()
    } else {
        // Every weight underflowed or overflowed; fall back to an even split.
        vec![1.0 / n as f64; n]
    }
}

/// Collapse per-touchpoint weights onto channels.
pub fn channel_weights(
    model: AttributionModel,
    touchpoints: &[Touchpoint],
    half_life_days: f64,
) -> BTreeMap<String, f64> {
    let mut by_channel = BTreeMap::new();
    for (tp, weight) in touchpoints
        .iter()
        .zip(touchpoint_weights(model, touchpoints, half_life_days))
    {
        *by_channel.entry(tp.channel.clone()).or_insert(0.0) += weight;
    }
    by_channel
}

// ─── Aggregation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCredit {
    pub channel: String,
    /// Sum of fractional conversions credited to the channel.
    pub credit: f64,
    pub attributed_revenue: f64,
    pub credit_share_pct: f64,
    pub revenue_share_pct: f64,
    /// Touchpoints on this channel across credited journeys.
    pub touchpoints: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionReport {
    pub model: AttributionModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub half_life_days: Option<f64>,
    pub journeys_analyzed: u64,
    pub converted_journeys: u64,
    /// Converted journeys without touchpoints; they receive no credit.
    pub skipped_journeys: u64,
    pub total_conversions: u64,
    pub total_revenue: f64,
    pub channels: Vec<ChannelCredit>,
}

impl AttributionReport {
    pub fn channel(&self, name: &str) -> Option<&ChannelCredit> {
        self.channels.iter().find(|c| c.channel == name)
    }
}

#[derive(Default)]
struct Accumulator {
    credit: f64,
    revenue: f64,
    touchpoints: u64,
}

/// Aggregate per-channel credit over every converted journey.
pub fn attribute(
    journeys: &[Journey],
    model: AttributionModel,
    half_life_days: f64,
) -> AnalyticsResult<AttributionReport> {
    if model == AttributionModel::TimeDecay {
        validate_half_life(half_life_days)?;
    }

    let mut by_channel: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut converted_journeys = 0u64;
    let mut skipped_journeys = 0u64;
    let mut total_conversions = 0u64;
    let mut total_revenue = 0.0;

    for journey in journeys {
        if !journey.converted {
            continue;
        }
        converted_journeys += 1;
        if journey.touchpoints.is_empty() {
            skipped_journeys += 1;
            continue;
        }

        total_conversions += 1;
        total_revenue += journey.revenue;

        for tp in &journey.touchpoints {
            by_channel.entry(tp.channel.clone()).or_default().touchpoints += 1;
        }
        for (channel, weight) in channel_weights(model, &journey.touchpoints, half_life_days) {
            let acc = by_channel.entry(channel).or_default();
            acc.credit += weight;
            acc.revenue += weight * journey.revenue;
        }
    }

    let mut channels: Vec<ChannelCredit> = by_channel
        .into_iter()
        .map(|(channel, acc)| ChannelCredit {
            credit_share_pct: pct_or_zero(acc.credit, total_conversions as f64),
            revenue_share_pct: pct_or_zero(acc.revenue, total_revenue),
            channel,
            credit: acc.credit,
            attributed_revenue: acc.revenue,
            touchpoints: acc.touchpoints,
        })
        .collect();
    channels.sort_by(|a, b| {
        b.attributed_revenue
            .total_cmp(&a.attributed_revenue)
            .then(b.credit.total_cmp(&a.credit))
            .then_with(|| a.channel.cmp(&b.channel))
    });

    debug!(
        model = model.as_str(),
        journeys = journeys.len(),
        converted = converted_journeys,
        channels = channels.len(),
        "Attribution computed"
    );

    Ok(AttributionReport {
        model,
        half_life_days: (model == AttributionModel::TimeDecay).then_some(half_life_days),
        journeys_analyzed: journeys.len() as u64,
        converted_journeys,
        skipped_journeys,
        total_conversions,
        total_revenue,
        channels,
    })
}

/// All five models run independently over the same journeys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub half_life_days: f64,
    pub reports: Vec<AttributionReport>,
    /// Union of channel names across reports, sorted.
    pub channels: Vec<String>,
}

impl ModelComparison {
    pub fn report(&self, model: AttributionModel) -> Option<&AttributionReport> {
        self.reports.iter().find(|r| r.model == model)
    }

    /// Attributed revenue for `channel` under `model` (0 when the channel
    /// never appears).
    pub fn revenue_for(&self, model: AttributionModel, channel: &str) -> f64 {
        self.report(model)
            .and_then(|r| r.channel(channel))
            .map_or(0.0, |c| c.attributed_revenue)
    }
}

pub fn compare_models(journeys: &[Journey], half_life_days: f64) -> AnalyticsResult<ModelComparison> {
    let reports = AttributionModel::ALL
        .iter()
        .map(|model| attribute(journeys, *model, half_life_days))
        .collect::<AnalyticsResult<Vec<_>>>()?;

    let channels: BTreeSet<String> = reports
        .iter()
        .flat_map(|r| r.channels.iter().map(|c| c.channel.clone()))
        .collect();

    Ok(ModelComparison {
        half_life_days,
        reports,
        channels: channels.into_iter().collect(),
    })
}

// ─── Text rendering ─────────────────────────────────────────────────────────

impl fmt::Display for AttributionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.half_life_days {
            Some(h) => writeln!(f, "=== {} Attribution (half-life {h} days) ===", self.model.label())?,
            None => writeln!(f, "=== {} Attribution ===", self.model.label())?,
        }
        writeln!(
            f,
            "Journeys: {} analyzed, {} converted, {} credited, {} skipped (no touchpoints)",
            self.journeys_analyzed,
            self.converted_journeys,
            self.total_conversions,
            self.skipped_journeys
        )?;
        writeln!(f, "Total revenue: {}", fmt_currency(self.total_revenue))?;
        writeln!(f)?;

        if self.channels.is_empty() {
            return writeln!(f, "  (no converted journeys with touchpoints)");
        }

        writeln!(
            f,
            "  {:<20} {:>10} {:>9} {:>16} {:>9}",
            "Channel", "Credit", "Credit %", "Revenue", "Rev %"
        )?;
        writeln!(f, "  {}", "-".repeat(68))?;
        for c in &self.channels {
            writeln!(
                f,
                "  {:<20} {:>10.2} {:>8.1}% {:>16} {:>8.1}%",
                c.channel,
                c.credit,
                c.credit_share_pct,
                fmt_currency(c.attributed_revenue),
                c.revenue_share_pct
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for ModelComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.reports {
            writeln!(f, "{report}")?;
        }

        writeln!(f, "=== Model Comparison (attributed revenue) ===")?;
        write!(f, "  {:<20}", "Channel")?;
        for report in &self.reports {
            write!(f, " {:>15}", report.model.label())?;
        }
        writeln!(f)?;
        writeln!(f, "  {}", "-".repeat(20 + 16 * self.reports.len()))?;
        for channel in &self.channels {
            write!(f, "  {channel:<20}")?;
            for report in &self.reports {
                write!(f, " {:>15}", fmt_currency(self.revenue_for(report.model, channel)))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
