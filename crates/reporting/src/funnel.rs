//! Funnel analysis: stage-to-stage conversion, drop-off, and bottleneck
//! detection over ordered stage counts, optionally per segment.

use std::collections::BTreeMap;
use std::fmt;

use campaign_core::ratio::pct_or_zero;
use campaign_core::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ─── Input ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelDefinition {
    pub stages: Vec<String>,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDefinition {
    /// Falls back to the top-level funnel stages when absent.
    #[serde(default)]
    pub stages: Option<Vec<String>>,
    pub counts: Vec<u64>,
}

/// Top-level shape of a funnel input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelDocument {
    pub funnel: FunnelDefinition,
    #[serde(default)]
    pub segments: BTreeMap<String, SegmentDefinition>,
}

// ─── Results ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub from_stage: String,
    pub to_stage: String,
    pub from_count: u64,
    pub to_count: u64,
    /// `to / from * 100`, 0 when `from` is 0.
    pub conversion_rate: f64,
    /// Signed: negative when the later stage is larger.
    pub drop_off: i128,
    pub drop_off_pct: f64,
}

impl StageTransition {
    pub fn label(&self) -> String {
        format!("{} -> {}", self.from_stage, self.to_stage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottleneck {
    pub from_stage: String,
    pub to_stage: String,
    pub drop_off: i128,
    pub drop_off_pct: f64,
}

impl From<&StageTransition> for Bottleneck {
    fn from(t: &StageTransition) -> Self {
        Self {
            from_stage: t.from_stage.clone(),
            to_stage: t.to_stage.clone(),
            drop_off: t.drop_off,
            drop_off_pct: t.drop_off_pct,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelResult {
    pub stages: Vec<String>,
    pub counts: Vec<u64>,
    pub transitions: Vec<StageTransition>,
    /// `last / first * 100`, 0 when the funnel is empty or starts at 0.
    pub overall_conversion_rate: f64,
    /// Largest drop-off by entity count.
    pub absolute_bottleneck: Option<Bottleneck>,
    /// Largest drop-off by percentage of the entering stage.
    pub relative_bottleneck: Option<Bottleneck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRanking {
    pub best_segment: String,
    pub best_conversion_rate: f64,
    pub worst_segment: String,
    pub worst_conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelReport {
    pub funnel: FunnelResult,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub segments: BTreeMap<String, FunnelResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_ranking: Option<SegmentRanking>,
}

// ─── Analysis ───────────────────────────────────────────────────────────────

/// Analyze one funnel. `field` names the input location for error messages.
pub fn analyze_funnel(stages: &[String], counts: &[u64], field: &str) -> AnalyticsResult<FunnelResult> {
    if stages.len() != counts.len() {
        return Err(AnalyticsError::invalid_input(
            field,
            format!(
                "`stages` has {} entries but `counts` has {}",
                stages.len(),
                counts.len()
            ),
        ));
    }

    let transitions: Vec<StageTransition> = stages
        .windows(2)
        .zip(counts.windows(2))
        .map(|(names, pair)| {
            let (from, to) = (pair[0], pair[1]);
            let drop_off = i128::from(from) - i128::from(to);
            StageTransition {
                from_stage: names[0].clone(),
                to_stage: names[1].clone(),
                from_count: from,
                to_count: to,
                conversion_rate: pct_or_zero(to as f64, from as f64),
                drop_off,
                drop_off_pct: pct_or_zero(drop_off as f64, from as f64),
            }
        })
        .collect();

    let overall_conversion_rate = match (counts.first(), counts.last()) {
        (Some(first), Some(last)) => pct_or_zero(*last as f64, *first as f64),
        _ => 0.0,
    };

    // Earliest transition wins ties, so only replace on a strictly larger value.
    let absolute_bottleneck = transitions
        .iter()
        .fold(None::<&StageTransition>, |best, t| match best {
            Some(b) if b.drop_off >= t.drop_off => Some(b),
            _ => Some(t),
        })
        .map(Bottleneck::from);
    let relative_bottleneck = transitions
        .iter()
        .fold(None::<&StageTransition>, |best, t| match best {
            Some(b) if b.drop_off_pct >= t.drop_off_pct => Some(b),
            _ => Some(t),
        })
        .map(Bottleneck::from);

    Ok(FunnelResult {
        stages: stages.to_vec(),
        counts: counts.to_vec(),
        transitions,
        overall_conversion_rate,
        absolute_bottleneck,
        relative_bottleneck,
    })
}

/// Analyze the main funnel and each segment independently.
pub fn analyze(document: &FunnelDocument) -> AnalyticsResult<FunnelReport> {
    let funnel = analyze_funnel(&document.funnel.stages, &document.funnel.counts, "funnel")?;

    let mut segments = BTreeMap::new();
    for (name, segment) in &document.segments {
        let stages = segment.stages.as_ref().unwrap_or(&document.funnel.stages);
        let result = analyze_funnel(stages, &segment.counts, &format!("segments.{name}"))?;
        segments.insert(name.clone(), result);
    }

    let segment_ranking = rank_segments(&segments);

    debug!(
        stages = funnel.stages.len(),
        segments = segments.len(),
        overall = funnel.overall_conversion_rate,
        "Funnel analyzed"
    );

    Ok(FunnelReport {
        funnel,
        segments,
        segment_ranking,
    })
}

fn rank_segments(segments: &BTreeMap<String, FunnelResult>) -> Option<SegmentRanking> {
    if segments.len() < 2 {
        return None;
    }
    let mut best: Option<(&String, f64)> = None;
    let mut worst: Option<(&String, f64)> = None;
    for (name, result) in segments {
        let rate = result.overall_conversion_rate;
        if best.is_none_or(|(_, r)| rate > r) {
            best = Some((name, rate));
        }
        if worst.is_none_or(|(_, r)| rate < r) {
            worst = Some((name, rate));
        }
    }
    let (best_segment, best_conversion_rate) = best?;
    let (worst_segment, worst_conversion_rate) = worst?;
    Some(SegmentRanking {
        best_segment: best_segment.clone(),
        best_conversion_rate,
        worst_segment: worst_segment.clone(),
        worst_conversion_rate,
    })
}

// ─── Text rendering ─────────────────────────────────────────────────────────

impl fmt::Display for FunnelResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {:<20} {:>12}", "Stage", "Count")?;
        writeln!(f, "  {}", "-".repeat(33))?;
        for (stage, count) in self.stages.iter().zip(&self.counts) {
            writeln!(f, "  {stage:<20} {count:>12}")?;
        }
        writeln!(f)?;

        if !self.transitions.is_empty() {
            writeln!(
                f,
                "  {:<36} {:>11} {:>10} {:>10}",
                "Transition", "Conversion", "Drop-off", "Drop %"
            )?;
            writeln!(f, "  {}", "-".repeat(70))?;
            for t in &self.transitions {
                writeln!(
                    f,
                    "  {:<36} {:>10.1}% {:>10} {:>9.1}%",
                    t.label(),
                    t.conversion_rate,
                    t.drop_off,
                    t.drop_off_pct
                )?;
            }
            writeln!(f)?;
        }

        writeln!(f, "  Overall conversion: {:.2}%", self.overall_conversion_rate)?;
        if let Some(b) = &self.absolute_bottleneck {
            writeln!(
                f,
                "  Bottleneck (absolute): {} -> {} ({} lost)",
                b.from_stage, b.to_stage, b.drop_off
            )?;
        }
        if let Some(b) = &self.relative_bottleneck {
            writeln!(
                f,
                "  Bottleneck (relative): {} -> {} ({:.1}% lost)",
                b.from_stage, b.to_stage, b.drop_off_pct
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for FunnelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Funnel Analysis ===")?;
        write!(f, "{}", self.funnel)?;

        for (name, result) in &self.segments {
            writeln!(f)?;
            writeln!(f, "=== Segment: {name} ===")?;
            write!(f, "{result}")?;
        }

        if let Some(ranking) = &self.segment_ranking {
            writeln!(f)?;
            writeln!(f, "=== Segment Comparison ===")?;
            writeln!(
                f,
                "  Best:  {} ({:.2}%)",
                ranking.best_segment, ranking.best_conversion_rate
            )?;
            writeln!(
                f,
                "  Worst: {} ({:.2}%)",
                ranking.worst_segment, ranking.worst_conversion_rate
            )?;
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
