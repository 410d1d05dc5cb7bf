//! Campaign ROI / ROAS and unit-cost metrics, benchmark flags, and a
//! portfolio roll-up.

use std::fmt;

use campaign_core::input::ensure_non_negative;
use campaign_core::output::{fmt_currency, fmt_opt, fmt_pct};
use campaign_core::ratio::{safe_div, safe_pct};
use campaign_core::AnalyticsResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::benchmarks::{benchmark_for, BenchmarkMetric};

// ─── Input ──────────────────────────────────────────────────────────────────

/// One campaign row of an ROI input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignInput {
    pub name: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    pub spend: f64,
    pub revenue: f64,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub leads: u64,
    #[serde(default)]
    pub customers: u64,
}

fn default_channel() -> String {
    "default".to_string()
}

/// Top-level shape of an ROI input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignDocument {
    pub campaigns: Vec<CampaignInput>,
}

impl CampaignDocument {
    pub fn validate(&self) -> AnalyticsResult<()> {
        for (i, c) in self.campaigns.iter().enumerate() {
            ensure_non_negative(|| format!("campaigns[{i}].spend"), c.spend)?;
            ensure_non_negative(|| format!("campaigns[{i}].revenue"), c.revenue)?;
        }
        Ok(())
    }
}

// ─── Results ────────────────────────────────────────────────────────────────

/// Derived ratios. `None` (JSON `null`) marks a ratio whose denominator is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub profit: f64,
    pub roi_pct: Option<f64>,
    pub roas: Option<f64>,
    pub cpa: Option<f64>,
    pub cac: Option<f64>,
    pub cpl: Option<f64>,
    pub cpc: Option<f64>,
    pub cpm: Option<f64>,
    pub ctr_pct: Option<f64>,
    pub cvr_pct: Option<f64>,
}

impl CampaignMetrics {
    pub fn compute(
        spend: f64,
        revenue: f64,
        impressions: u64,
        clicks: u64,
        leads: u64,
        customers: u64,
    ) -> Self {
        let cpa = safe_div(spend, customers as f64);
        Self {
            profit: revenue - spend,
            roi_pct: safe_pct(revenue - spend, spend),
            roas: safe_div(revenue, spend),
            cpa,
            cac: cpa,
            cpl: safe_div(spend, leads as f64),
            cpc: safe_div(spend, clicks as f64),
            cpm: safe_div(spend, impressions as f64).map(|v| v * 1000.0),
            ctr_pct: safe_pct(clicks as f64, impressions as f64),
            cvr_pct: safe_pct(customers as f64, leads as f64),
        }
    }

    pub fn value(&self, metric: BenchmarkMetric) -> Option<f64> {
        match metric {
            BenchmarkMetric::Ctr => self.ctr_pct,
            BenchmarkMetric::Cvr => self.cvr_pct,
            BenchmarkMetric::Roas => self.roas,
            BenchmarkMetric::Cpa => self.cpa,
            BenchmarkMetric::Cac => self.cac,
            BenchmarkMetric::Cpl => self.cpl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFlag {
    pub metric: BenchmarkMetric,
    pub value: f64,
    pub benchmark: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignResult {
    pub name: String,
    pub channel: String,
    /// Benchmark row the campaign was judged against.
    pub benchmark_channel: String,
    pub spend: f64,
    pub revenue: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub leads: u64,
    pub customers: u64,
    pub metrics: CampaignMetrics,
    /// Metrics worse than benchmark by more than the margin.
    pub flags: Vec<MetricFlag>,
}

impl CampaignResult {
    pub fn is_flagged(&self, metric: BenchmarkMetric) -> bool {
        self.flags.iter().any(|f| f.metric == metric)
    }

    pub fn underperforming(&self) -> bool {
        !self.flags.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub campaigns: usize,
    pub flagged_campaigns: usize,
    pub total_spend: f64,
    pub total_revenue: f64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_leads: u64,
    pub total_customers: u64,
    pub metrics: CampaignMetrics,
    pub best_by_roas: Option<String>,
    pub worst_by_roas: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiReport {
    pub campaigns: Vec<CampaignResult>,
    pub summary: PortfolioSummary,
}

// ─── Calculation ────────────────────────────────────────────────────────────

/// Compute metrics and benchmark flags for one campaign.
pub fn evaluate_campaign(input: &CampaignInput) -> CampaignResult {
    let metrics = CampaignMetrics::compute(
        input.spend,
        input.revenue,
        input.impressions,
        input.clicks,
        input.leads,
        input.customers,
    );
    let (benchmark_channel, bench) = benchmark_for(&input.channel);

    let flags = BenchmarkMetric::ALL
        .iter()
        .filter_map(|metric| {
            let value = metrics.value(*metric)?;
            let benchmark = metric.benchmark(&bench);
            metric
                .is_underperforming(value, benchmark)
                .then(|| MetricFlag {
                    metric: *metric,
                    value,
                    benchmark,
                    threshold: metric.threshold(benchmark),
                })
        })
        .collect();

    CampaignResult {
        name: input.name.clone(),
        channel: input.channel.clone(),
        benchmark_channel: benchmark_channel.to_string(),
        spend: input.spend,
        revenue: input.revenue,
        impressions: input.impressions,
        clicks: input.clicks,
        leads: input.leads,
        customers: input.customers,
        metrics,
        flags,
    }
}

pub fn calculate(campaigns: &[CampaignInput]) -> RoiReport {
    let results: Vec<CampaignResult> = campaigns.iter().map(evaluate_campaign).collect();

    let total_spend: f64 = results.iter().map(|r| r.spend).sum();
    let total_revenue: f64 = results.iter().map(|r| r.revenue).sum();
    let total_impressions = results.iter().fold(0u64, |acc, r| acc.saturating_add(r.impressions));
    let total_clicks = results.iter().fold(0u64, |acc, r| acc.saturating_add(r.clicks));
    let total_leads = results.iter().fold(0u64, |acc, r| acc.saturating_add(r.leads));
    let total_customers = results.iter().fold(0u64, |acc, r| acc.saturating_add(r.customers));

    // Campaigns without spend have no ROAS and are left out of the ranking.
    let ranked: Vec<(&CampaignResult, f64)> = results
        .iter()
        .filter_map(|r| r.metrics.roas.map(|roas| (r, roas)))
        .collect();
    let best_by_roas = ranked
        .iter()
        .fold(None::<&(&CampaignResult, f64)>, |best, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
        .map(|(r, _)| r.name.clone());
    let worst_by_roas = ranked
        .iter()
        .fold(None::<&(&CampaignResult, f64)>, |worst, cur| match worst {
            Some(w) if w.1 <= cur.1 => Some(w),
            _ => Some(cur),
        })
        .map(|(r, _)| r.name.clone());

    let summary = PortfolioSummary {
        campaigns: results.len(),
        flagged_campaigns: results.iter().filter(|r| r.underperforming()).count(),
        total_spend,
        total_revenue,
        total_impressions,
        total_clicks,
        total_leads,
        total_customers,
        metrics: CampaignMetrics::compute(
            total_spend,
            total_revenue,
            total_impressions,
            total_clicks,
            total_leads,
            total_customers,
        ),
        best_by_roas,
        worst_by_roas,
    };

    debug!(
        campaigns = summary.campaigns,
        flagged = summary.flagged_campaigns,
        "ROI calculated"
    );

    RoiReport {
        campaigns: results,
        summary,
    }
}

// ─── Text rendering ─────────────────────────────────────────────────────────

fn write_metrics(f: &mut fmt::Formatter<'_>, m: &CampaignMetrics) -> fmt::Result {
    writeln!(
        f,
        "    ROI: {}   ROAS: {}   Profit: {}",
        fmt_pct(m.roi_pct, 1),
        m.roas.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}x")),
        fmt_currency(m.profit)
    )?;
    writeln!(
        f,
        "    CPA: {}   CAC: {}   CPL: {}   CPC: {}   CPM: {}",
        fmt_opt(m.cpa, 2),
        fmt_opt(m.cac, 2),
        fmt_opt(m.cpl, 2),
        fmt_opt(m.cpc, 2),
        fmt_opt(m.cpm, 2)
    )?;
    writeln!(
        f,
        "    CTR: {}   CVR: {}",
        fmt_pct(m.ctr_pct, 2),
        fmt_pct(m.cvr_pct, 2)
    )
}

impl fmt::Display for RoiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Campaign ROI ===")?;
        for c in &self.campaigns {
            writeln!(f)?;
            writeln!(
                f,
                "  {} [{}]  spend {}  revenue {}",
                c.name,
                c.channel,
                fmt_currency(c.spend),
                fmt_currency(c.revenue)
            )?;
            write_metrics(f, &c.metrics)?;
            if c.flags.is_empty() {
                writeln!(f, "    Benchmarks ({}): on target", c.benchmark_channel)?;
            } else {
                for flag in &c.flags {
                    writeln!(
                        f,
                        "    UNDERPERFORMING {}: {:.2} vs benchmark {:.2} ({})",
                        flag.metric.as_str().to_uppercase(),
                        flag.value,
                        flag.benchmark,
                        c.benchmark_channel
                    )?;
                }
            }
        }

        let s = &self.summary;
        writeln!(f)?;
        writeln!(f, "=== Portfolio Summary ===")?;
        writeln!(
            f,
            "  Campaigns: {} ({} flagged)",
            s.campaigns, s.flagged_campaigns
        )?;
        writeln!(
            f,
            "  Total spend: {}   Total revenue: {}",
            fmt_currency(s.total_spend),
            fmt_currency(s.total_revenue)
        )?;
        write_metrics(f, &s.metrics)?;
        if let (Some(best), Some(worst)) = (&s.best_by_roas, &s.worst_by_roas) {
            writeln!(f, "  Best ROAS: {best}   Worst ROAS: {worst}")?;
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use campaign_core::input::parse_document;

    fn campaign(name: &str, channel: &str, spend: f64, revenue: f64) -> CampaignInput {
        CampaignInput {
            name: name.to_string(),
            channel: channel.to_string(),
            spend,
            revenue,
            impressions: 100_000,
            clicks: 3_000,
            leads: 300,
            customers: 100,
        }
    }

    #[test]
    fn test_roi_and_roas() {
        let result = evaluate_campaign(&campaign("Spring", "paid_search", 5000.0, 25000.0));
        assert_abs_diff_eq!(result.metrics.roi_pct.unwrap(), 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.metrics.roas.unwrap(), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.metrics.profit, 20000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unit_costs_and_rates() {
        let m = evaluate_campaign(&campaign("Spring", "paid_search", 5000.0, 25000.0)).metrics;
        assert_abs_diff_eq!(m.cpa.unwrap(), 50.0, epsilon = 1e-9);
        assert_eq!(m.cac, m.cpa);
        assert_abs_diff_eq!(m.cpl.unwrap(), 5000.0 / 300.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.cpc.unwrap(), 5000.0 / 3000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.cpm.unwrap(), 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.ctr_pct.unwrap(), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.cvr_pct.unwrap(), 100.0 / 300.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_spend_is_null_not_error() {
        let mut input = campaign("Organic", "organic_social", 0.0, 1200.0);
        input.customers = 0;
        input.leads = 0;
        input.impressions = 0;
        let result = evaluate_campaign(&input);
        assert_eq!(result.metrics.roi_pct, None);
        assert_eq!(result.metrics.roas, None);
        assert_eq!(result.metrics.cpa, None);
        assert_eq!(result.metrics.cvr_pct, None);
        assert_eq!(result.metrics.ctr_pct, None);
        assert!(result.flags.is_empty());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["metrics"]["roi_pct"].is_null());
    }

    #[test]
    fn test_flags_are_independent() {
        // paid_search benchmark: CTR 3.2, CVR 12, ROAS 4, CPA 50, CPL 30.
        let input = CampaignInput {
            name: "Weak ROAS".to_string(),
            channel: "paid_search".to_string(),
            spend: 10000.0,
            revenue: 20000.0,
            impressions: 100_000,
            clicks: 3_500,
            leads: 500,
            customers: 100,
        };
        let result = evaluate_campaign(&input);
        // ROAS 2.0 < 3.2 threshold; CPA 100 > 60; CAC mirrors CPA.
        assert!(result.is_flagged(BenchmarkMetric::Roas));
        assert!(result.is_flagged(BenchmarkMetric::Cpa));
        assert!(result.is_flagged(BenchmarkMetric::Cac));
        // CTR 3.5% and CVR 20% beat the benchmark; CPL 20 is under 36.
        assert!(!result.is_flagged(BenchmarkMetric::Ctr));
        assert!(!result.is_flagged(BenchmarkMetric::Cvr));
        assert!(!result.is_flagged(BenchmarkMetric::Cpl));
        assert!(result.underperforming());
    }

    #[test]
    fn test_unknown_channel_uses_default_benchmark() {
        let result = evaluate_campaign(&campaign("Pod", "podcast", 1000.0, 5000.0));
        assert_eq!(result.benchmark_channel, "default");
    }

    #[test]
    fn test_portfolio_summary() {
        let report = calculate(&[
            campaign("A", "email", 1000.0, 12000.0),
            campaign("B", "display", 4000.0, 4000.0),
            campaign("C", "organic_social", 0.0, 0.0),
        ]);
        let s = &report.summary;
        assert_eq!(s.campaigns, 3);
        assert_abs_diff_eq!(s.total_spend, 5000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.total_revenue, 16000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.metrics.roas.unwrap(), 3.2, epsilon = 1e-9);
        assert_abs_diff_eq!(s.metrics.roi_pct.unwrap(), 220.0, epsilon = 1e-9);
        assert_eq!(s.total_customers, 300);
        assert_eq!(s.best_by_roas.as_deref(), Some("A"));
        assert_eq!(s.worst_by_roas.as_deref(), Some("B"));
    }

    #[test]
    fn test_portfolio_count_totals_saturate() {
        let big = CampaignInput {
            impressions: u64::MAX,
            clicks: u64::MAX,
            leads: u64::MAX,
            customers: u64::MAX,
            ..campaign("A", "email", 100.0, 500.0)
        };
        let report = calculate(&[big.clone(), big]);
        let s = &report.summary;
        assert_eq!(s.total_impressions, u64::MAX);
        assert_eq!(s.total_clicks, u64::MAX);
        assert_eq!(s.total_leads, u64::MAX);
        assert_eq!(s.total_customers, u64::MAX);
    }

    #[test]
    fn test_empty_portfolio() {
        let report = calculate(&[]);
        assert_eq!(report.summary.campaigns, 0);
        assert_eq!(report.summary.metrics.roas, None);
        assert!(report.summary.best_by_roas.is_none());
    }

    #[test]
    fn test_document_parsing_and_validation() {
        let doc: CampaignDocument = parse_document(
            r#"{"campaigns": [
                {"name": "Q1 Search", "channel": "paid_search", "spend": 5000, "revenue": 25000,
                 "impressions": 200000, "clicks": 6000, "leads": 400, "customers": 90},
                {"name": "Bare", "spend": 100, "revenue": 0}
            ]}"#,
        )
        .unwrap();
        doc.validate().unwrap();
        assert_eq!(doc.campaigns[1].channel, "default");
        assert_eq!(doc.campaigns[1].clicks, 0);

        let bad = CampaignDocument {
            campaigns: vec![campaign("Neg", "email", -1.0, 0.0)],
        };
        assert!(bad.validate().unwrap_err().to_string().contains("campaigns[0].spend"));

        let err = parse_document::<CampaignDocument>(
            r#"{"campaigns": [{"name": "X", "spend": "5k", "revenue": 1}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("campaigns[0].spend"));
    }

    #[test]
    fn test_text_report() {
        let mut organic = campaign("Organic", "organic_social", 0.0, 0.0);
        organic.impressions = 0;
        let text = calculate(&[campaign("Spring", "paid_search", 5000.0, 25000.0), organic]).to_string();
        assert!(text.contains("ROI: 400.0%"));
        assert!(text.contains("ROAS: 5.00x"));
        assert!(text.contains("ROI: n/a"));
        assert!(text.contains("Portfolio Summary"));
    }
}
