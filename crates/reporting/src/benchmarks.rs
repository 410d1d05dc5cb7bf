//! Per-channel performance benchmarks and underperformance flagging.

use serde::{Deserialize, Serialize};

/// How far past a benchmark a metric may drift before it is flagged.
pub const UNDERPERFORMANCE_MARGIN: f64 = 0.20;

/// Reference values for one channel. Rates are percentages; costs are in the
/// input's currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBenchmark {
    pub ctr_pct: f64,
    pub cvr_pct: f64,
    pub roas: f64,
    pub cpa: f64,
    pub cpl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMetric {
    Ctr,
    Cvr,
    Roas,
    Cpa,
    Cac,
    Cpl,
}

impl BenchmarkMetric {
    pub const ALL: [BenchmarkMetric; 6] = [
        BenchmarkMetric::Ctr,
        BenchmarkMetric::Cvr,
        BenchmarkMetric::Roas,
        BenchmarkMetric::Cpa,
        BenchmarkMetric::Cac,
        BenchmarkMetric::Cpl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ctr => "ctr",
            Self::Cvr => "cvr",
            Self::Roas => "roas",
            Self::Cpa => "cpa",
            Self::Cac => "cac",
            Self::Cpl => "cpl",
        }
    }

    pub fn higher_is_better(&self) -> bool {
        matches!(self, Self::Ctr | Self::Cvr | Self::Roas)
    }

    /// Benchmark value for this metric. CAC is judged against the CPA figure.
    pub fn benchmark(&self, bench: &ChannelBenchmark) -> f64 {
        match self {
            Self::Ctr => bench.ctr_pct,
            Self::Cvr => bench.cvr_pct,
            Self::Roas => bench.roas,
            Self::Cpa | Self::Cac => bench.cpa,
            Self::Cpl => bench.cpl,
        }
    }

    /// The value at which the metric starts counting as underperforming.
    pub fn threshold(&self, benchmark: f64) -> f64 {
        if self.higher_is_better() {
            benchmark * (1.0 - UNDERPERFORMANCE_MARGIN)
        } else {
            benchmark * (1.0 + UNDERPERFORMANCE_MARGIN)
        }
    }

    pub fn is_underperforming(&self, value: f64, benchmark: f64) -> bool {
        let threshold = self.threshold(benchmark);
        if self.higher_is_better() {
            value < threshold
        } else {
            value > threshold
        }
    }
}

const EMAIL: ChannelBenchmark = ChannelBenchmark {
    ctr_pct: 2.5,
    cvr_pct: 15.0,
    roas: 10.0,
    cpa: 40.0,
    cpl: 15.0,
};
const PAID_SEARCH: ChannelBenchmark = ChannelBenchmark {
    ctr_pct: 3.2,
    cvr_pct: 12.0,
    roas: 4.0,
    cpa: 50.0,
    cpl: 30.0,
};
const PAID_SOCIAL: ChannelBenchmark = ChannelBenchmark {
    ctr_pct: 0.9,
    cvr_pct: 10.0,
    roas: 3.0,
    cpa: 60.0,
    cpl: 25.0,
};
const DISPLAY: ChannelBenchmark = ChannelBenchmark {
    ctr_pct: 0.5,
    cvr_pct: 8.0,
    roas: 2.0,
    cpa: 75.0,
    cpl: 40.0,
};
const VIDEO: ChannelBenchmark = ChannelBenchmark {
    ctr_pct: 0.7,
    cvr_pct: 8.0,
    roas: 2.5,
    cpa: 70.0,
    cpl: 35.0,
};
const AFFILIATE: ChannelBenchmark = ChannelBenchmark {
    ctr_pct: 1.0,
    cvr_pct: 15.0,
    roas: 5.0,
    cpa: 45.0,
    cpl: 20.0,
};
const ORGANIC_SOCIAL: ChannelBenchmark = ChannelBenchmark {
    ctr_pct: 1.5,
    cvr_pct: 10.0,
    roas: 2.0,
    cpa: 30.0,
    cpl: 10.0,
};
const DEFAULT: ChannelBenchmark = ChannelBenchmark {
    ctr_pct: 1.5,
    cvr_pct: 10.0,
    roas: 3.0,
    cpa: 60.0,
    cpl: 30.0,
};

/// Resolve a free-form channel name to its benchmark row. Returns the
/// canonical channel key alongside the row; unknown channels map to `default`.
pub fn benchmark_for(channel: &str) -> (&'static str, ChannelBenchmark) {
    let key = channel.trim().to_lowercase().replace(['-', ' '], "_");
    match key.as_str() {
        "email" | "newsletter" => ("email", EMAIL),
        "paid_search" | "search" | "ppc" | "sem" | "google_ads" => ("paid_search", PAID_SEARCH),
        "paid_social" | "social" | "facebook_ads" | "meta_ads" | "linkedin_ads" => {
            ("paid_social", PAID_SOCIAL)
        }
        "display" | "programmatic" => ("display", DISPLAY),
        "video" | "youtube" => ("video", VIDEO),
        "affiliate" | "partner" => ("affiliate", AFFILIATE),
        "organic_social" => ("organic_social", ORGANIC_SOCIAL),
        _ => ("default", DEFAULT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_aliases() {
        assert_eq!(benchmark_for("Paid Search").0, "paid_search");
        assert_eq!(benchmark_for("google-ads").0, "paid_search");
        assert_eq!(benchmark_for("EMAIL").0, "email");
        assert_eq!(benchmark_for("organic_social").0, "organic_social");
        assert_eq!(benchmark_for("podcast"), ("default", DEFAULT));
    }

    #[test]
    fn test_higher_is_better_margin() {
        // ROAS benchmark 4.0 -> flagged below 3.2.
        assert!(!BenchmarkMetric::Roas.is_underperforming(3.5, 4.0));
        assert!(BenchmarkMetric::Roas.is_underperforming(3.1, 4.0));
    }

    #[test]
    fn test_lower_is_better_margin() {
        // CPA benchmark 50 -> flagged above 60.
        assert!(!BenchmarkMetric::Cpa.is_underperforming(55.0, 50.0));
        assert!(BenchmarkMetric::Cpa.is_underperforming(61.0, 50.0));
    }

    #[test]
    fn test_cac_uses_cpa_benchmark() {
        let bench = benchmark_for("email").1;
        assert_eq!(BenchmarkMetric::Cac.benchmark(&bench), bench.cpa);
    }
}
