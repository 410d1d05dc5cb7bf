use crate::error::AnalyticsResult;
use serde::Serialize;

/// How a tool prints its result on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables.
    #[default]
    Text,
    /// A JSON document mirroring the computed fields.
    Json,
}

/// Render `report` either as pretty JSON or through its text renderer.
pub fn render<T, F>(format: OutputFormat, report: &T, text: F) -> AnalyticsResult<String>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => Ok(text(report)),
    }
}

/// Format an optional value, printing `n/a` for undefined ratios.
pub fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "n/a".to_string(),
    }
}

/// Like [`fmt_opt`] with a trailing percent sign on defined values.
pub fn fmt_pct(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}%"),
        None => "n/a".to_string(),
    }
}

/// Format a currency amount with thousands separators, e.g. `$12,345.60`.
pub fn fmt_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_currency() {
        assert_eq!(fmt_currency(0.0), "$0.00");
        assert_eq!(fmt_currency(999.5), "$999.50");
        assert_eq!(fmt_currency(1234567.891), "$1,234,567.89");
        assert_eq!(fmt_currency(-2500.0), "-$2,500.00");
    }

    #[test]
    fn test_fmt_opt() {
        assert_eq!(fmt_opt(Some(4.0), 2), "4.00");
        assert_eq!(fmt_opt(None, 2), "n/a");
        assert_eq!(fmt_pct(Some(4.2), 1), "4.2%");
        assert_eq!(fmt_pct(None, 1), "n/a");
    }

    #[test]
    fn test_render_json_and_text() {
        #[derive(Serialize)]
        struct Report {
            total: u32,
        }
        let report = Report { total: 3 };
        let json = render(OutputFormat::Json, &report, |_| unreachable!()).unwrap();
        assert!(json.contains("\"total\": 3"));
        let text = render(OutputFormat::Text, &report, |r| format!("Total: {}", r.total)).unwrap();
        assert_eq!(text, "Total: 3");
    }
}
