use crate::error::AnalyticsResult;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime settings for the Meta content fetcher. Loaded from environment
/// variables with the prefix `CAMPAIGN_ANALYTICS__`; every field has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(default = "default_graph_api_base")]
    pub graph_api_base: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com".to_string()
}
fn default_api_version() -> String {
    "v21.0".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            graph_api_base: default_graph_api_base(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            results_dir: default_results_dir(),
        }
    }
}

impl FetcherConfig {
    pub fn load() -> AnalyticsResult<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CAMPAIGN_ANALYTICS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}

/// Parse `KEY=value` lines of a dotenv file. Blank lines and `#` comments are
/// skipped; surrounding single or double quotes are stripped from values.
pub fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim().trim_start_matches("export ").trim();
            if key.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Load `<dir>/.env` into the process environment without overriding
/// variables that are already set. Returns the number of variables applied.
pub fn load_dotenv(dir: &Path) -> std::io::Result<usize> {
    let path = dir.join(".env");
    if !path.is_file() {
        return Ok(0);
    }
    let contents = std::fs::read_to_string(&path)?;
    let mut applied = 0;
    for (key, value) in parse_dotenv(&contents) {
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, value);
            applied += 1;
        }
    }
    tracing::debug!(path = %path.display(), applied, "Loaded dotenv file");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.graph_api_base, "https://graph.facebook.com");
        assert_eq!(config.api_version, "v21.0");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.results_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_parse_dotenv_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# credentials\n\nMETA_TOKEN=\"abc123\"\nexport META_PAGE_ID='42'\n=orphan\nnot a pair\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("META_TOKEN".to_string(), "abc123".to_string()),
                ("META_PAGE_ID".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn test_load_dotenv_does_not_override_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "CAMPAIGN_CORE_TEST_PRESET=from_file\nCAMPAIGN_CORE_TEST_FRESH=from_file\n",
        )
        .unwrap();
        std::env::set_var("CAMPAIGN_CORE_TEST_PRESET", "from_env");

        let applied = load_dotenv(dir.path()).unwrap();

        assert_eq!(applied, 1);
        assert_eq!(std::env::var("CAMPAIGN_CORE_TEST_PRESET").unwrap(), "from_env");
        assert_eq!(std::env::var("CAMPAIGN_CORE_TEST_FRESH").unwrap(), "from_file");
    }

    #[test]
    fn test_load_dotenv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_dotenv(dir.path()).unwrap(), 0);
    }
}
