//! Fetcher outputs: the CSV file and the JSON documents, including the
//! ROI-compatible `campaigns` aggregate.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use campaign_reporting::CampaignInput;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::error::GraphApiError;
use crate::meta::FetchResult;
use crate::records::{format_fetched_at, Platform, SocialPostRecord};

pub const CSV_COLUMNS: [&str; 15] = [
    "platform",
    "post_id",
    "media_type",
    "content_type",
    "posted_at",
    "text",
    "likes",
    "comments",
    "shares",
    "saves",
    "reach",
    "impressions",
    "engagement_total",
    "clicks",
    "fetched_at",
];

pub const DEFAULT_CSV_PREFIX: &str = "instagram_stats";

const ORGANIC_CHANNEL: &str = "organic_social";

// ─── CSV ────────────────────────────────────────────────────────────────────

fn csv_field(value: &str) -> String {
    let flat = value.replace("\r\n", " ").replace(['\n', '\r'], " ");
    if flat.contains([',', '"']) {
        format!("\"{}\"", flat.replace('"', "\"\""))
    } else {
        flat
    }
}

fn csv_row(record: &SocialPostRecord) -> String {
    let cells = [
        csv_field(record.platform.as_str()),
        csv_field(&record.post_id),
        csv_field(&record.media_type),
        csv_field(&record.content_type),
        csv_field(&record.posted_at),
        csv_field(&record.text),
        record.likes.to_string(),
        record.comments.to_string(),
        record.shares.to_string(),
        record.saves.to_string(),
        record.reach.to_string(),
        record.impressions.to_string(),
        record.engagement_total.to_string(),
        record.clicks.to_string(),
        csv_field(&record.fetched_at),
    ];
    cells.join(",")
}

pub fn to_csv<'a>(records: impl IntoIterator<Item = &'a SocialPostRecord>) -> String {
    let mut csv = CSV_COLUMNS.join(",");
    csv.push('\n');
    for record in records {
        csv.push_str(&csv_row(record));
        csv.push('\n');
    }
    csv
}

/// `<results_dir>/<prefix>_<YYYY-MM-DD_HHMM>.csv`. A trailing `.csv` on the
/// prefix is dropped; an empty prefix falls back to the default.
pub fn csv_output_path(results_dir: &Path, prefix: Option<&str>, at: NaiveDateTime) -> PathBuf {
    let prefix = prefix
        .map(|p| p.trim().trim_end_matches(".csv"))
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_CSV_PREFIX);
    results_dir.join(format!("{prefix}_{}.csv", at.format("%Y-%m-%d_%H%M")))
}

/// Write through a temp file in the same directory and rename it into place.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), GraphApiError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let tmp = dir.join(format!(".{file_name}.tmp"));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;

    info!(path = %path.display(), "Wrote CSV export");
    Ok(())
}

pub fn write_csv(result: &FetchResult, results_dir: &Path, prefix: Option<&str>) -> Result<PathBuf, GraphApiError> {
    let path = csv_output_path(results_dir, prefix, result.fetched_at.naive_utc());
    write_atomic(&path, &to_csv(result.all_records()))?;
    Ok(path)
}

// ─── JSON documents ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RecordsDocument<'a> {
    pub fetched_at: String,
    pub records: Vec<&'a SocialPostRecord>,
}

#[derive(Debug, Serialize)]
pub struct PlatformPosts<'a> {
    pub platform: Platform,
    pub total_spend: f64,
    pub posts: &'a [SocialPostRecord],
}

#[derive(Debug, Serialize)]
pub struct Platforms<'a> {
    pub facebook: PlatformPosts<'a>,
    pub instagram: PlatformPosts<'a>,
}

#[derive(Debug, Serialize)]
pub struct SocialMediaDocument<'a> {
    pub meta_fetched_at: String,
    pub platforms: Platforms<'a>,
}

#[derive(Debug, Serialize)]
pub struct CampaignsDocument {
    pub campaigns: Vec<CampaignInput>,
    pub meta_fetched_at: String,
}

#[derive(Debug, Serialize)]
pub struct CombinedDocument<'a> {
    pub social_media: SocialMediaDocument<'a>,
    pub campaigns: CampaignsDocument,
}

pub fn records_document(result: &FetchResult) -> RecordsDocument<'_> {
    RecordsDocument {
        fetched_at: format_fetched_at(&result.fetched_at),
        records: result.all_records().collect(),
    }
}

pub fn social_media_document(result: &FetchResult) -> SocialMediaDocument<'_> {
    SocialMediaDocument {
        meta_fetched_at: format_fetched_at(&result.fetched_at),
        platforms: Platforms {
            facebook: PlatformPosts {
                platform: Platform::Facebook,
                total_spend: 0.0,
                posts: &result.facebook,
            },
            instagram: PlatformPosts {
                platform: Platform::Instagram,
                total_spend: 0.0,
                posts: &result.instagram,
            },
        },
    }
}

fn campaign_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Facebook => "Facebook Page (organic)",
        Platform::Instagram => "Instagram (organic)",
    }
}

/// Organic aggregate of one platform's posts as an ROI input row. Organic
/// posts carry no spend or revenue; when no clicks were reported, total
/// engagement stands in for clicks.
pub fn organic_campaign(platform: Platform, records: &[SocialPostRecord]) -> Option<CampaignInput> {
    if records.is_empty() {
        return None;
    }
    let impressions = records.iter().fold(0u64, |acc, r| acc.saturating_add(r.impressions));
    let clicks = records.iter().fold(0u64, |acc, r| acc.saturating_add(r.clicks));
    let engagement = records.iter().fold(0u64, |acc, r| acc.saturating_add(r.engagement_total));

    Some(CampaignInput {
        name: campaign_name(platform).to_string(),
        channel: ORGANIC_CHANNEL.to_string(),
        spend: 0.0,
        revenue: 0.0,
        impressions,
        clicks: if clicks > 0 { clicks } else { engagement },
        leads: 0,
        customers: 0,
    })
}

pub fn campaigns_document(result: &FetchResult) -> CampaignsDocument {
    let campaigns = [
        organic_campaign(Platform::Facebook, &result.facebook),
        organic_campaign(Platform::Instagram, &result.instagram),
    ]
    .into_iter()
    .flatten()
    .collect();

    CampaignsDocument {
        campaigns,
        meta_fetched_at: format_fetched_at(&result.fetched_at),
    }
}

pub fn combined_document(result: &FetchResult) -> CombinedDocument<'_> {
    CombinedDocument {
        social_media: social_media_document(result),
        campaigns: campaigns_document(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_reporting::CampaignDocument;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn record(platform: Platform, id: &str, text: &str) -> SocialPostRecord {
        SocialPostRecord {
            platform,
            post_id: id.to_string(),
            media_type: String::new(),
            content_type: "text".to_string(),
            posted_at: "2025-02-01T10:00:00+0000".to_string(),
            text: text.to_string(),
            likes: 5,
            comments: 1,
            shares: 0,
            saves: 0,
            reach: 100,
            impressions: 200,
            engagement_total: 6,
            clicks: 0,
            fetched_at: "2025-03-04 05:06:07 UTC".to_string(),
        }
    }

    fn sample() -> FetchResult {
        FetchResult {
            fetched_at: Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
            facebook: vec![record(Platform::Facebook, "fb1", "hello")],
            instagram: vec![
                record(Platform::Instagram, "ig1", "a"),
                record(Platform::Instagram, "ig2", "b"),
            ],
        }
    }

    #[test]
    fn test_csv_header_and_order() {
        let csv = to_csv(sample().all_records());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
        assert!(lines[1].starts_with("instagram,ig1,"));
        assert!(lines[2].starts_with("instagram,ig2,"));
        assert!(lines[3].starts_with("facebook,fb1,"));
        assert!(lines[3].ends_with(",2025-03-04 05:06:07 UTC"));
    }

    #[test]
    fn test_csv_quoting_and_newlines() {
        let r = record(Platform::Instagram, "ig1", "Big \"sale\", today\nonly");
        let csv = to_csv([&r]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(",\"Big \"\"sale\"\", today only\","));
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn test_csv_output_path() {
        let at = NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        let dir = Path::new("results");
        assert_eq!(
            csv_output_path(dir, None, at),
            dir.join("instagram_stats_2025-03-04_0905.csv")
        );
        assert_eq!(
            csv_output_path(dir, Some("weekly.csv"), at),
            dir.join("weekly_2025-03-04_0905.csv")
        );
        assert_eq!(
            csv_output_path(dir, Some(""), at),
            dir.join("instagram_stats_2025-03-04_0905.csv")
        );
    }

    #[test]
    fn test_write_csv_creates_results_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let results = tmp.path().join("results");
        let path = write_csv(&sample(), &results, Some("run")).unwrap();

        assert_eq!(path, results.join("run_2025-03-04_0506.csv"));
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);
        let leftovers: Vec<_> = fs::read_dir(&results)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_records_document_shape() {
        let result = sample();
        let json = serde_json::to_value(records_document(&result)).unwrap();
        assert_eq!(json["fetched_at"], "2025-03-04 05:06:07 UTC");
        assert_eq!(json["records"].as_array().unwrap().len(), 3);
        assert_eq!(json["records"][0]["platform"], "instagram");
    }

    #[test]
    fn test_social_media_document_shape() {
        let result = sample();
        let json = serde_json::to_value(social_media_document(&result)).unwrap();
        assert_eq!(json["platforms"]["facebook"]["platform"], "facebook");
        assert_eq!(json["platforms"]["facebook"]["total_spend"], 0.0);
        assert_eq!(json["platforms"]["instagram"]["posts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_campaigns_document_is_roi_input() {
        let result = sample();
        let json = serde_json::to_string(&campaigns_document(&result)).unwrap();
        let doc: CampaignDocument = serde_json::from_str(&json).unwrap();

        assert_eq!(doc.campaigns.len(), 2);
        let ig = &doc.campaigns[1];
        assert_eq!(ig.name, "Instagram (organic)");
        assert_eq!(ig.channel, "organic_social");
        assert_eq!(ig.impressions, 400);
        // No clicks reported, so engagement stands in.
        assert_eq!(ig.clicks, 12);
        assert_eq!(ig.spend, 0.0);
    }

    #[test]
    fn test_campaigns_skip_empty_platform() {
        let mut result = sample();
        result.facebook.clear();
        let doc = campaigns_document(&result);
        assert_eq!(doc.campaigns.len(), 1);
        assert_eq!(doc.campaigns[0].name, "Instagram (organic)");
    }

    #[test]
    fn test_combined_document_keys() {
        let result = sample();
        let json = serde_json::to_value(combined_document(&result)).unwrap();
        assert!(json["social_media"]["platforms"].is_object());
        assert_eq!(json["campaigns"]["campaigns"].as_array().unwrap().len(), 2);
    }
}
