//! Meta Graph API client for Facebook Page posts and Instagram Business media
//! with their insights. Requests are blocking and strictly sequential.

use std::collections::BTreeMap;
use std::time::Duration;

use campaign_core::FetcherConfig;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::GraphApiError;
use crate::records::{self, SocialPostRecord};

/// Largest page size the Graph API honours for edge listings.
pub const MAX_PAGE_SIZE: usize = 100;

pub const DEFAULT_LIMIT: usize = 25;

const FACEBOOK_POST_FIELDS: &str = "id,message,created_time,full_picture";
const FACEBOOK_POST_METRICS: &str = "post_impressions,post_engaged_users,post_clicks";
const INSTAGRAM_MEDIA_FIELDS: &str =
    "id,media_type,media_product_type,caption,timestamp,like_count,comments_count";

// ─── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookPost {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub full_picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstagramMedia {
    pub id: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub media_product_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub comments_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    cursors: Option<Cursors>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Cursors {
    #[serde(default)]
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsightsResponse {
    #[serde(default)]
    data: Vec<InsightMetric>,
}

#[derive(Debug, Deserialize)]
struct InsightMetric {
    name: String,
    #[serde(default)]
    values: Vec<InsightValue>,
    #[serde(default)]
    total_value: Option<InsightValue>,
}

#[derive(Debug, Deserialize)]
struct InsightValue {
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PageAccounts {
    #[serde(default)]
    instagram_business_account: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// Metric name → value, taking the latest period of each metric.
pub type Insights = BTreeMap<String, u64>;

fn insight_value(value: &serde_json::Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
        .unwrap_or(0)
}

fn collect_insights(response: InsightsResponse) -> Insights {
    response
        .data
        .into_iter()
        .filter_map(|metric| {
            let latest = metric.values.last().or(metric.total_value.as_ref())?;
            Some((metric.name, insight_value(&latest.value)))
        })
        .collect()
}

// ─── Client ─────────────────────────────────────────────────────────────────

pub struct GraphClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_version: String,
    access_token: String,
}

impl GraphClient {
    pub fn new(config: &FetcherConfig, access_token: impl Into<String>) -> Result<Self, GraphApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.graph_api_base.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            access_token: access_token.into(),
        })
    }

    /// GET `/{version}/{path}` and decode the JSON body. Non-success statuses
    /// become [`GraphApiError::Api`] carrying the Graph error message.
    pub fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, GraphApiError> {
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            self.api_version,
            path.trim_start_matches('/')
        );
        debug!(path, "Graph API request");

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("access_token", self.access_token.as_str())])
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let (message, code) = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) if !envelope.error.message.is_empty() => {
                    (envelope.error.message, envelope.error.code)
                }
                Ok(envelope) => (body.clone(), envelope.error.code),
                Err(_) if !body.is_empty() => (body, None),
                Err(_) => (
                    status.canonical_reason().unwrap_or("request failed").to_string(),
                    None,
                ),
            };
            return Err(GraphApiError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| GraphApiError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Walk an edge with cursor pagination until `limit` items are collected
    /// or the edge is exhausted.
    fn list_edge<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &str,
        limit: usize,
    ) -> Result<Vec<T>, GraphApiError> {
        let mut items: Vec<T> = Vec::new();
        let mut after: Option<String> = None;

        while items.len() < limit {
            let page_size = (limit - items.len()).min(MAX_PAGE_SIZE);
            let mut params = vec![("fields", fields.to_string()), ("limit", page_size.to_string())];
            if let Some(cursor) = &after {
                params.push(("after", cursor.clone()));
            }

            let page: Page<T> = self.get(path, &params)?;
            if page.data.is_empty() {
                break;
            }
            items.extend(page.data);

            after = page
                .paging
                .filter(|p| p.next.is_some())
                .and_then(|p| p.cursors)
                .and_then(|c| c.after);
            if after.is_none() {
                break;
            }
        }

        items.truncate(limit);
        Ok(items)
    }

    pub fn page_posts(&self, page_id: &str, limit: usize) -> Result<Vec<FacebookPost>, GraphApiError> {
        self.list_edge(&format!("{page_id}/posts"), FACEBOOK_POST_FIELDS, limit)
    }

    pub fn post_insights(&self, post_id: &str) -> Result<Insights, GraphApiError> {
        let response: InsightsResponse = self.get(
            &format!("{post_id}/insights"),
            &[("metric", FACEBOOK_POST_METRICS.to_string())],
        )?;
        Ok(collect_insights(response))
    }

    /// The Instagram Business account linked to a Page, if any.
    pub fn instagram_business_id(&self, page_id: &str) -> Result<Option<String>, GraphApiError> {
        let accounts: PageAccounts = self.get(
            page_id,
            &[("fields", "instagram_business_account".to_string())],
        )?;
        Ok(accounts.instagram_business_account.and_then(|value| match value {
            serde_json::Value::Object(map) => map.get("id").and_then(|id| match id {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }))
    }

    pub fn instagram_media(&self, ig_user_id: &str, limit: usize) -> Result<Vec<InstagramMedia>, GraphApiError> {
        self.list_edge(&format!("{ig_user_id}/media"), INSTAGRAM_MEDIA_FIELDS, limit)
    }

    /// Insights for one media object. A plain 400 means the metric set does
    /// not apply to this media; that yields empty insights with a warning.
    /// Throttling and every other failure propagate.
    pub fn media_insights(&self, media: &InstagramMedia) -> Result<Insights, GraphApiError> {
        let metrics = records::instagram_insight_metrics(
            media.media_type.as_deref().unwrap_or("IMAGE"),
            media.media_product_type.as_deref().unwrap_or("FEED"),
        );
        let result = self.get::<InsightsResponse>(
            &format!("{}/insights", media.id),
            &[("metric", metrics), ("period", "lifetime".to_string())],
        );
        match result {
            Ok(response) => Ok(collect_insights(response)),
            Err(e) if e.is_bad_request() => {
                warn!(media_id = %media.id, error = %e, "Instagram insights unavailable, using zeros");
                Ok(Insights::new())
            }
            Err(e) => Err(e),
        }
    }
}

// ─── Fetch run ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub page_id: String,
    /// Maximum posts per platform.
    pub limit: usize,
    /// Skip the Facebook Page posts entirely.
    pub instagram_only: bool,
}

/// Normalized records of one fetch run.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub fetched_at: DateTime<Utc>,
    pub facebook: Vec<SocialPostRecord>,
    pub instagram: Vec<SocialPostRecord>,
}

impl FetchResult {
    /// Instagram rows first, then Facebook rows.
    pub fn all_records(&self) -> impl Iterator<Item = &SocialPostRecord> {
        self.instagram.iter().chain(self.facebook.iter())
    }
}

pub fn fetch_facebook(
    client: &GraphClient,
    page_id: &str,
    limit: usize,
    fetched_at: &str,
) -> Result<Vec<SocialPostRecord>, GraphApiError> {
    let posts = client.page_posts(page_id, limit)?;
    info!(count = posts.len(), "Fetched Facebook Page posts");

    posts
        .iter()
        .map(|post| {
            let insights = client.post_insights(&post.id)?;
            Ok(records::normalize_facebook(post, &insights, fetched_at))
        })
        .collect()
}

pub fn fetch_instagram(
    client: &GraphClient,
    ig_user_id: &str,
    limit: usize,
    fetched_at: &str,
) -> Result<Vec<SocialPostRecord>, GraphApiError> {
    let media = client.instagram_media(ig_user_id, limit)?;
    info!(count = media.len(), "Fetched Instagram media");

    media
        .iter()
        .map(|m| {
            let insights = client.media_insights(m)?;
            Ok(records::normalize_instagram(m, &insights, fetched_at))
        })
        .collect()
}

/// Run a complete fetch: Facebook posts (unless `instagram_only`), then the
/// linked Instagram account's media. Aborts on the first unrecoverable error.
pub fn fetch_content(client: &GraphClient, options: &FetchOptions) -> Result<FetchResult, GraphApiError> {
    let fetched_at = Utc::now();
    let stamp = records::format_fetched_at(&fetched_at);

    let facebook = if options.instagram_only {
        Vec::new()
    } else {
        fetch_facebook(client, &options.page_id, options.limit, &stamp)?
    };

    let instagram = match client.instagram_business_id(&options.page_id)? {
        Some(ig_user_id) => fetch_instagram(client, &ig_user_id, options.limit, &stamp)?,
        None => {
            warn!(page_id = %options.page_id, "No Instagram Business account linked to this Page");
            Vec::new()
        }
    };

    Ok(FetchResult {
        fetched_at,
        facebook,
        instagram,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
