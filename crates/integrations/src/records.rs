//! Normalized per-post records shared by every fetcher output.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::meta::{FacebookPost, Insights, InstagramMedia};

const INSTAGRAM_TEXT_LIMIT: usize = 500;
const FACEBOOK_TEXT_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One post or media item with its engagement counters. Field order is the
/// CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialPostRecord {
    pub platform: Platform,
    pub post_id: String,
    pub media_type: String,
    pub content_type: String,
    pub posted_at: String,
    pub text: String,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub saves: u64,
    pub reach: u64,
    pub impressions: u64,
    pub engagement_total: u64,
    pub clicks: u64,
    pub fetched_at: String,
}

pub fn format_fetched_at(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Truncate to at most `max` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn is_video(media_type: &str, product_type: &str) -> bool {
    media_type.eq_ignore_ascii_case("VIDEO") || product_type.eq_ignore_ascii_case("REELS")
}

/// Comma-separated insight metrics to request for a media item. Video and
/// reels report `views`; everything else reports `impressions`.
pub fn instagram_insight_metrics(media_type: &str, product_type: &str) -> String {
    let extra = if is_video(media_type, product_type) {
        "views"
    } else {
        "impressions"
    };
    format!("reach,saved,shares,{extra}")
}

pub fn instagram_content_type(media_type: &str, product_type: &str) -> &'static str {
    if is_video(media_type, product_type) {
        "video"
    } else if media_type.eq_ignore_ascii_case("CAROUSEL_ALBUM") {
        "carousel"
    } else {
        "image"
    }
}

fn metric(insights: &Insights, name: &str) -> u64 {
    insights.get(name).copied().unwrap_or(0)
}

pub fn normalize_instagram(media: &InstagramMedia, insights: &Insights, fetched_at: &str) -> SocialPostRecord {
    let media_type = media.media_type.clone().unwrap_or_default();
    let product_type = media.media_product_type.as_deref().unwrap_or("");

    let likes = media.like_count.unwrap_or(0);
    let comments = media.comments_count.unwrap_or(0);
    let shares = metric(insights, "shares");
    let saves = metric(insights, "saved");
    let reach = metric(insights, "reach");
    // A zero impressions or views count falls through to the next metric.
    let impressions = [insights.get("impressions"), insights.get("views")]
        .into_iter()
        .flatten()
        .copied()
        .find(|v| *v > 0)
        .unwrap_or(reach);

    SocialPostRecord {
        platform: Platform::Instagram,
        post_id: media.id.clone(),
        content_type: instagram_content_type(&media_type, product_type).to_string(),
        media_type,
        posted_at: media.timestamp.clone().unwrap_or_default(),
        text: truncate_chars(media.caption.as_deref().unwrap_or(""), INSTAGRAM_TEXT_LIMIT),
        likes,
        comments,
        shares,
        saves,
        reach,
        impressions,
        engagement_total: likes
            .saturating_add(comments)
            .saturating_add(shares)
            .saturating_add(saves),
        clicks: 0,
        fetched_at: fetched_at.to_string(),
    }
}

/// Page post insights only expose engaged users, so it stands in for both
/// reach and total engagement.
pub fn normalize_facebook(post: &FacebookPost, insights: &Insights, fetched_at: &str) -> SocialPostRecord {
    let engaged = metric(insights, "post_engaged_users");
    let content_type = if post.full_picture.as_deref().is_some_and(|p| !p.is_empty()) {
        "image"
    } else {
        "text"
    };

    SocialPostRecord {
        platform: Platform::Facebook,
        post_id: post.id.clone(),
        media_type: String::new(),
        content_type: content_type.to_string(),
        posted_at: post.created_time.clone().unwrap_or_default(),
        text: truncate_chars(post.message.as_deref().unwrap_or(""), FACEBOOK_TEXT_LIMIT),
        likes: 0,
        comments: 0,
        shares: 0,
        saves: 0,
        reach: engaged,
        impressions: metric(insights, "post_impressions"),
        engagement_total: engaged,
        clicks: metric(insights, "post_clicks"),
        fetched_at: fetched_at.to_string(),
    }
}
