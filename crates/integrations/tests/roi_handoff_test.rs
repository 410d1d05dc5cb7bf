//! The fetcher's `campaigns` document must feed straight into the ROI
//! calculator.

#[cfg(test)]
mod tests {
    use campaign_core::input::parse_document;
    use campaign_integrations::export::campaigns_document;
    use campaign_integrations::{FetchResult, Platform, SocialPostRecord};
    use campaign_reporting::roi;
    use campaign_reporting::CampaignDocument;
    use chrono::{TimeZone, Utc};

    fn post(platform: Platform, id: &str, impressions: u64, clicks: u64, engagement: u64) -> SocialPostRecord {
        SocialPostRecord {
            platform,
            post_id: id.to_string(),
            media_type: String::new(),
            content_type: "image".to_string(),
            posted_at: "2025-02-01T10:00:00+0000".to_string(),
            text: String::new(),
            likes: 0,
            comments: 0,
            shares: 0,
            saves: 0,
            reach: 0,
            impressions,
            engagement_total: engagement,
            clicks,
            fetched_at: "2025-03-04 05:06:07 UTC".to_string(),
        }
    }

    #[test]
    fn test_organic_campaigns_evaluate_without_spend() {
        let result = FetchResult {
            fetched_at: Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
            facebook: vec![
                post(Platform::Facebook, "fb1", 1000, 20, 50),
                post(Platform::Facebook, "fb2", 1000, 30, 70),
            ],
            instagram: vec![post(Platform::Instagram, "ig1", 4000, 0, 200)],
        };

        let json = serde_json::to_string(&campaigns_document(&result)).unwrap();
        let document: CampaignDocument = parse_document(&json).unwrap();
        document.validate().unwrap();

        let report = roi::calculate(&document.campaigns);
        assert_eq!(report.campaigns.len(), 2);

        let facebook = &report.campaigns[0];
        assert_eq!(facebook.name, "Facebook Page (organic)");
        assert_eq!(facebook.benchmark_channel, "organic_social");
        assert_eq!(facebook.metrics.roi_pct, None);
        assert_eq!(facebook.metrics.roas, None);
        assert!((facebook.metrics.ctr_pct.unwrap() - 2.5).abs() < 1e-9);

        let instagram = &report.campaigns[1];
        assert_eq!(instagram.clicks, 200);
        assert!((instagram.metrics.ctr_pct.unwrap() - 5.0).abs() < 1e-9);
    }
}
