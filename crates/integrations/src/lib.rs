//! Meta Graph API integration: fetches Facebook Page and Instagram Business
//! posts with insights, normalizes them, and exports CSV or JSON.

pub mod error;
pub mod export;
pub mod meta;
pub mod records;

pub use error::GraphApiError;
pub use meta::{fetch_content, FetchOptions, FetchResult, GraphClient};
pub use records::{Platform, SocialPostRecord};
