//! Campaign analytics calculations: multi-touch attribution, funnel
//! conversion, and campaign ROI with channel benchmarks.

pub mod attribution;
pub mod benchmarks;
pub mod funnel;
pub mod roi;

pub use attribution::{AttributionModel, AttributionReport, JourneyDocument, ModelComparison};
pub use funnel::{FunnelDocument, FunnelReport};
pub use roi::{CampaignDocument, CampaignInput, RoiReport};
