//! Shared plumbing for the campaign analytics tools: error types, runtime
//! configuration, JSON input loading, output selection and tracing setup.

pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod ratio;
pub mod telemetry;

pub use config::FetcherConfig;
pub use error::{AnalyticsError, AnalyticsResult};
pub use output::OutputFormat;
