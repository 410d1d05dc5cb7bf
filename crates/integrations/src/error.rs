use thiserror::Error;

/// Graph API error codes that signal throttling (application, user, page and
/// custom-rate limits).
const RATE_LIMIT_CODES: [i64; 5] = [4, 17, 32, 613, 80001];

#[derive(Error, Debug)]
pub enum GraphApiError {
    /// The API answered with a non-success status.
    #[error("Graph API error (HTTP {status}{}): {message}", code_suffix(.code))]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|c| format!(", code {c}")).unwrap_or_default()
}

impl GraphApiError {
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                *status == 429 || code.is_some_and(|c| RATE_LIMIT_CODES.contains(&c))
            }
            _ => false,
        }
    }

    /// A 400 that is not throttling: the request itself was rejected, e.g. a
    /// metric that does not apply to this media.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::Api { status: 400, .. }) && !self.is_rate_limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: Option<i64>) -> GraphApiError {
        GraphApiError::Api {
            status,
            code,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(api(429, None).is_rate_limit());
        assert!(api(400, Some(4)).is_rate_limit());
        assert!(api(403, Some(32)).is_rate_limit());
        assert!(!api(400, Some(100)).is_rate_limit());
    }

    #[test]
    fn test_bad_request_excludes_throttling() {
        assert!(api(400, Some(100)).is_bad_request());
        assert!(!api(400, Some(17)).is_bad_request());
        assert!(!api(500, None).is_bad_request());
    }

    #[test]
    fn test_display_includes_status_and_code() {
        assert_eq!(
            api(400, Some(190)).to_string(),
            "Graph API error (HTTP 400, code 190): boom"
        );
        assert_eq!(api(502, None).to_string(), "Graph API error (HTTP 502): boom");
    }
}
