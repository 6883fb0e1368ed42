//! Error taxonomy for media resolution.
//!
//! Every failure surfaced by the [`Client`](crate::Client), the
//! [`ExtractorRegistry`](crate::ExtractorRegistry) and the built-in
//! extractors is one of these variants. Nothing in the library panics or
//! terminates the process on a resolution failure.

use thiserror::Error;

/// Resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("None of the registered extractors can handle URI: {0}")]
    NoExtractor(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    #[error("Invalid media info: {0}")]
    InvariantViolation(String),

    #[error("Operation was cancelled")]
    Cancelled,
}

impl ResolveError {
    /// Short lowercase name of the error kind, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUri(_) => "invalid_uri",
            Self::NoExtractor(_) => "no_extractor",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::UnsupportedContent(_) => "unsupported_content",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timed out: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for ResolveError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUri(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_include_payload() {
        let err = ResolveError::NoExtractor("https://example.org/x".into());
        assert_eq!(
            err.to_string(),
            "None of the registered extractors can handle URI: https://example.org/x"
        );
        assert_eq!(ResolveError::Cancelled.to_string(), "Operation was cancelled");
    }

    #[test]
    fn json_errors_become_parse_errors() {
        let err: ResolveError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn url_errors_become_invalid_uri() {
        let err: ResolveError = url::Url::parse("no scheme here").unwrap_err().into();
        assert!(matches!(err, ResolveError::InvalidUri(_)));
    }
}
