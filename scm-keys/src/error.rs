use thiserror::Error;

/// All errors generated in `scm-keys`.
///
/// Only loading the reference series is fallible. Everything downstream of it
/// degrades to "no annotation" instead of erroring.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum KeyError {
    #[error("invalid price history url: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP error status: {0}")]
    Status(u16),

    #[error("failed to parse price history JSON: {0}")]
    Json(String),
}

impl KeyError {
    /// Determine if a manual retry of the fetch could succeed.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_transient(&self) -> bool {
        match self {
            KeyError::Http(_) => true,
            KeyError::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for KeyError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}

impl From<serde_json::Error> for KeyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

impl From<url::ParseError> for KeyError {
    fn from(value: url::ParseError) -> Self {
        Self::InvalidUrl(value.to_string())
    }
}
