//! Errors raised while turning a FicHub payload into typed records.

use thiserror::Error;

/// Failure while decoding, reshaping, or constructing a story record.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("Response body is not valid JSON: {source}")]
    Decode { source: serde_json::Error },

    #[error("Response body is not a JSON object")]
    NotAnObject,

    /// A key the reshaper indexes directly was absent or had the wrong type.
    #[error("Missing or malformed key '{key}' in payload for {source_url}")]
    Shaping { key: String, source_url: String },

    #[error("Malformed timestamp in '{field}': {value:?}")]
    MalformedTimestamp { field: &'static str, value: String },

    /// The normalized mapping does not fit the target record.
    #[error("Normalized payload does not match the story record: {reason}")]
    Validation { reason: String },
}

impl ShapeError {
    pub(crate) fn shaping(key: impl Into<String>, source_url: &str) -> Self {
        ShapeError::Shaping {
            key: key.into(),
            source_url: source_url.to_string(),
        }
    }
}
