//! Error types for the Lambda adapter.

use thiserror::Error;

/// Errors that can occur while translating Lambda events.
#[derive(Error, Debug)]
pub enum LambdaError {
    /// The event body is not a JSON GraphQL request.
    #[error("invalid request body: {0}")]
    InvalidBody(#[source] serde_json::Error),

    /// A request or response body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Result type for Lambda adapter operations.
pub type LambdaResult<T> = std::result::Result<T, LambdaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_body_display() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = LambdaError::InvalidBody(source);
        assert!(err.to_string().starts_with("invalid request body: "));
    }
}
