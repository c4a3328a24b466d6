//! Error types for query execution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A position in the query source text (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number, starting at 1.
    pub line: usize,
    /// Column number, starting at 1.
    pub column: usize,
}

/// One step of the response path an error is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field name or alias.
    Key(String),
    /// A list index.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// An error reported by a query engine collaborator.
///
/// Serializes in the conventional GraphQL error shape: `message`, plus
/// `locations` and `path` when they are known.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct QueryError {
    /// Human readable description.
    pub message: String,
    /// Source positions the error refers to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<SourceLocation>,
    /// Response path of the field that failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
}

impl QueryError {
    /// Creates an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Adds a source location.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.locations.push(SourceLocation { line, column });
        self
    }

    /// Sets the response path.
    pub fn with_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }
}

/// Errors raised by the executor itself.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// Cache or executor configuration rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error reported by a query engine collaborator.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A collaborator panicked or otherwise misbehaved.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ExecutorError> for QueryError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Query(query) => query,
            other => QueryError::new(other.to_string()),
        }
    }
}

/// Result type for executor operations.
pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;
