//! Result types for query execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryError;

/// Variable values supplied with a request.
pub type Variables = serde_json::Map<String, Value>;

/// Output of an execution engine, interpreted or compiled.
///
/// `data` together with a non-empty `errors` list is a valid partial result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The response data, `null` if execution failed before producing any.
    #[serde(default)]
    pub data: Option<Value>,
    /// Errors raised while resolving fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<QueryError>,
}

impl ExecutionResult {
    /// A result carrying data and no errors.
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// A result carrying optional partial data and field errors.
    pub fn partial(data: Option<Value>, errors: Vec<QueryError>) -> Self {
        Self { data, errors }
    }

    /// Returns true if the engine reported any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// What the executor returns for a request: exactly one of three shapes.
///
/// Serializes untagged, so the JSON form is `{data, errors?}`,
/// `{validationErrors}` or `{errors}`.
///
/// # Example
///
/// ```
/// use jitql_executor::{QueryError, Response};
///
/// let response = Response::failed(QueryError::new("Syntax Error: Unexpected <EOF>."));
/// assert_eq!(
///     serde_json::to_string(&response).unwrap(),
///     r#"{"errors":[{"message":"Syntax Error: Unexpected <EOF>."}]}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// The query ran; engine output is returned unchanged.
    Executed(ExecutionResult),
    /// The query parsed but failed validation; nothing was executed.
    ValidationFailed {
        /// The validator's errors, never empty.
        #[serde(rename = "validationErrors")]
        validation_errors: Vec<QueryError>,
    },
    /// A top-level failure such as a syntax error or a collaborator fault.
    Failed {
        /// The single top-level error.
        errors: Vec<QueryError>,
    },
}

impl Response {
    /// A top-level failure from one error.
    pub fn failed(error: impl Into<QueryError>) -> Self {
        Response::Failed {
            errors: vec![error.into()],
        }
    }

    /// Returns the engine output if the query ran.
    pub fn execution(&self) -> Option<&ExecutionResult> {
        match self {
            Response::Executed(result) => Some(result),
            _ => None,
        }
    }

    /// Returns the validation errors if validation failed.
    pub fn validation_errors(&self) -> Option<&[QueryError]> {
        match self {
            Response::ValidationFailed { validation_errors } => Some(validation_errors),
            _ => None,
        }
    }

    /// Returns the top-level errors if the request failed outright.
    pub fn top_level_errors(&self) -> Option<&[QueryError]> {
        match self {
            Response::Failed { errors } => Some(errors),
            _ => None,
        }
    }

    /// Returns true for the `Executed` shape.
    pub fn is_executed(&self) -> bool {
        matches!(self, Response::Executed(_))
    }
}

impl From<ExecutionResult> for Response {
    fn from(result: ExecutionResult) -> Self {
        Response::Executed(result)
    }
}
