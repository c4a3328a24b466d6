//! Lambda event and response payloads.

use std::collections::HashMap;

use jitql_executor::Variables;
use serde::{Deserialize, Serialize};

use crate::error::{LambdaError, LambdaResult};

/// HTTP header map.
pub type Headers = HashMap<String, String>;

/// HTTP method of an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `POST`
    Post,
    /// `GET`
    Get,
}

/// An incoming Lambda event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaEvent {
    /// Request method.
    pub http_method: HttpMethod,
    /// Request headers.
    #[serde(default)]
    pub headers: Headers,
    /// JSON encoded [`GraphQLRequest`].
    pub body: String,
}

impl LambdaEvent {
    /// Builds a POST event carrying `request` as its body.
    ///
    /// Lets users of the handler construct events in their own tests.
    pub fn post(request: &GraphQLRequest, headers: Headers) -> LambdaResult<Self> {
        let body = serde_json::to_string(request).map_err(LambdaError::Serialization)?;
        Ok(Self {
            http_method: HttpMethod::Post,
            headers,
            body,
        })
    }

    /// Decodes the body into a GraphQL request.
    pub fn graphql_request(&self) -> LambdaResult<GraphQLRequest> {
        serde_json::from_str(&self.body).map_err(LambdaError::InvalidBody)
    }
}

/// The decoded body of a Lambda event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    /// Query text.
    pub query: String,
    /// Variable values, `{}` when absent.
    #[serde(default)]
    pub variables: Variables,
    /// Operation to run when the document holds several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    /// Creates a request with no variables.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Variables::new(),
            operation_name: None,
        }
    }

    /// Sets the variable values.
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Sets the operation name.
    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }
}

/// The Lambda's HTTP-shaped response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: Headers,
    /// JSON body.
    pub body: String,
}

/// Builds a JSON response.
///
/// `content-type: application/json` is always set; `headers` are merged on
/// top and win on conflict.
pub fn response<T: Serialize + ?Sized>(
    status_code: u16,
    body: &T,
    headers: Option<&Headers>,
) -> LambdaResult<LambdaResponse> {
    let body = serde_json::to_string(body).map_err(LambdaError::Serialization)?;
    let mut merged = Headers::from([(
        "content-type".to_string(),
        "application/json".to_string(),
    )]);
    if let Some(headers) = headers {
        merged.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    Ok(LambdaResponse {
        status_code,
        headers: merged,
        body,
    })
}
