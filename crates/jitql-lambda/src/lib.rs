//! # jitql-lambda
//!
//! AWS-Lambda-style adapter for [`jitql_executor`].
//!
//! Decodes the JSON body of an HTTP event into a GraphQL request, runs it
//! through a shared [`QueryExecutor`](jitql_executor::QueryExecutor) and maps
//! the executor's three response shapes onto HTTP status codes.
//!
//! ```ignore
//! use jitql_lambda::{GraphQLRequest, Headers, LambdaEvent, LambdaHandler};
//!
//! let handler = LambdaHandler::new(Arc::new(executor), |_event| RequestContext::default());
//!
//! let event = LambdaEvent::post(&GraphQLRequest::new("{ posts { id } }"), Headers::new())?;
//! let response = handler.handle(event).await;
//! assert_eq!(response.status_code, 200);
//! ```

#![warn(missing_docs)]

mod error;
mod event;
mod handler;

pub use error::{LambdaError, LambdaResult};
pub use event::{response, GraphQLRequest, Headers, HttpMethod, LambdaEvent, LambdaResponse};
pub use handler::LambdaHandler;
