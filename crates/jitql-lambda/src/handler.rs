//! Lambda handler that routes events through a [`QueryExecutor`].

use std::sync::Arc;

use jitql_executor::{ExecutionRequest, QueryEngine, QueryError, QueryExecutor, Response};
use serde::Serialize;
use tracing::{debug, warn};

use crate::event::{response, Headers, LambdaEvent, LambdaResponse};

/// Body sent for validation failures and top-level errors.
#[derive(Serialize)]
struct ErrorBody<'a> {
    errors: &'a [QueryError],
}

/// Returned when even the error body cannot be serialized.
const FALLBACK_BODY: &str = r#"{"errors":[{"message":"internal error: response serialization failed"}]}"#;

type ContextFn<C> = dyn Fn(&LambdaEvent) -> C + Send + Sync;
type HeadersFn = dyn Fn(&LambdaEvent) -> Headers + Send + Sync;

/// Turns Lambda events into executor calls and executor responses into
/// HTTP-shaped Lambda responses.
///
/// | executor response | status | body |
/// |-------------------|--------|------|
/// | `Executed` | 200 | `{data, errors?}` |
/// | `ValidationFailed` | 400 | `{errors}` |
/// | `Failed`, or an undecodable event body | 500 | `{errors}` |
///
/// # Example
///
/// ```ignore
/// let handler = LambdaHandler::new(Arc::new(executor), |event| RequestContext::from(event))
///     .with_headers(|_| Headers::from([("x-powered-by".into(), "jitql".into())]));
///
/// let response = handler.handle(event).await;
/// ```
pub struct LambdaHandler<E, C>
where
    E: QueryEngine<C>,
    C: Sync,
{
    executor: Arc<QueryExecutor<E, C>>,
    create_context: Box<ContextFn<C>>,
    create_headers: Option<Box<HeadersFn>>,
}

impl<E, C> LambdaHandler<E, C>
where
    E: QueryEngine<C>,
    C: Sync,
{
    /// Creates a handler; `create_context` builds the resolver context for
    /// each event.
    pub fn new<F>(executor: Arc<QueryExecutor<E, C>>, create_context: F) -> Self
    where
        F: Fn(&LambdaEvent) -> C + Send + Sync + 'static,
    {
        Self {
            executor,
            create_context: Box::new(create_context),
            create_headers: None,
        }
    }

    /// Adds per-event response headers.
    pub fn with_headers<F>(mut self, create_headers: F) -> Self
    where
        F: Fn(&LambdaEvent) -> Headers + Send + Sync + 'static,
    {
        self.create_headers = Some(Box::new(create_headers));
        self
    }

    /// Returns the executor behind this handler.
    pub fn executor(&self) -> &Arc<QueryExecutor<E, C>> {
        &self.executor
    }

    /// Handles one event. Never fails; every problem becomes an error response.
    ///
    /// The resolver context is built first, then the custom headers, both
    /// before the body is decoded. Custom headers are sent on every response,
    /// including the 500 for an undecodable body.
    pub async fn handle(&self, event: LambdaEvent) -> LambdaResponse {
        let context = (self.create_context)(&event);
        let headers = self.create_headers.as_ref().map(|create| create(&event));

        let request = match event.graphql_request() {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "rejecting lambda event");
                let errors = [QueryError::new(err.to_string())];
                return Self::respond(500, &ErrorBody { errors: &errors }, headers.as_ref());
            }
        };

        let execution = ExecutionRequest {
            query: request.query,
            variables: request.variables,
            context,
            operation_name: request.operation_name,
        };

        match self.executor.execute(execution).await {
            Response::Executed(result) => Self::respond(200, &result, headers.as_ref()),
            Response::ValidationFailed { validation_errors } => Self::respond(
                400,
                &ErrorBody {
                    errors: &validation_errors,
                },
                headers.as_ref(),
            ),
            Response::Failed { errors } => {
                Self::respond(500, &ErrorBody { errors: &errors }, headers.as_ref())
            }
        }
    }

    fn respond<T: Serialize>(
        status_code: u16,
        body: &T,
        headers: Option<&Headers>,
    ) -> LambdaResponse {
        debug!(status_code, "lambda response");
        match response(status_code, body, headers) {
            Ok(res) => res,
            Err(err) => {
                warn!(error = %err, "failed to serialize lambda response");
                LambdaResponse {
                    status_code: 500,
                    headers: Headers::from([(
                        "content-type".to_string(),
                        "application/json".to_string(),
                    )]),
                    body: FALLBACK_BODY.to_string(),
                }
            }
        }
    }
}
