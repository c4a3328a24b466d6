//! Query executor implementation.

use std::any::Any;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheKey, QueryCache};
use crate::config::{CompileFailurePolicy, ExecutorConfig};
use crate::error::{ExecutorError, ExecutorResult};
use crate::result::{ExecutionResult, Response, Variables};
use crate::statistics::{ExecutorStats, ExecutorStatsSnapshot, Outcome};
use crate::traits::{CompiledQuery, InterpretRequest, QueryEngine};

/// One query to execute.
#[derive(Debug, Clone)]
pub struct ExecutionRequest<C> {
    /// Raw query text. Also the cache identity of the query.
    pub query: String,
    /// Variable values.
    pub variables: Variables,
    /// Caller-supplied context handed to resolvers.
    pub context: C,
    /// Operation to run when the document holds several.
    pub operation_name: Option<String>,
}

impl<C> ExecutionRequest<C> {
    /// Creates a request with no variables and no operation name.
    pub fn new(query: impl Into<String>, context: C) -> Self {
        Self {
            query: query.into(),
            variables: Variables::new(),
            context,
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

/// What to do with a valid query that missed the compiled fast path.
enum Plan<A> {
    /// Another caller compiled the query in the meantime.
    RunCompiled(Arc<A>),
    /// The threshold is reached; compile, then store `occurrence_count`.
    Compile { occurrence_count: u64 },
    /// Below the threshold (already recorded), or a remembered compile failure.
    Interpret,
}

/// Adaptive query executor.
///
/// Each query text is interpreted until it has been seen `jit_threshold`
/// times (counting only parseable and valid occurrences), then compiled once
/// and served from the compiled artifact on every later request.
///
/// # Example
///
/// ```ignore
/// use jitql_executor::{CacheConfig, ExecutionRequest, ExecutorConfig, QueryCache, QueryExecutor};
/// use std::sync::Arc;
///
/// let cache = Arc::new(QueryCache::new(CacheConfig::with_max_size(1000))?);
/// let config = ExecutorConfig::builder().with_jit_threshold(2).build();
/// let executor = QueryExecutor::new(MyEngine, Arc::new(schema), cache, config);
///
/// let response = executor
///     .execute(ExecutionRequest::new("{ posts { id } }", context))
///     .await;
/// ```
pub struct QueryExecutor<E, C>
where
    E: QueryEngine<C>,
    C: Sync,
{
    /// The query engine collaborators.
    engine: E,
    /// Schema every query runs against.
    schema: Arc<E::Schema>,
    /// Compilation cache, possibly shared with other executors.
    cache: Arc<QueryCache<E::Compiled>>,
    /// Executor configuration.
    config: ExecutorConfig,
    /// Dispatch counters.
    stats: ExecutorStats,
    _context: PhantomData<fn(&C)>,
}

impl<E, C> QueryExecutor<E, C>
where
    E: QueryEngine<C>,
    C: Sync,
{
    /// Creates an executor over a schema and a compilation cache.
    pub fn new(
        engine: E,
        schema: Arc<E::Schema>,
        cache: Arc<QueryCache<E::Compiled>>,
        config: ExecutorConfig,
    ) -> Self {
        info!(
            jit_threshold = config.jit_threshold,
            compile_failure = ?config.compile_failure,
            cache_capacity = cache.capacity(),
            "query executor created"
        );
        Self {
            engine,
            schema,
            cache,
            config,
            stats: ExecutorStats::default(),
            _context: PhantomData,
        }
    }

    /// Returns the compilation cache.
    pub fn cache(&self) -> &Arc<QueryCache<E::Compiled>> {
        &self.cache
    }

    /// Returns the schema.
    pub fn schema(&self) -> &Arc<E::Schema> {
        &self.schema
    }

    /// Returns the query engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns a reference to the executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns a snapshot of the dispatch counters.
    pub fn stats(&self) -> ExecutorStatsSnapshot {
        self.stats.snapshot()
    }

    /// Executes a query.
    ///
    /// Never fails: syntax errors, collaborator errors and collaborator
    /// panics all come back as [`Response::Failed`], validation errors as
    /// [`Response::ValidationFailed`], and everything the engines produce
    /// (including partial data with field errors) as [`Response::Executed`].
    pub async fn execute(&self, request: ExecutionRequest<C>) -> Response {
        let ExecutionRequest {
            query,
            variables,
            context,
            operation_name,
        } = request;

        let dispatched = AssertUnwindSafe(self.dispatch(
            &query,
            &variables,
            &context,
            operation_name.as_deref(),
        ))
        .catch_unwind()
        .await;

        let (outcome, response) = match dispatched {
            Ok(Ok(done)) => done,
            Ok(Err(err)) => {
                debug!(key = %CacheKey::from_query(&query), error = %err, "query failed");
                (Outcome::Failed, Response::failed(err))
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                warn!(key = %CacheKey::from_query(&query), panic = %message, "query engine panicked");
                (
                    Outcome::Failed,
                    Response::failed(ExecutorError::Internal(message)),
                )
            }
        };
        self.stats.record(outcome);
        response
    }

    async fn dispatch(
        &self,
        query: &str,
        variables: &Variables,
        context: &C,
        operation_name: Option<&str>,
    ) -> ExecutorResult<(Outcome, Response)> {
        let entry = self.cache.get(query);
        if let Some(compiled) = entry.compiled {
            debug!(
                key = %CacheKey::from_query(query),
                occurrences = entry.occurrence_count,
                "running cached compiled query"
            );
            let result = run_compiled(compiled.as_ref(), context, variables).await?;
            return Ok((Outcome::CompiledHit, result.into()));
        }

        let document = self.engine.parse(query)?;
        let validation_errors = self.engine.validate(&self.schema, &document);
        if !validation_errors.is_empty() {
            debug!(
                key = %CacheKey::from_query(query),
                errors = validation_errors.len(),
                "query failed validation"
            );
            return Ok((
                Outcome::ValidationFailed,
                Response::ValidationFailed { validation_errors },
            ));
        }

        match self.plan(query) {
            Plan::RunCompiled(compiled) => {
                debug!(
                    key = %CacheKey::from_query(query),
                    "running query compiled by a concurrent request"
                );
                let result = run_compiled(compiled.as_ref(), context, variables).await?;
                return Ok((Outcome::CompiledRace, result.into()));
            }
            Plan::Compile { occurrence_count } => {
                match self.engine.compile(&self.schema, &document, operation_name)? {
                    Ok(compiled) => {
                        debug!(
                            key = %CacheKey::from_query(query),
                            occurrences = occurrence_count,
                            "compiled query"
                        );
                        let compiled = self.store_compiled(query, occurrence_count, compiled);
                        let result = run_compiled(compiled.as_ref(), context, variables).await?;
                        return Ok((Outcome::Compiled, result.into()));
                    }
                    Err(not_compilable) => {
                        warn!(
                            key = %CacheKey::from_query(query),
                            reason = %not_compilable.reason,
                            "query is not compilable, interpreting"
                        );
                        self.stats.record_compile_failure();
                        if self.config.compile_failure == CompileFailurePolicy::Remember {
                            self.remember_compile_failure(query, occurrence_count);
                        }
                    }
                }
            }
            Plan::Interpret => {}
        }

        debug!(key = %CacheKey::from_query(query), "interpreting query");
        let result = self
            .engine
            .interpret(InterpretRequest {
                schema: self.schema.as_ref(),
                document: &document,
                variables,
                context,
                operation_name,
            })
            .await?;
        Ok((Outcome::Interpreted, result.into()))
    }

    /// Records one more valid occurrence and decides how to run it.
    fn plan(&self, query: &str) -> Plan<E::Compiled> {
        let threshold = self.config.jit_threshold;
        let remember = self.config.compile_failure == CompileFailurePolicy::Remember;
        self.cache.update(query, |entry| {
            if let Some(compiled) = entry.compiled {
                return (None, Plan::RunCompiled(compiled));
            }
            let occurrence_count = entry.occurrence_count + 1;
            if remember && entry.compile_failed {
                (
                    Some(CacheEntry::not_compilable(occurrence_count)),
                    Plan::Interpret,
                )
            } else if occurrence_count >= threshold {
                // stored only once compilation succeeds
                (None, Plan::Compile { occurrence_count })
            } else {
                (Some(CacheEntry::seen(occurrence_count)), Plan::Interpret)
            }
        })
    }

    /// Stores a fresh artifact unless a concurrent caller stored one first,
    /// and returns the artifact now in the cache. The stored count becomes the
    /// larger of the two.
    fn store_compiled(
        &self,
        query: &str,
        occurrence_count: u64,
        compiled: E::Compiled,
    ) -> Arc<E::Compiled> {
        let compiled = Arc::new(compiled);
        self.cache.update(query, |current| match current.compiled {
            Some(existing) if current.occurrence_count >= occurrence_count => (None, existing),
            Some(existing) => (
                Some(CacheEntry::compiled(occurrence_count, Arc::clone(&existing))),
                existing,
            ),
            None => {
                let count = occurrence_count.max(current.occurrence_count);
                (
                    Some(CacheEntry::compiled(count, Arc::clone(&compiled))),
                    compiled,
                )
            }
        })
    }

    fn remember_compile_failure(&self, query: &str, occurrence_count: u64) {
        self.cache.update(query, |current| {
            if current.is_compiled() {
                return (None, ());
            }
            let count = occurrence_count.max(current.occurrence_count);
            (Some(CacheEntry::not_compilable(count)), ())
        });
    }
}

async fn run_compiled<A, C>(
    compiled: &A,
    context: &C,
    variables: &Variables,
) -> ExecutorResult<ExecutionResult>
where
    A: CompiledQuery<C>,
    C: Sync,
{
    let resolvers = A::Resolvers::default();
    Ok(compiled.run(&resolvers, context, variables).await?)
}

/// Runs a validated document once without consulting any cache.
///
/// The document is compiled and run with the caller's `resolvers`; if the
/// compiler reports it as not compilable, the reference interpreter runs it
/// instead.
pub async fn execute_document<E, C>(
    engine: &E,
    request: InterpretRequest<'_, E::Schema, E::Document, C>,
    resolvers: &<E::Compiled as CompiledQuery<C>>::Resolvers,
) -> ExecutorResult<ExecutionResult>
where
    E: QueryEngine<C>,
    C: Sync,
{
    match engine.compile(request.schema, request.document, request.operation_name)? {
        Ok(compiled) => Ok(compiled
            .run(resolvers, request.context, request.variables)
            .await?),
        Err(not_compilable) => {
            debug!(reason = %not_compilable.reason, "document is not compilable, interpreting");
            Ok(engine.interpret(request).await?)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "query engine panicked".to_string()
    }
}
