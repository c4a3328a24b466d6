//! Traits for the query engine collaborators.
//!
//! The executor never parses, validates, compiles or resolves anything
//! itself. It reaches those capabilities through [`QueryEngine`], which a
//! binding crate implements for a concrete engine, and runs compiled
//! artifacts through [`CompiledQuery`].
//!
//! # Example: implementing QueryEngine
//!
//! ```ignore
//! use async_trait::async_trait;
//! use jitql_executor::{
//!     CompiledQuery, ExecutionResult, InterpretRequest, NotCompilable, QueryEngine, QueryError,
//! };
//!
//! struct MyEngine;
//!
//! #[async_trait]
//! impl QueryEngine<RequestContext> for MyEngine {
//!     type Schema = my_engine::Schema;
//!     type Document = my_engine::Document;
//!     type Compiled = MyCompiledQuery;
//!
//!     fn parse(&self, source: &str) -> Result<Self::Document, QueryError> {
//!         my_engine::parse(source).map_err(to_query_error)
//!     }
//!
//!     fn validate(&self, schema: &Self::Schema, document: &Self::Document) -> Vec<QueryError> {
//!         my_engine::validate(schema, document).into_iter().map(to_query_error).collect()
//!     }
//!
//!     fn compile(
//!         &self,
//!         schema: &Self::Schema,
//!         document: &Self::Document,
//!         operation_name: Option<&str>,
//!     ) -> Result<Result<Self::Compiled, NotCompilable>, QueryError> {
//!         Ok(my_engine::compile(schema, document, operation_name).map_err(NotCompilable::new))
//!     }
//!
//!     async fn interpret(
//!         &self,
//!         request: InterpretRequest<'_, Self::Schema, Self::Document, RequestContext>,
//!     ) -> Result<ExecutionResult, QueryError> {
//!         Ok(my_engine::execute(request.schema, request.document, request.variables).await)
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::QueryError;
use crate::result::{ExecutionResult, Variables};

/// Returned by [`QueryEngine::compile`] when a valid document cannot be
/// compiled and must be interpreted instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotCompilable {
    /// Why the compiler declined.
    pub reason: String,
}

impl NotCompilable {
    /// Creates a new NotCompilable with a reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Everything the reference interpreter needs for one execution.
pub struct InterpretRequest<'a, S, D, C> {
    /// The schema queries run against.
    pub schema: &'a S,
    /// The parsed and validated document.
    pub document: &'a D,
    /// Variable values.
    pub variables: &'a Variables,
    /// The caller-supplied context value.
    pub context: &'a C,
    /// Operation to run when the document holds several.
    pub operation_name: Option<&'a str>,
}

/// A compiled, ready-to-run query.
#[async_trait]
pub trait CompiledQuery<C: Sync>: Send + Sync {
    /// Resolver overrides accepted by [`run`](Self::run). The executor always
    /// passes `Default::default()`, since a compiled artifact embeds its own
    /// resolvers.
    type Resolvers: Default + Send + Sync;

    /// Executes the compiled query.
    ///
    /// Resolver failures belong in the returned [`ExecutionResult::errors`];
    /// an `Err` means the artifact could not run at all.
    async fn run(
        &self,
        resolvers: &Self::Resolvers,
        context: &C,
        variables: &Variables,
    ) -> Result<ExecutionResult, QueryError>;
}

/// Parser, validator, compiler and interpreter for one query language,
/// generic over the request context type `C`.
///
/// # Required Methods
///
/// - [`parse`](Self::parse) - Parse source text into a document
/// - [`validate`](Self::validate) - Validate a document against the schema
/// - [`compile`](Self::compile) - Compile a validated document
/// - [`interpret`](Self::interpret) - Execute a validated document with the reference interpreter
#[async_trait]
pub trait QueryEngine<C: Sync>: Send + Sync {
    /// The schema type. Immutable once built.
    type Schema: Send + Sync;
    /// A parsed query document.
    type Document: Send + Sync;
    /// The compiled artifact produced by [`compile`](Self::compile).
    type Compiled: CompiledQuery<C>;

    /// Parses query source text, failing with a syntax error.
    fn parse(&self, source: &str) -> Result<Self::Document, QueryError>;

    /// Validates a document; an empty list means valid.
    fn validate(&self, schema: &Self::Schema, document: &Self::Document) -> Vec<QueryError>;

    /// Compiles a validated document.
    ///
    /// `Ok(Err(NotCompilable))` is the ordinary "interpret this instead"
    /// answer; the outer `Err` is reserved for compiler faults.
    fn compile(
        &self,
        schema: &Self::Schema,
        document: &Self::Document,
        operation_name: Option<&str>,
    ) -> Result<Result<Self::Compiled, NotCompilable>, QueryError>;

    /// Executes a validated document with the reference interpreter.
    async fn interpret(
        &self,
        request: InterpretRequest<'_, Self::Schema, Self::Document, C>,
    ) -> Result<ExecutionResult, QueryError>;
}
