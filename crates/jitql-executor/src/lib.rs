//! # jitql-executor
//!
//! Adaptive query execution with a frequency-gated compilation cache.
//!
//! For every incoming query the executor chooses between a slow reference
//! interpreter and a compiled fast path. Compilation cost is amortized
//! across repeated identical queries: each query text is counted, and once it
//! has been seen `jit_threshold` times it is compiled and the artifact is
//! cached under a SHA-256 digest of the text.
//!
//! The parser, validator, compiler and interpreter are supplied by the
//! caller through the [`QueryEngine`] trait.
//!
//! ## Quick Start
//!
//! ```ignore
//! use jitql_executor::{CacheConfig, ExecutionRequest, ExecutorConfig, QueryCache, QueryExecutor};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(QueryCache::new(CacheConfig { max_size: 1000, ttl_ms: None })?);
//! let executor = QueryExecutor::new(MyEngine, Arc::new(schema), cache, ExecutorConfig::default());
//!
//! match executor.execute(ExecutionRequest::new("{ posts { id } }", ctx)).await {
//!     Response::Executed(result) => println!("{:?}", result.data),
//!     Response::ValidationFailed { validation_errors } => eprintln!("{validation_errors:?}"),
//!     Response::Failed { errors } => eprintln!("{errors:?}"),
//! }
//! ```
//!
//! ## Dispatch
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ QueryExecutor::execute(query, variables, context, op)        │
//! │                                                              │
//! │  cache.get(query) ── compiled? ──► run artifact              │
//! │        │ no                                                  │
//! │        ▼                                                     │
//! │  parse ── error ──► Failed { errors }                        │
//! │        ▼                                                     │
//! │  validate ── errors ──► ValidationFailed (cache untouched)   │
//! │        ▼                                                     │
//! │  count + 1 >= jit_threshold?                                 │
//! │     yes: compile ── ok ──► store artifact, run artifact      │
//! │                  └─ not compilable ──► interpret             │
//! │     no:  store count ──► interpret                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cache;
mod config;
mod error;
mod executor;
mod result;
mod statistics;
mod traits;

// Public re-exports
pub use cache::{CacheEntry, CacheKey, CacheStats, QueryCache};
pub use config::{CacheConfig, CompileFailurePolicy, ExecutorConfig, ExecutorConfigBuilder};
pub use error::{ExecutorError, ExecutorResult, PathSegment, QueryError, SourceLocation};
pub use executor::{execute_document, ExecutionRequest, QueryExecutor};
pub use result::{ExecutionResult, Response, Variables};
pub use statistics::ExecutorStatsSnapshot;
pub use traits::{CompiledQuery, InterpretRequest, NotCompilable, QueryEngine};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _: Option<CacheConfig> = None;
        let _: Option<ExecutorConfig> = None;
        let _: Option<Response> = None;
        let _: Option<ExecutionResult> = None;
        let _: Option<ExecutorResult<()>> = None;
        let _: Option<CacheEntry<String>> = None;
    }
}
