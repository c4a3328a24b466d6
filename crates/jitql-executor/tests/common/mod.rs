//! Mock query engine shared by the integration tests.
//!
//! The toy language is a single selection set of field names, e.g.
//! `{ getPost whoami }`. The engine counts every collaborator call so tests
//! can tell which path the executor took.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use jitql_executor::{
    CacheConfig, CompiledQuery, ExecutionRequest, ExecutionResult, ExecutorConfig,
    InterpretRequest, NotCompilable, QueryCache, QueryEngine, QueryError, QueryExecutor,
    Variables,
};
use serde_json::{json, Map, Value};

/// Request context handed to resolvers.
#[derive(Debug, Clone)]
pub struct TestContext {
    pub user: String,
}

impl TestContext {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
        }
    }
}

/// Schema: the set of fields on the root type.
pub struct PostsSchema {
    pub fields: HashSet<&'static str>,
    pub posts: Vec<(&'static str, &'static str)>,
}

impl PostsSchema {
    pub fn new() -> Self {
        Self {
            fields: [
                "getPost",
                "posts",
                "whoami",
                "operation",
                "goBoom",
                "explode",
                "uncompilable",
                "compilerBug",
            ]
            .into_iter()
            .collect(),
            posts: vec![("1", "Hello World!"), ("2", "Post #2!")],
        }
    }
}

/// A parsed document: the selected field names in order.
#[derive(Debug, Clone)]
pub struct Selection {
    pub fields: Vec<String>,
}

/// Call counters, shared between an engine and the test body.
#[derive(Debug, Default)]
pub struct Calls {
    pub parse: AtomicUsize,
    pub validate: AtomicUsize,
    pub compile: AtomicUsize,
    pub interpret: AtomicUsize,
    pub compiled_runs: AtomicUsize,
}

impl Calls {
    pub fn parse(&self) -> usize {
        self.parse.load(Ordering::SeqCst)
    }
    pub fn validate(&self) -> usize {
        self.validate.load(Ordering::SeqCst)
    }
    pub fn compile(&self) -> usize {
        self.compile.load(Ordering::SeqCst)
    }
    pub fn interpret(&self) -> usize {
        self.interpret.load(Ordering::SeqCst)
    }
    pub fn compiled_runs(&self) -> usize {
        self.compiled_runs.load(Ordering::SeqCst)
    }
}

/// Resolver overrides: field name to a fixed value.
#[derive(Debug, Default)]
pub struct FixedResolvers {
    pub values: HashMap<String, Value>,
}

pub struct CompiledSelection {
    fields: Vec<String>,
    posts: Vec<(&'static str, &'static str)>,
    calls: Arc<Calls>,
}

#[async_trait]
impl CompiledQuery<TestContext> for CompiledSelection {
    type Resolvers = FixedResolvers;

    async fn run(
        &self,
        resolvers: &FixedResolvers,
        context: &TestContext,
        variables: &Variables,
    ) -> Result<ExecutionResult, QueryError> {
        self.calls.compiled_runs.fetch_add(1, Ordering::SeqCst);
        Ok(resolve(
            &self.fields,
            &self.posts,
            context,
            variables,
            None,
            &resolvers.values,
        ))
    }
}

/// Runs inside an engine call, outside any cache lock.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct MockEngine {
    pub calls: Arc<Calls>,
    on_validate: Option<Hook>,
    on_compile: Option<Hook>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            on_validate: None,
            on_compile: None,
        }
    }

    /// Runs `hook` after parsing succeeds and before validation, standing in
    /// for a concurrent request that finishes during that window.
    pub fn with_validate_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_validate = Some(Arc::new(hook));
        self
    }

    /// Runs `hook` before each compilation.
    pub fn with_compile_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_compile = Some(Arc::new(hook));
        self
    }
}

#[async_trait]
impl QueryEngine<TestContext> for MockEngine {
    type Schema = PostsSchema;
    type Document = Selection;
    type Compiled = CompiledSelection;

    fn parse(&self, source: &str) -> Result<Selection, QueryError> {
        self.calls.parse.fetch_add(1, Ordering::SeqCst);
        let body = source
            .trim()
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| QueryError::new("Syntax Error: Expected \"{\".").at(1, 1))?;
        let fields: Vec<String> = body.split_whitespace().map(str::to_string).collect();
        if fields.is_empty() {
            return Err(QueryError::new("Syntax Error: Expected Name, found \"}\".").at(1, 3));
        }
        Ok(Selection { fields })
    }

    fn validate(&self, schema: &PostsSchema, document: &Selection) -> Vec<QueryError> {
        self.calls.validate.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.on_validate {
            hook();
        }
        document
            .fields
            .iter()
            .filter(|field| !schema.fields.contains(field.as_str()))
            .map(|field| {
                QueryError::new(format!(
                    "Cannot query field \"{field}\" on type \"Query\"."
                ))
            })
            .collect()
    }

    fn compile(
        &self,
        schema: &PostsSchema,
        document: &Selection,
        _operation_name: Option<&str>,
    ) -> Result<Result<CompiledSelection, NotCompilable>, QueryError> {
        self.calls.compile.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.on_compile {
            hook();
        }
        if document.fields.iter().any(|field| field == "compilerBug") {
            return Err(QueryError::new("compiler crashed"));
        }
        if document.fields.iter().any(|field| field == "uncompilable") {
            return Ok(Err(NotCompilable::new("field uses an unsupported directive")));
        }
        Ok(Ok(CompiledSelection {
            fields: document.fields.clone(),
            posts: schema.posts.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }

    async fn interpret(
        &self,
        request: InterpretRequest<'_, PostsSchema, Selection, TestContext>,
    ) -> Result<ExecutionResult, QueryError> {
        self.calls.interpret.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(resolve(
            &request.document.fields,
            &request.schema.posts,
            request.context,
            request.variables,
            request.operation_name,
            &HashMap::new(),
        ))
    }
}

/// Shared resolver logic for both engines, so results are identical.
fn resolve(
    fields: &[String],
    posts: &[(&'static str, &'static str)],
    context: &TestContext,
    variables: &Variables,
    operation_name: Option<&str>,
    overrides: &HashMap<String, Value>,
) -> ExecutionResult {
    let mut data = Map::new();
    let mut errors = Vec::new();
    for field in fields {
        if let Some(value) = overrides.get(field) {
            data.insert(field.clone(), value.clone());
            continue;
        }
        let value = match field.as_str() {
            "getPost" => {
                let id = variables.get("id").and_then(Value::as_str).unwrap_or("1");
                posts
                    .iter()
                    .find(|(post_id, _)| *post_id == id)
                    .map(|(post_id, content)| json!({ "id": post_id, "content": content }))
                    .unwrap_or(Value::Null)
            }
            "posts" => Value::Array(
                posts
                    .iter()
                    .map(|(id, content)| json!({ "id": id, "content": content }))
                    .collect(),
            ),
            "whoami" => json!(context.user),
            "operation" => json!(operation_name),
            "goBoom" => {
                errors.push(QueryError::new("BOOM!").at(1, 3).with_path([field.as_str()]));
                continue;
            }
            "explode" => panic!("resolver exploded"),
            _ => Value::Null,
        };
        data.insert(field.clone(), value);
    }
    if errors.is_empty() {
        ExecutionResult::data(Value::Object(data))
    } else {
        // a failing non-null root field nulls the whole response
        ExecutionResult::partial(None, errors)
    }
}

pub type TestExecutor = QueryExecutor<MockEngine, TestContext>;

/// Builds an executor with a fresh cache of 100 entries.
pub fn executor(config: ExecutorConfig) -> (TestExecutor, Arc<Calls>) {
    let cache = Arc::new(QueryCache::new(CacheConfig::with_max_size(100)).expect("valid config"));
    executor_with_cache(config, cache)
}

pub fn executor_with_cache(
    config: ExecutorConfig,
    cache: Arc<QueryCache<CompiledSelection>>,
) -> (TestExecutor, Arc<Calls>) {
    executor_with_engine(MockEngine::new(), config, cache)
}

pub fn executor_with_engine(
    engine: MockEngine,
    config: ExecutorConfig,
    cache: Arc<QueryCache<CompiledSelection>>,
) -> (TestExecutor, Arc<Calls>) {
    init_tracing();
    let calls = Arc::clone(&engine.calls);
    let executor = QueryExecutor::new(engine, Arc::new(PostsSchema::new()), cache, config);
    (executor, calls)
}

/// Compiles `query` on a throwaway executor and returns the artifact with the
/// counters of the engine that built it.
pub async fn compiled_artifact(query: &str) -> (Arc<CompiledSelection>, Arc<Calls>) {
    let (executor, calls) = executor(ExecutorConfig::default());
    executor
        .execute(ExecutionRequest::new(query, TestContext::new("builder")))
        .await;
    let compiled = executor
        .cache()
        .get(query)
        .compiled
        .expect("query should compile on first sight");
    (compiled, calls)
}

/// Routes executor logs to the test harness; `RUST_LOG=jitql_executor=debug`
/// shows dispatch decisions.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn threshold(jit_threshold: u64) -> ExecutorConfig {
    ExecutorConfig::builder()
        .with_jit_threshold(jit_threshold)
        .build()
}

pub fn vars(value: Value) -> Variables {
    match value {
        Value::Object(map) => map,
        _ => Variables::new(),
    }
}
