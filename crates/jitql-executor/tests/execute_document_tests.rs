//! Tests for one-shot compile-or-interpret execution without a cache.

mod common;

use common::{vars, FixedResolvers, MockEngine, PostsSchema, TestContext};
use jitql_executor::{execute_document, ExecutorError, InterpretRequest, QueryEngine};
use serde_json::json;

#[tokio::test]
async fn test_compiles_and_uses_caller_resolvers() {
    let engine = MockEngine::new();
    let schema = PostsSchema::new();
    let document = engine.parse("{ getPost whoami }").unwrap();
    let variables = vars(json!({ "id": "2" }));
    let context = TestContext::new("dave");

    let mut resolvers = FixedResolvers::default();
    resolvers
        .values
        .insert("whoami".to_string(), json!("override"));

    let result = execute_document(
        &engine,
        InterpretRequest {
            schema: &schema,
            document: &document,
            variables: &variables,
            context: &context,
            operation_name: None,
        },
        &resolvers,
    )
    .await
    .unwrap();

    assert_eq!(
        result.data,
        Some(json!({
            "getPost": { "id": "2", "content": "Post #2!" },
            "whoami": "override"
        }))
    );
    assert_eq!(engine.calls.compiled_runs(), 1);
    assert_eq!(engine.calls.interpret(), 0);
}

#[tokio::test]
async fn test_falls_back_to_interpreter() {
    let engine = MockEngine::new();
    let schema = PostsSchema::new();
    let document = engine.parse("{ uncompilable operation }").unwrap();
    let variables = vars(json!({}));
    let context = TestContext::new("erin");

    let result = execute_document(
        &engine,
        InterpretRequest {
            schema: &schema,
            document: &document,
            variables: &variables,
            context: &context,
            operation_name: Some("op"),
        },
        &FixedResolvers::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        result.data,
        Some(json!({ "uncompilable": null, "operation": "op" }))
    );
    assert_eq!(engine.calls.compile(), 1);
    assert_eq!(engine.calls.interpret(), 1);
}

#[tokio::test]
async fn test_compiler_fault_is_an_error() {
    let engine = MockEngine::new();
    let schema = PostsSchema::new();
    let document = engine.parse("{ compilerBug }").unwrap();
    let variables = vars(json!({}));
    let context = TestContext::new("frank");

    let err = execute_document(
        &engine,
        InterpretRequest {
            schema: &schema,
            document: &document,
            variables: &variables,
            context: &context,
            operation_name: None,
        },
        &FixedResolvers::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ExecutorError::Query(ref e) if e.message == "compiler crashed"));
}
