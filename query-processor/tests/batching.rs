mod common;

use pretty_assertions::assert_eq;
use query_processor::Configuration;
use query_processor::ExecutionResult;
use query_processor::GraphQLRequest;
use query_processor::GraphQLResponse;
use query_processor::OperationParams;
use query_processor::QueryProcessor;
use query_processor::RequestScope;
use query_processor::graphql;
use serde_json_bytes::json;
use test_log::test;

use crate::common::FakeExecutor;
use crate::common::batch_results;
use crate::common::error_codes;
use crate::common::query;
use crate::common::schema;

/// Resolves to the operation name, failing for `Broken`.
fn named_executor() -> FakeExecutor {
    FakeExecutor::new(|request, context| {
        let name = request.operation_name.unwrap_or_default();
        context.add_cache_tags([format!("operation:{name}")]);
        if name == "Broken" {
            return ExecutionResult::builder()
                .error(graphql::Error::builder().message("resolver failed").build())
                .build();
        }
        ExecutionResult::builder().data(json!({"name": name})).build()
    })
}

fn named(name: &str) -> OperationParams {
    OperationParams::builder()
        .query(format!("query {name} {{ me {{ id }} }}"))
        .operation_name(name)
        .build()
}

#[test(tokio::test)]
async fn results_keep_request_order() {
    let executor = named_executor();
    let processor = common::processor(&executor);
    let batch = vec![
        named("First"),
        OperationParams::builder().build(),
        named("Broken"),
        query("{ me { nope } }"),
        named("Last"),
    ];

    let results = batch_results(
        processor
            .process(GraphQLRequest::Batch(batch), RequestScope::default())
            .await,
    );
    assert_eq!(results.len(), 5);
    assert_eq!(results[0].data, Some(json!({"name": "First"})));
    assert_eq!(error_codes(&results[1]), ["MISSING_QUERY_STRING"]);
    assert_eq!(results[2].errors[0].message, "resolver failed");
    assert_eq!(error_codes(&results[3]), ["GRAPHQL_VALIDATION_FAILED"]);
    assert_eq!(results[4].data, Some(json!({"name": "Last"})));
    assert_eq!(executor.calls(), 3);
}

#[test(tokio::test)]
async fn operations_have_their_own_context() {
    let executor = named_executor();
    let processor = common::processor(&executor);

    let results = batch_results(
        processor
            .process(
                GraphQLRequest::Batch(vec![named("A"), named("B")]),
                RequestScope::default(),
            )
            .await,
    );
    let tags: Vec<Vec<&String>> = results
        .iter()
        .map(|result| result.metadata.tags.iter().collect())
        .collect();
    assert_eq!(
        tags,
        [
            ["graphql_response", "operation:A"],
            ["graphql_response", "operation:B"]
        ]
    );
    assert!(results.iter().all(|result| result.metadata.is_cacheable()));
}

#[test(tokio::test)]
async fn batch_entries_share_the_cache() {
    let executor = named_executor();
    let processor = common::processor(&executor);

    processor
        .process(GraphQLRequest::Batch(vec![named("A")]), RequestScope::default())
        .await;
    let results = batch_results(
        processor
            .process(
                GraphQLRequest::Batch(vec![named("A"), named("B")]),
                RequestScope::default(),
            )
            .await,
    );
    assert_eq!(results[0].data, Some(json!({"name": "A"})));
    assert_eq!(executor.calls(), 2);
}

#[test(tokio::test)]
async fn disabled_batching_rejects_the_whole_batch() {
    let executor = named_executor();
    let processor = QueryProcessor::builder(schema(), executor.clone())
        .configuration(
            Configuration::from_yaml("batching:\n  enabled: false\n")
                .expect("valid configuration"),
        )
        .build();

    let response = processor
        .process(
            GraphQLRequest::Batch(vec![named("A"), named("B")]),
            RequestScope::default(),
        )
        .await;
    let GraphQLResponse::Single(result) = response else {
        panic!("expected a single result");
    };
    assert_eq!(error_codes(&result), ["BATCHING_NOT_ENABLED"]);
    assert_eq!(
        result.errors[0].message,
        "Batched queries are not supported by this server."
    );
    assert_eq!(executor.calls(), 0);

    // Single operations are unaffected
    let result = processor
        .process(named("A").into(), RequestScope::default())
        .await
        .into_single()
        .expect("a single result");
    assert!(result.errors.is_empty());

    let response = processor
        .process(GraphQLRequest::Batch(vec![]), RequestScope::default())
        .await;
    assert_eq!(response, GraphQLResponse::Batch(vec![]));
}

#[test(tokio::test)]
async fn batches_from_json() {
    let executor = named_executor();
    let processor = common::processor(&executor);
    let request: GraphQLRequest = serde_json::from_str(
        r#"[
            {"query": "query A { me { id } }", "operationName": "A"},
            {"query": "query B { me { id } }", "operationName": "B", "variables": null}
        ]"#,
    )
    .expect("valid batch");

    let response = processor.process(request, RequestScope::default()).await;
    insta::assert_json_snapshot!(response, @r###"
    [
      {
        "data": {
          "name": "A"
        }
      },
      {
        "data": {
          "name": "B"
        }
      }
    ]
    "###);
}
