#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::validation::Valid;
use async_trait::async_trait;
use query_processor::ExecutionRequest;
use query_processor::ExecutionResult;
use query_processor::Executor;
use query_processor::GraphQLRequest;
use query_processor::GraphQLResponse;
use query_processor::OperationParams;
use query_processor::QueryProcessor;
use query_processor::QueryResult;
use query_processor::RequestScope;
use query_processor::ResolveContext;
use query_processor::cache::ContentHash;
use query_processor::json_ext::Object;
use query_processor::json_ext::Value;

pub const SCHEMA: &str = r#"
type Query {
    me: User
    user(id: ID!): User
    topProducts(first: Int, offset: Int): [Product]
}

type Mutation {
    logout: Boolean
}

type Subscription {
    productAdded: Product
}

type User {
    id: ID!
    name: String
}

type Product {
    upc: String!
    name: String
}
"#;

pub fn schema() -> Valid<Schema> {
    Schema::parse_and_validate(SCHEMA, "schema.graphql").expect("test schema is valid")
}

type Resolve =
    dyn Fn(&ExecutionRequest<'_>, &mut ResolveContext) -> ExecutionResult + Send + Sync;

/// Executor double counting its invocations.
#[derive(Clone)]
pub struct FakeExecutor {
    calls: Arc<AtomicUsize>,
    resolve: Arc<Resolve>,
}

impl FakeExecutor {
    pub fn new(
        resolve: impl Fn(&ExecutionRequest<'_>, &mut ResolveContext) -> ExecutionResult
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            calls: Default::default(),
            resolve: Arc::new(resolve),
        }
    }

    /// Always resolves to `data`.
    pub fn returning(data: Value) -> Self {
        Self::new(move |_, _| ExecutionResult::builder().data(data.clone()).build())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
        context: &mut ResolveContext,
    ) -> ExecutionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.resolve)(&request, context)
    }
}

pub fn processor(executor: &FakeExecutor) -> QueryProcessor {
    QueryProcessor::builder(schema(), executor.clone()).build()
}

pub fn query(query: &str) -> OperationParams {
    OperationParams::builder().query(query).build()
}

pub async fn process_one(
    processor: &QueryProcessor,
    params: OperationParams,
    scope: &RequestScope,
) -> QueryResult {
    processor
        .process(GraphQLRequest::Single(params), scope.clone())
        .await
        .into_single()
        .expect("a single result")
}

pub fn batch_results(response: GraphQLResponse) -> Vec<QueryResult> {
    match response {
        GraphQLResponse::Batch(results) => results,
        GraphQLResponse::Single(result) => panic!("expected a batch, got {result:?}"),
    }
}

pub fn content_hash(query: &str, variables: &Object) -> ContentHash {
    let document = ast::Document::parse(query, "query.graphql").expect("query parses");
    ContentHash::new(&document, variables)
}

pub fn error_codes(result: &QueryResult) -> Vec<String> {
    result
        .errors
        .iter()
        .filter_map(|error| error.extension_code())
        .collect()
}
