//! The operation pipeline.

use std::sync::Arc;
use std::task::Poll;

use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::validation::Valid;
use futures::future::BoxFuture;
use serde_json_bytes::ByteString;
use serde_json_bytes::Value;
use tower::BoxError;
use tower::Service;
use tracing::Instrument;

use crate::batching;
use crate::cache::CacheStore;
use crate::cache::ContentHash;
use crate::cache::InMemoryCacheStore;
use crate::cache::tiered::TieredCache;
use crate::configuration::Configuration;
use crate::context::BYPASS_FIELD_SECURITY;
use crate::context::CacheMetadata;
use crate::context::DEVELOPMENT;
use crate::context::MaxAge;
use crate::context::ResolveContext;
use crate::error::ProcessError;
use crate::error::RequestError;
use crate::executor::ExecutionRequest;
use crate::executor::ExecutionResult;
use crate::executor::Executor;
use crate::executor::RootValue;
use crate::graphql;
use crate::graphql::IntoGraphQLErrors;
use crate::json_ext::Object;
use crate::persisted_queries::PersistedQuery;
use crate::persisted_queries::PersistedQueryLoader;
use crate::request::GraphQLRequest;
use crate::request::OperationParams;
use crate::response::GraphQLResponse;
use crate::response::QueryResult;
use crate::scope::BYPASS_FIELD_SECURITY_PERMISSION;
use crate::scope::RequestScope;
use crate::spec;
use crate::spec::OperationKind;
use crate::validation;
use crate::validation::DefaultValidationRules;
use crate::validation::ValidationRules;

/// Runs GraphQL operations against an [`Executor`], caching query results.
///
/// Cloning is cheap; clones share the cache store and collaborators.
#[derive(Clone)]
pub struct QueryProcessor {
    inner: Arc<Inner>,
}

struct Inner {
    schema: Arc<Valid<Schema>>,
    executor: Arc<dyn Executor>,
    configuration: Arc<Configuration>,
    cache: TieredCache,
    persisted_queries: Option<Arc<dyn PersistedQueryLoader>>,
    validation_rules: Arc<dyn ValidationRules>,
    root_value: Option<Arc<dyn RootValue>>,
    schema_cache_metadata: Option<CacheMetadata>,
}

/// Builds a [`QueryProcessor`]. Only the schema and executor are required.
pub struct QueryProcessorBuilder {
    schema: Arc<Valid<Schema>>,
    executor: Arc<dyn Executor>,
    configuration: Option<Arc<Configuration>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    persisted_queries: Option<Arc<dyn PersistedQueryLoader>>,
    validation_rules: Option<Arc<dyn ValidationRules>>,
    root_value: Option<Arc<dyn RootValue>>,
    schema_cache_metadata: Option<CacheMetadata>,
}

impl QueryProcessorBuilder {
    pub fn configuration(mut self, configuration: impl Into<Arc<Configuration>>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    /// Defaults to an [`InMemoryCacheStore`] sized by `cache.in_memory.limit`.
    pub fn cache_store(mut self, cache_store: impl CacheStore) -> Self {
        self.cache_store = Some(Arc::new(cache_store));
        self
    }

    /// Without a loader, operations sent by id are rejected.
    pub fn persisted_queries(mut self, loader: impl PersistedQueryLoader) -> Self {
        self.persisted_queries = Some(Arc::new(loader));
        self
    }

    /// Defaults to [`DefaultValidationRules`] for the configuration.
    pub fn validation_rules(mut self, rules: impl ValidationRules + 'static) -> Self {
        self.validation_rules = Some(Arc::new(rules));
        self
    }

    /// Defaults to `null`.
    pub fn root_value(mut self, root_value: impl RootValue) -> Self {
        self.root_value = Some(Arc::new(root_value));
        self
    }

    /// Cache metadata every result depends on, such as the schema version tag.
    pub fn schema_cache_metadata(mut self, metadata: CacheMetadata) -> Self {
        self.schema_cache_metadata = Some(metadata);
        self
    }

    pub fn build(self) -> QueryProcessor {
        let configuration = self.configuration.unwrap_or_default();
        let cache_store = self.cache_store.unwrap_or_else(|| {
            Arc::new(InMemoryCacheStore::new(configuration.cache.in_memory.limit))
        });
        let validation_rules = self
            .validation_rules
            .unwrap_or_else(|| Arc::new(DefaultValidationRules::new(&configuration)));
        QueryProcessor {
            inner: Arc::new(Inner {
                schema: self.schema,
                executor: self.executor,
                cache: TieredCache::new(cache_store),
                persisted_queries: self.persisted_queries,
                validation_rules,
                root_value: self.root_value,
                schema_cache_metadata: self.schema_cache_metadata,
                configuration,
            }),
        }
    }
}

impl QueryProcessor {
    pub fn builder(
        schema: impl Into<Arc<Valid<Schema>>>,
        executor: impl Executor,
    ) -> QueryProcessorBuilder {
        QueryProcessorBuilder {
            schema: schema.into(),
            executor: Arc::new(executor),
            configuration: None,
            cache_store: None,
            persisted_queries: None,
            validation_rules: None,
            root_value: None,
            schema_cache_metadata: None,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.inner.configuration
    }

    /// Process a single operation or a batch.
    ///
    /// Failures never escape: each one becomes a result carrying GraphQL errors.
    pub async fn process(&self, request: GraphQLRequest, scope: RequestScope) -> GraphQLResponse {
        let globals = self.globals(&scope);
        match request {
            GraphQLRequest::Single(params) => {
                GraphQLResponse::Single(self.process_operation(params, &scope, &globals).await)
            }
            GraphQLRequest::Batch(batch) => {
                batching::process_batch(self, batch, &scope, &globals).await
            }
        }
    }

    fn globals(&self, scope: &RequestScope) -> Arc<Object> {
        let mut globals = scope.globals().clone();
        globals.insert(
            ByteString::from(BYPASS_FIELD_SECURITY),
            Value::Bool(scope.has_permission(BYPASS_FIELD_SECURITY_PERMISSION)),
        );
        globals.insert(
            ByteString::from(DEVELOPMENT),
            Value::Bool(self.inner.configuration.development),
        );
        Arc::new(globals)
    }

    pub(crate) async fn process_operation(
        &self,
        params: OperationParams,
        scope: &RequestScope,
        globals: &Arc<Object>,
    ) -> QueryResult {
        let span = tracing::info_span!(
            "graphql.operation",
            "graphql.operation.name" = params.operation_name.as_deref().unwrap_or_default(),
            "graphql.operation.kind" = tracing::field::Empty,
        );
        async move {
            match self.run(params, scope, globals).await {
                Ok(result) => result,
                Err(error) => {
                    tracing::debug!(%error, "operation failed");
                    let errors = error.into_graphql_errors().unwrap_or_else(|error| {
                        vec![graphql::Error::builder().message(error.to_string()).build()]
                    });
                    QueryResult::from_errors(errors)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        params: OperationParams,
        scope: &RequestScope,
        globals: &Arc<Object>,
    ) -> Result<QueryResult, ProcessError> {
        let inner = &self.inner;
        params.validate()?;
        let document = self.resolve_document(&params).await?;
        let operation_name = params.operation_name.as_deref();

        let operation = spec::find_operation(&document, operation_name)?;
        let kind = OperationKind::from(operation.operation_type);
        tracing::Span::current().record("graphql.operation.kind", kind.as_str());
        if params.read_only && kind != OperationKind::Query {
            return Err(RequestError::ReadOnlyOperation.into());
        }

        validation::validate(
            &inner.schema,
            &document,
            &params,
            operation_name,
            inner.validation_rules.as_ref(),
        )?;

        let development = inner.configuration.development;
        let hash = (kind == OperationKind::Query && inner.configuration.cache.enabled)
            .then(|| ContentHash::new(&document, &params.variables));
        // development mode always executes
        if let Some(hash) = hash.as_ref().filter(|_| !development) {
            if let Some(result) = inner.cache.get(hash, scope.context_resolver()).await {
                return Ok(result);
            }
        }

        let mut context = ResolveContext::new(globals.clone());
        context.add_cache_tags(inner.configuration.cache.tags.iter().cloned());
        if let Some(metadata) = &inner.schema_cache_metadata {
            context.add_cacheable_dependency(metadata);
        }
        let root_value = inner
            .root_value
            .as_ref()
            .map(|root_value| root_value.root_value(&params, &document, operation_name))
            .unwrap_or_default();

        let ExecutionResult {
            data,
            errors,
            extensions,
        } = inner
            .executor
            .execute(
                ExecutionRequest {
                    schema: &inner.schema,
                    document: &document,
                    root_value,
                    variables: &params.variables,
                    operation_name,
                },
                &mut context,
            )
            .await;

        let mut metadata = context.into_cache_metadata();
        if kind != OperationKind::Query || !errors.is_empty() || development {
            metadata.max_age = MaxAge::UNCACHEABLE;
        }
        metadata.remove_language_contexts();

        let result = QueryResult::builder()
            .and_data(data)
            .errors(errors)
            .extensions(extensions)
            .metadata(metadata)
            .build();
        if let Some(hash) = &hash {
            inner
                .cache
                .insert(hash, scope.context_resolver(), &result)
                .await;
        }
        Ok(result)
    }

    async fn resolve_document(
        &self,
        params: &OperationParams,
    ) -> Result<ast::Document, ProcessError> {
        let parser = &self.inner.configuration.parser;
        let Some(id) = &params.query_id else {
            return Ok(spec::parse(params.query.as_deref().unwrap_or_default(), parser)?);
        };
        let loader = self
            .inner
            .persisted_queries
            .as_ref()
            .ok_or(RequestError::PersistedQueriesNotSupported)?;
        match loader.load(id, params).await {
            Some(PersistedQuery::Document(document)) => Ok(document),
            Some(PersistedQuery::Source(source)) => Ok(spec::parse(&source, parser)?),
            None => Err(RequestError::PersistedQueryNotFound { id: id.clone() }.into()),
        }
    }
}

impl std::fmt::Debug for QueryProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryProcessor")
            .field("configuration", &self.inner.configuration)
            .finish_non_exhaustive()
    }
}

/// A request for the [`Service`] implementation of [`QueryProcessor`].
#[derive(Debug, Clone)]
pub struct ProcessorRequest {
    pub request: GraphQLRequest,
    pub scope: RequestScope,
}

impl ProcessorRequest {
    pub fn new(request: impl Into<GraphQLRequest>, scope: RequestScope) -> Self {
        Self {
            request: request.into(),
            scope,
        }
    }
}

impl Service<ProcessorRequest> for QueryProcessor {
    type Response = GraphQLResponse;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ProcessorRequest) -> Self::Future {
        let processor = self.clone();
        Box::pin(async move { Ok(processor.process(req.request, req.scope).await) })
    }
}
