//! The seam to the schema-bound executor that resolves operations.

use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::validation::Valid;
use async_trait::async_trait;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::context::ResolveContext;
use crate::graphql::Error;
use crate::json_ext::Object;
use crate::request::OperationParams;

/// Everything an executor needs to run one operation.
#[derive(Debug)]
#[non_exhaustive]
pub struct ExecutionRequest<'a> {
    pub schema: &'a Valid<Schema>,
    pub document: &'a ast::Document,
    pub root_value: Value,
    pub variables: &'a Object,
    pub operation_name: Option<&'a str>,
}

/// What an executor produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ExecutionResult {
    pub data: Option<Value>,
    pub errors: Vec<Error>,
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl ExecutionResult {
    #[builder(visibility = "pub")]
    fn new(
        data: Option<Value>,
        errors: Vec<Error>,
        // Skip the `Object` type alias in order to use buildstructor’s map special-casing
        extensions: JsonMap<ByteString, Value>,
    ) -> Self {
        Self {
            data,
            errors,
            extensions,
        }
    }
}

/// Resolves an operation against the schema.
///
/// Resolvers report cacheability through the [`ResolveContext`]: cache contexts,
/// tags and max-age recorded there end up on the result.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
        context: &mut ResolveContext,
    ) -> ExecutionResult;
}

/// Computes the root value handed to the executor.
pub trait RootValue: Send + Sync + 'static {
    fn root_value(
        &self,
        params: &OperationParams,
        document: &ast::Document,
        operation_name: Option<&str>,
    ) -> Value;
}

impl<F> RootValue for F
where
    F: Fn(&OperationParams, &ast::Document, Option<&str>) -> Value + Send + Sync + 'static,
{
    fn root_value(
        &self,
        params: &OperationParams,
        document: &ast::Document,
        operation_name: Option<&str>,
    ) -> Value {
        self(params, document, operation_name)
    }
}
