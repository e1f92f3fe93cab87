//! Batched operations.

use std::sync::Arc;

use futures::future::join_all;

use crate::error::RequestError;
use crate::json_ext::Object;
use crate::processor::QueryProcessor;
use crate::request::OperationParams;
use crate::response::GraphQLResponse;
use crate::response::QueryResult;
use crate::scope::RequestScope;

/// Run every operation of a batch concurrently.
///
/// Each operation gets its own resolve context; failures stay with the entry
/// that caused them. Results are in request order.
pub(crate) async fn process_batch(
    processor: &QueryProcessor,
    batch: Vec<OperationParams>,
    scope: &RequestScope,
    globals: &Arc<Object>,
) -> GraphQLResponse {
    if !batch.is_empty() && !processor.configuration().batching.enabled {
        tracing::debug!(size = batch.len(), "batching is disabled, rejecting batch");
        return GraphQLResponse::Single(QueryResult::from_errors(vec![
            RequestError::BatchingDisabled.to_graphql_error(),
        ]));
    }

    tracing::trace!(size = batch.len(), "processing batch");
    // join_all keeps the results in the order of the operations
    let results = join_all(
        batch
            .into_iter()
            .map(|params| processor.process_operation(params, scope, globals)),
    )
    .await;
    GraphQLResponse::Batch(results)
}
