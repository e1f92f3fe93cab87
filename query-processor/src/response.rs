use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::context::CacheMetadata;
use crate::context::MaxAge;
use crate::graphql::Error;
use crate::json_ext::Object;

/// The result of one operation.
///
/// Serializes to the GraphQL response shape. The attached [`CacheMetadata`] is
/// not part of the response body; transports use it for their own cache headers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct QueryResult {
    /// The response data.
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "deserialize_data"
    )]
    pub data: Option<Value>,

    /// The optional graphql errors encountered.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,

    /// The optional graphql extensions.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,

    /// Cacheability of this result.
    #[serde(skip)]
    pub metadata: CacheMetadata,
}

/// An explicit `"data": null` stays `Some(Value::Null)`.
fn deserialize_data<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[buildstructor::buildstructor]
impl QueryResult {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(
        data: Option<Value>,
        errors: Vec<Error>,
        // Skip the `Object` type alias in order to use buildstructor’s map special-casing
        extensions: JsonMap<ByteString, Value>,
        metadata: Option<CacheMetadata>,
    ) -> Self {
        Self {
            data,
            errors,
            extensions,
            metadata: metadata.unwrap_or_default(),
        }
    }

    /// A result without data, never cached.
    pub fn from_errors(errors: Vec<Error>) -> Self {
        Self {
            data: None,
            errors,
            extensions: Object::new(),
            metadata: CacheMetadata {
                max_age: MaxAge::UNCACHEABLE,
                ..Default::default()
            },
        }
    }
}

/// One result or a batch of results, in request order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GraphQLResponse {
    Single(QueryResult),
    Batch(Vec<QueryResult>),
}

impl GraphQLResponse {
    /// The results, one per operation.
    pub fn into_results(self) -> Vec<QueryResult> {
        match self {
            GraphQLResponse::Single(result) => vec![result],
            GraphQLResponse::Batch(results) => results,
        }
    }

    /// The single result, or `None` for a batch.
    pub fn into_single(self) -> Option<QueryResult> {
        match self {
            GraphQLResponse::Single(result) => Some(result),
            GraphQLResponse::Batch(_) => None,
        }
    }
}
