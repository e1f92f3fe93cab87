use derivative::Derivative;
use serde::Deserialize;
use serde::Serialize;
use serde::de::Error;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::error::RequestError;
use crate::json_ext::Object;

/// The parameters of a single GraphQL operation as submitted by a client.
#[derive(Clone, Derivative, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[derivative(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct OperationParams {
    /// The GraphQL document source.
    ///
    /// For historical purposes, the term "query" is commonly used to refer to
    /// *any* GraphQL operation which might be, e.g., a `mutation`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub query: Option<String>,

    /// The identifier of a persisted query, mutually exclusive with `query`.
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        alias = "id",
        alias = "documentId"
    )]
    pub query_id: Option<String>,

    /// The (optional) GraphQL operation name.
    ///
    /// When specified, this name must match the name of an operation in the
    /// GraphQL document. When excluded, there must exist only a single
    /// operation in the GraphQL document.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub operation_name: Option<String>,

    /// The (optional) GraphQL variables in the form of a JSON object.
    #[serde(
        skip_serializing_if = "Object::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub variables: Object,

    /// The (optional) GraphQL `extensions` of a GraphQL request.
    #[serde(
        skip_serializing_if = "Object::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub extensions: Object,

    /// Set when the operation arrived through a transport that must not
    /// change state, such as an HTTP `GET`.
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub read_only: bool,
}

// NOTE: this deserialize helper is used to transform `null` to Default::default()
fn deserialize_null_default<'de, D, T: Default + Deserialize<'de>>(
    deserializer: D,
) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Option<T>>::deserialize(deserializer).map(|x| x.unwrap_or_default())
}

#[buildstructor::buildstructor]
impl OperationParams {
    #[builder(visibility = "pub")]
    /// This is the constructor (or builder) to use when constructing
    /// `OperationParams`.
    fn new(
        query: Option<String>,
        query_id: Option<String>,
        operation_name: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor’s map special-casing
        variables: JsonMap<ByteString, Value>,
        extensions: JsonMap<ByteString, Value>,
        read_only: Option<bool>,
    ) -> Self {
        Self {
            query,
            query_id,
            operation_name,
            variables,
            extensions,
            read_only: read_only.unwrap_or_default(),
        }
    }

    /// Convert encoded URL query string parameters (also known as "search
    /// params") into read-only [`OperationParams`].
    ///
    /// An error will be produced in the event that the query string parameters
    /// cannot be turned into valid parameters.
    pub fn from_urlencoded_query(
        url_encoded_query: &str,
    ) -> Result<OperationParams, serde_json::Error> {
        let urldecoded: serde_json::Value =
            serde_urlencoded::from_bytes(url_encoded_query.as_bytes())
                .map_err(serde_json::Error::custom)?;

        let string_param = |key: &str| match urldecoded.get(key) {
            Some(serde_json::Value::String(value)) => Some(value.clone()),
            _ => None,
        };
        let variables: Object = get_from_urldecoded(&urldecoded, "variables")?.unwrap_or_default();
        let extensions: Object =
            get_from_urldecoded(&urldecoded, "extensions")?.unwrap_or_default();

        Ok(Self::builder()
            .and_query(string_param("query"))
            .and_query_id(
                string_param("queryId")
                    .or_else(|| string_param("id"))
                    .or_else(|| string_param("documentId")),
            )
            .and_operation_name(string_param("operationName"))
            .variables(variables)
            .extensions(extensions)
            .read_only(true)
            .build())
    }

    /// Checks that exactly one of `query` and `queryId` is usable.
    ///
    /// A blank query string counts as missing.
    pub fn validate(&self) -> Result<(), RequestError> {
        let has_query = self
            .query
            .as_deref()
            .is_some_and(|query| !query.trim().is_empty());
        match (has_query, self.query_id.is_some()) {
            (false, false) => Err(RequestError::MissingQuery),
            (true, true) => Err(RequestError::ConflictingQuery),
            _ => Ok(()),
        }
    }
}

fn get_from_urldecoded<'a, T: Deserialize<'a>>(
    object: &'a serde_json::Value,
    key: &str,
) -> Result<Option<T>, serde_json::Error> {
    if let Some(serde_json::Value::String(byte_string)) = object.get(key) {
        Some(serde_json::from_str(byte_string.as_str())).transpose()
    } else {
        Ok(None)
    }
}

/// One operation or a batch of operations, mirroring the JSON body shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphQLRequest {
    // Tried first: a struct also deserializes from a sequence.
    Batch(Vec<OperationParams>),
    Single(OperationParams),
}

impl From<OperationParams> for GraphQLRequest {
    fn from(params: OperationParams) -> Self {
        GraphQLRequest::Single(params)
    }
}

impl From<Vec<OperationParams>> for GraphQLRequest {
    fn from(batch: Vec<OperationParams>) -> Self {
        GraphQLRequest::Batch(batch)
    }
}
