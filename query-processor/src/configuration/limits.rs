use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Configuration for operation limits.
///
/// Every limit is disabled unless set.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Limits {
    /// If set, requests with operations deeper than this maximum
    /// are rejected with a GraphQL error with
    /// `"extensions": {"code": "MAX_DEPTH_LIMIT"}`
    ///
    /// Counts depth of an operation, looking at its selection sets,
    /// including fields in fragments and inline fragments. The following
    /// example has a depth of 3.
    ///
    /// ```graphql
    /// query getProduct {
    ///   book { # 1
    ///     ...bookDetails
    ///   }
    /// }
    ///
    /// fragment bookDetails on Book {
    ///   details { # 2
    ///     ... on ProductDetailsBook {
    ///       country # 3
    ///     }
    ///   }
    /// }
    /// ```
    pub max_depth: Option<u32>,

    /// If set, requests with operations higher than this maximum
    /// are rejected with a GraphQL error with
    /// `"extensions": {"code": "MAX_HEIGHT_LIMIT"}`
    ///
    /// Height is based on simple merging of fields using the same name or alias,
    /// but only within the same selection set.
    pub max_height: Option<u32>,

    /// If set to a number, requests with more root fields than this maximum
    /// are rejected with a GraphQL error with
    /// `"extensions": {"code": "MAX_ROOT_FIELDS_LIMIT"}`
    pub max_root_fields: Option<u32>,

    /// If set, requests with operations with more aliases than this maximum
    /// are rejected with a GraphQL error with
    /// `"extensions": {"code": "MAX_ALIASES_LIMIT"}`
    pub max_aliases: Option<u32>,

    /// If set to true, requests that exceed a `max_*` limit are *not* rejected.
    /// Instead they are executed normally, and a warning is logged.
    pub warn_only: bool,
}
