//! Processing errors.
use apollo_compiler::validation::DiagnosticList;
use displaydoc::Display;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;
pub use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::IntoGraphQLErrors;
use crate::graphql::Location as ErrorLocation;

/// Errors caused by the shape of the request itself, before any document is looked at.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum RequestError {
    /// GraphQL Request must include at least one of those two parameters: "query" or "queryId"
    MissingQuery,

    /// GraphQL Request parameters "query" and "queryId" are mutually exclusive
    ConflictingQuery,

    /// Batched queries are not supported by this server.
    BatchingDisabled,

    /// Persisted queries are not supported by this server.
    PersistedQueriesNotSupported,

    /// Failed to load query map for id '{id}'.
    PersistedQueryNotFound {
        /// The requested persisted query id.
        id: String,
    },

    /// Read-only requests only support query operations.
    ReadOnlyOperation,
}

impl ErrorExtension for RequestError {
    fn extension_code(&self) -> String {
        match self {
            RequestError::MissingQuery => "MISSING_QUERY_STRING",
            RequestError::ConflictingQuery => "CONFLICTING_QUERY_PARAMETERS",
            RequestError::BatchingDisabled => "BATCHING_NOT_ENABLED",
            RequestError::PersistedQueriesNotSupported => "PERSISTED_QUERY_NOT_SUPPORTED",
            RequestError::PersistedQueryNotFound { .. } => "PERSISTED_QUERY_NOT_FOUND",
            RequestError::ReadOnlyOperation => "MUTATION_FORBIDDEN",
        }
        .to_string()
    }
}

impl RequestError {
    pub(crate) fn to_graphql_error(&self) -> Error {
        Error::builder()
            .message(self.to_string())
            .extension_code(self.extension_code())
            .build()
    }
}

/// Errors selecting the operation to run from a parsed document.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum OperationError {
    /// Must provide an operation.
    NoOperation,

    /// Must provide operation name if query contains multiple operations.
    AmbiguousOperation,

    /// Unknown operation named "{name}".
    UnknownOperation {
        /// The operation name sent by the client.
        name: String,
    },
}

impl ErrorExtension for OperationError {
    fn extension_code(&self) -> String {
        match self {
            OperationError::NoOperation | OperationError::AmbiguousOperation => {
                "GRAPHQL_VALIDATION_FAILED"
            }
            OperationError::UnknownOperation { .. } => "GRAPHQL_UNKNOWN_OPERATION_NAME",
        }
        .to_string()
    }
}

/// Collection of document parse errors.
#[derive(Debug)]
pub struct ParseErrors {
    pub(crate) errors: DiagnosticList,
}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut errors = self.errors.iter();
        for (i, error) in errors.by_ref().take(5).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
        }
        let remaining = errors.count();
        if remaining > 0 {
            write!(f, "\n...and {remaining} other errors")?;
        }
        Ok(())
    }
}

impl IntoGraphQLErrors for ParseErrors {
    fn into_graphql_errors(self) -> Result<Vec<Error>, Self> {
        Ok(self
            .errors
            .iter()
            .map(|diagnostic| {
                Error::builder()
                    .message(diagnostic.error.to_string())
                    .locations(
                        diagnostic
                            .line_column_range()
                            .map(|range| {
                                vec![ErrorLocation {
                                    line: range.start.line as u32,
                                    column: range.start.column as u32,
                                }]
                            })
                            .unwrap_or_default(),
                    )
                    .extension_code("GRAPHQL_PARSING_FAILED")
                    .build()
            })
            .collect())
    }
}

/// Collection of errors reported by validation rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub(crate) errors: Vec<Error>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl IntoGraphQLErrors for ValidationErrors {
    fn into_graphql_errors(self) -> Result<Vec<Error>, Self> {
        Ok(self
            .errors
            .into_iter()
            .map(|error| error.with_extension_code("GRAPHQL_VALIDATION_FAILED"))
            .collect())
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            if let Some(location) = error.locations.first() {
                write!(
                    f,
                    "[{}:{}] {}",
                    location.line, location.column, error.message
                )?;
            } else {
                write!(f, "{}", error.message)?;
            }
        }
        Ok(())
    }
}

/// Failure of a single operation at any stage before execution.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ProcessError {
    /// {0}
    Request(#[from] RequestError),

    /// {0}
    Operation(#[from] OperationError),

    /// parsing failed: {0}
    Parse(ParseErrors),

    /// invalid query: {0}
    Validation(ValidationErrors),
}

impl From<ParseErrors> for ProcessError {
    fn from(errors: ParseErrors) -> Self {
        ProcessError::Parse(errors)
    }
}

impl From<ValidationErrors> for ProcessError {
    fn from(errors: ValidationErrors) -> Self {
        ProcessError::Validation(errors)
    }
}

impl IntoGraphQLErrors for ProcessError {
    fn into_graphql_errors(self) -> Result<Vec<Error>, Self> {
        match self {
            ProcessError::Request(err) => Ok(vec![err.to_graphql_error()]),
            ProcessError::Operation(err) => Ok(vec![
                Error::builder()
                    .message(err.to_string())
                    .extension_code(err.extension_code())
                    .build(),
            ]),
            ProcessError::Parse(errs) => errs.into_graphql_errors().map_err(ProcessError::Parse),
            ProcessError::Validation(errs) => errs
                .into_graphql_errors()
                .map_err(ProcessError::Validation),
        }
    }
}
