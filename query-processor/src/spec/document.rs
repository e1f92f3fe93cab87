use std::fmt::Display;

use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::parser::Parser;
use apollo_compiler::validation::WithErrors;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration;
use crate::error::OperationError;
use crate::error::ParseErrors;

/// GraphQL operation type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

impl From<OperationKind> for ast::OperationType {
    fn from(value: OperationKind) -> Self {
        match value {
            OperationKind::Query => ast::OperationType::Query,
            OperationKind::Mutation => ast::OperationType::Mutation,
            OperationKind::Subscription => ast::OperationType::Subscription,
        }
    }
}

impl From<ast::OperationType> for OperationKind {
    fn from(value: ast::OperationType) -> Self {
        match value {
            ast::OperationType::Query => OperationKind::Query,
            ast::OperationType::Mutation => OperationKind::Mutation,
            ast::OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

/// Parse a document without looking at the schema.
pub(crate) fn parse(
    source: &str,
    configuration: &configuration::Parser,
) -> Result<ast::Document, ParseErrors> {
    Parser::new()
        .recursion_limit(configuration.recursion_limit)
        .token_limit(configuration.token_limit)
        .parse_ast(source, "query.graphql")
        .map_err(|WithErrors { errors, .. }| ParseErrors { errors })
}

/// Select the operation a request runs: the named one, or the only one.
pub(crate) fn find_operation<'a>(
    document: &'a ast::Document,
    operation_name: Option<&str>,
) -> Result<&'a Node<ast::OperationDefinition>, OperationError> {
    let mut operations = document.definitions.iter().filter_map(|definition| match definition {
        ast::Definition::OperationDefinition(operation) => Some(operation),
        _ => None,
    });
    match operation_name {
        Some(name) => operations
            .find(|operation| operation.name.as_ref().is_some_and(|n| n.as_str() == name))
            .ok_or_else(|| OperationError::UnknownOperation {
                name: name.to_string(),
            }),
        None => {
            let first = operations.next().ok_or(OperationError::NoOperation)?;
            if operations.next().is_some() {
                return Err(OperationError::AmbiguousOperation);
            }
            Ok(first)
        }
    }
}
