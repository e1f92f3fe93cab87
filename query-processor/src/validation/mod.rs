//! Schema-aware validation of client documents.
//!
//! Validation runs a set of [`ValidationRule`]s over the document in a single
//! traversal. The rules applying to an operation come from a [`ValidationRules`]
//! provider; documents loaded from persisted queries are trusted and skip
//! validation entirely.

mod rules;
mod traverse;

use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::validation::Valid;

pub use self::rules::NoIntrospection;
pub use self::rules::OperationLimitsRule;
pub use self::rules::SpecifiedRules;
use crate::OperationParams;
use crate::configuration::Configuration;
use crate::configuration::Limits;
use crate::error::ValidationErrors;
use crate::graphql;
use crate::graphql::Location;

/// A validation rule.
///
/// Every hook is called in document order while the document is traversed once.
/// Each fragment definition is visited once where it is defined, not where it is
/// spread. Fields unknown to the schema are not visited.
pub trait ValidationRule: Send {
    /// Called once before any operation is visited.
    fn enter_document(&mut self, _context: &mut ValidationContext<'_>) {}

    fn enter_operation(
        &mut self,
        _context: &mut ValidationContext<'_>,
        _operation: &Node<ast::OperationDefinition>,
    ) {
    }

    fn leave_operation(
        &mut self,
        _context: &mut ValidationContext<'_>,
        _operation: &Node<ast::OperationDefinition>,
    ) {
    }

    fn enter_field(
        &mut self,
        _context: &mut ValidationContext<'_>,
        _parent_type: &str,
        _field_def: &ast::FieldDefinition,
        _field: &Node<ast::Field>,
    ) {
    }

    fn leave_field(
        &mut self,
        _context: &mut ValidationContext<'_>,
        _parent_type: &str,
        _field_def: &ast::FieldDefinition,
        _field: &Node<ast::Field>,
    ) {
    }

    fn fragment_definition(
        &mut self,
        _context: &mut ValidationContext<'_>,
        _fragment: &Node<ast::FragmentDefinition>,
    ) {
    }

    fn fragment_spread(
        &mut self,
        _context: &mut ValidationContext<'_>,
        _spread: &Node<ast::FragmentSpread>,
    ) {
    }

    fn inline_fragment(
        &mut self,
        _context: &mut ValidationContext<'_>,
        _type_condition: &str,
        _fragment: &Node<ast::InlineFragment>,
    ) {
    }
}

/// What rules can see of the document under validation, and where they report.
pub struct ValidationContext<'a> {
    schema: &'a Valid<Schema>,
    document: &'a ast::Document,
    operation_name: Option<&'a str>,
    errors: Vec<graphql::Error>,
}

impl<'a> ValidationContext<'a> {
    pub(crate) fn new(
        schema: &'a Valid<Schema>,
        document: &'a ast::Document,
        operation_name: Option<&'a str>,
    ) -> Self {
        Self {
            schema,
            document,
            operation_name,
            errors: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'a Valid<Schema> {
        self.schema
    }

    pub fn document(&self) -> &'a ast::Document {
        self.document
    }

    /// The operation name sent with the request.
    pub fn operation_name(&self) -> Option<&'a str> {
        self.operation_name
    }

    /// Whether `operation` is the one that will be executed.
    pub fn is_selected(&self, operation: &ast::OperationDefinition) -> bool {
        match self.operation_name {
            Some(name) => operation.name.as_ref().is_some_and(|n| n.as_str() == name),
            None => true,
        }
    }

    /// The start of `node` in the document, if it came from source text.
    pub fn location<T>(&self, node: &Node<T>) -> Option<Location> {
        node.line_column_range(&self.document.sources)
            .map(|range| Location {
                line: range.start.line as u32,
                column: range.start.column as u32,
            })
    }

    pub fn report_error(&mut self, error: graphql::Error) {
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[graphql::Error] {
        &self.errors
    }

    fn into_errors(self) -> Vec<graphql::Error> {
        self.errors
    }
}

/// Supplies the validation rules for an operation.
///
/// Returning no rules skips validation.
pub trait ValidationRules: Send + Sync {
    fn rules(
        &self,
        params: &OperationParams,
        document: &ast::Document,
        operation_name: Option<&str>,
    ) -> Vec<Box<dyn ValidationRule>>;
}

impl<F> ValidationRules for F
where
    F: Fn(&OperationParams, &ast::Document, Option<&str>) -> Vec<Box<dyn ValidationRule>>
        + Send
        + Sync,
{
    fn rules(
        &self,
        params: &OperationParams,
        document: &ast::Document,
        operation_name: Option<&str>,
    ) -> Vec<Box<dyn ValidationRule>> {
        self(params, document, operation_name)
    }
}

/// The GraphQL specification rules, plus the configured limits and introspection switch.
#[derive(Clone, Debug, Default)]
pub struct DefaultValidationRules {
    limits: Limits,
    introspection: bool,
}

impl DefaultValidationRules {
    pub fn new(configuration: &Configuration) -> Self {
        Self {
            limits: configuration.limits.clone(),
            introspection: configuration.introspection,
        }
    }
}

impl ValidationRules for DefaultValidationRules {
    fn rules(
        &self,
        _params: &OperationParams,
        _document: &ast::Document,
        _operation_name: Option<&str>,
    ) -> Vec<Box<dyn ValidationRule>> {
        let mut rules: Vec<Box<dyn ValidationRule>> = vec![Box::new(SpecifiedRules)];
        if let Some(limits) = OperationLimitsRule::new(&self.limits) {
            rules.push(Box::new(limits));
        }
        if !self.introspection {
            rules.push(Box::new(NoIntrospection));
        }
        rules
    }
}

/// Run the rules supplied by `provider` over `document`.
pub(crate) fn validate(
    schema: &Valid<Schema>,
    document: &ast::Document,
    params: &OperationParams,
    operation_name: Option<&str>,
    provider: &dyn ValidationRules,
) -> Result<(), ValidationErrors> {
    if params.query_id.is_some() {
        tracing::trace!("skipping validation of persisted query");
        return Ok(());
    }
    let mut rules = provider.rules(params, document, operation_name);
    if rules.is_empty() {
        return Ok(());
    }

    let mut context = ValidationContext::new(schema, document, operation_name);
    traverse::document(&mut rules, &mut context);
    let errors = context.into_errors();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

#[cfg(test)]
mod tests;
