use apollo_compiler::Node;
use apollo_compiler::ast;

use super::ValidationContext;
use super::ValidationRule;

/// Traverse a document once, calling every rule at each step.
///
/// Operations and fragment definitions are each visited once, in document order.
/// Spreads are not expanded.
pub(super) fn document<'a>(
    rules: &mut [Box<dyn ValidationRule>],
    context: &mut ValidationContext<'a>,
) {
    let document = context.document();
    let mut visitor = ParallelVisitor { rules };

    for rule in visitor.rules.iter_mut() {
        rule.enter_document(context);
    }
    for definition in &document.definitions {
        match definition {
            ast::Definition::OperationDefinition(operation) => {
                visitor.operation(context, operation)
            }
            ast::Definition::FragmentDefinition(fragment) => {
                visitor.fragment_definition(context, fragment)
            }
            _ => {}
        }
    }
}

struct ParallelVisitor<'r> {
    rules: &'r mut [Box<dyn ValidationRule>],
}

impl ParallelVisitor<'_> {
    fn operation(
        &mut self,
        context: &mut ValidationContext<'_>,
        operation: &Node<ast::OperationDefinition>,
    ) {
        for rule in self.rules.iter_mut() {
            rule.enter_operation(context, operation);
        }
        // A missing root type is reported by the specified rules.
        if let Some(root_type) = context.schema().root_operation(operation.operation_type) {
            self.selection_set(context, root_type, &operation.selection_set);
        }
        for rule in self.rules.iter_mut() {
            rule.leave_operation(context, operation);
        }
    }

    fn fragment_definition(
        &mut self,
        context: &mut ValidationContext<'_>,
        fragment: &Node<ast::FragmentDefinition>,
    ) {
        for rule in self.rules.iter_mut() {
            rule.fragment_definition(context, fragment);
        }
        self.selection_set(context, &fragment.type_condition, &fragment.selection_set);
    }

    fn selection_set(
        &mut self,
        context: &mut ValidationContext<'_>,
        parent_type: &str,
        set: &[ast::Selection],
    ) {
        for selection in set {
            match selection {
                ast::Selection::Field(field) => {
                    let Ok(field_def) = context.schema().type_field(parent_type, &field.name)
                    else {
                        continue;
                    };
                    for rule in self.rules.iter_mut() {
                        rule.enter_field(context, parent_type, field_def, field);
                    }
                    self.selection_set(
                        context,
                        field_def.ty.inner_named_type(),
                        &field.selection_set,
                    );
                    for rule in self.rules.iter_mut() {
                        rule.leave_field(context, parent_type, field_def, field);
                    }
                }
                ast::Selection::FragmentSpread(spread) => {
                    for rule in self.rules.iter_mut() {
                        rule.fragment_spread(context, spread);
                    }
                }
                ast::Selection::InlineFragment(fragment) => {
                    let type_condition = fragment.type_condition.as_deref().unwrap_or(parent_type);
                    for rule in self.rules.iter_mut() {
                        rule.inline_fragment(context, type_condition, fragment);
                    }
                    self.selection_set(context, type_condition, &fragment.selection_set);
                }
            }
        }
    }
}
