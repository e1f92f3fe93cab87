use std::collections::HashMap;
use std::collections::HashSet;

use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::validation::WithErrors;

use super::ValidationContext;
use super::ValidationRule;
use crate::configuration::Limits;
use crate::graphql;

/// The validation rules of the GraphQL specification.
///
/// Delegates to the compiler's executable document validation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpecifiedRules;

impl ValidationRule for SpecifiedRules {
    fn enter_document(&mut self, context: &mut ValidationContext<'_>) {
        if let Err(WithErrors { errors, .. }) =
            context.document().to_executable_validate(context.schema())
        {
            for diagnostic in errors.iter() {
                context.report_error(graphql::Error::from(diagnostic.unstable_to_json_compat()));
            }
        }
    }
}

/// Rejects introspection fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIntrospection;

impl ValidationRule for NoIntrospection {
    fn enter_field(
        &mut self,
        context: &mut ValidationContext<'_>,
        _parent_type: &str,
        _field_def: &ast::FieldDefinition,
        field: &Node<ast::Field>,
    ) {
        if matches!(field.name.as_str(), "__schema" | "__type") {
            let error = graphql::Error::builder()
                .message("introspection has been disabled")
                .locations(context.location(field).into_iter().collect::<Vec<_>>())
                .extension_code("INTROSPECTION_DISABLED")
                .build();
            context.report_error(error);
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct OperationLimits<T> {
    pub(crate) depth: T,
    pub(crate) height: T,
    pub(crate) root_fields: T,
    pub(crate) aliases: T,
}

impl<A> OperationLimits<A> {
    fn map<B>(self, mut f: impl FnMut(A) -> B) -> OperationLimits<B> {
        OperationLimits {
            depth: f(self.depth),
            height: f(self.height),
            root_fields: f(self.root_fields),
            aliases: f(self.aliases),
        }
    }

    fn combine<B, C>(
        self,
        other: OperationLimits<B>,
        mut f: impl FnMut(&'static str, A, B) -> C,
    ) -> OperationLimits<C> {
        OperationLimits {
            depth: f("depth", self.depth, other.depth),
            height: f("height", self.height, other.height),
            root_fields: f("root_fields", self.root_fields, other.root_fields),
            aliases: f("aliases", self.aliases, other.aliases),
        }
    }
}

impl OperationLimits<bool> {
    fn any(&self) -> bool {
        // make the compile warn if we forget one
        let Self {
            depth,
            height,
            root_fields,
            aliases,
        } = *self;
        depth || height || root_fields || aliases
    }
}

enum Computation<T> {
    InProgress,
    Done(T),
}

/// Enforces the configured depth, height, root field and alias limits on the
/// selected operation.
#[derive(Clone, Debug)]
pub struct OperationLimitsRule {
    max: OperationLimits<Option<u32>>,
    warn_only: bool,
}

impl OperationLimitsRule {
    /// Returns `None` when no limit is configured.
    pub fn new(limits: &Limits) -> Option<Self> {
        let max = OperationLimits {
            depth: limits.max_depth,
            height: limits.max_height,
            root_fields: limits.max_root_fields,
            aliases: limits.max_aliases,
        };
        if !max.map(|limit| limit.is_some()).any() {
            return None;
        }
        Some(Self {
            max,
            warn_only: limits.warn_only,
        })
    }
}

/// Measures selection sets, each fragment definition at most once.
struct Measure<'a> {
    fragments: HashMap<&'a str, &'a Node<ast::FragmentDefinition>>,
    fragment_cache: HashMap<&'a str, Computation<OperationLimits<u32>>>,
}

impl<'a> Measure<'a> {
    fn new(document: &'a ast::Document) -> Self {
        let fragments = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::FragmentDefinition(fragment) => {
                    Some((fragment.name.as_str(), fragment))
                }
                _ => None,
            })
            .collect();
        Self {
            fragments,
            fragment_cache: HashMap::new(),
        }
    }

    /// Recursively measure the given selection set against each limit
    fn count(&mut self, selection_set: &'a [ast::Selection]) -> OperationLimits<u32> {
        let mut counts: OperationLimits<u32> = OperationLimits::default();
        let mut fields_seen = HashSet::new();
        for selection in selection_set {
            match selection {
                ast::Selection::Field(field) => {
                    let nested = self.count(&field.selection_set);
                    counts.depth = counts.depth.max(1 + nested.depth);
                    counts.height = counts.height.saturating_add(nested.height);
                    counts.aliases = counts.aliases.saturating_add(nested.aliases);
                    // Multiple aliases for the same field could use different arguments
                    // Until we do full merging for limit checking purpose,
                    // approximate measured height with an upper bound rather than a lower bound.
                    let used_name = if let Some(alias) = &field.alias {
                        counts.aliases = counts.aliases.saturating_add(1);
                        alias.as_str()
                    } else {
                        field.name.as_str()
                    };
                    if fields_seen.insert(used_name) {
                        counts.height = counts.height.saturating_add(1);
                        counts.root_fields = counts.root_fields.saturating_add(1);
                    }
                }
                ast::Selection::InlineFragment(fragment) => {
                    let nested = self.count(&fragment.selection_set);
                    counts.add_fragment(nested);
                }
                ast::Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    let nested = match self.fragment_cache.get(name) {
                        Some(Computation::Done(cached)) => *cached,
                        // A cycle, reported by the specified rules.
                        Some(Computation::InProgress) => continue,
                        None => {
                            // Undefined, also reported by the specified rules.
                            let Some(fragment) = self.fragments.get(name).copied() else {
                                continue;
                            };
                            self.fragment_cache.insert(name, Computation::InProgress);
                            let nested = self.count(&fragment.selection_set);
                            self.fragment_cache.insert(name, Computation::Done(nested));
                            nested
                        }
                    };
                    counts.add_fragment(nested);
                }
            }
        }
        counts
    }
}

impl OperationLimits<u32> {
    /// Fragment fields count as fields of the enclosing selection set.
    fn add_fragment(&mut self, nested: OperationLimits<u32>) {
        self.depth = self.depth.max(nested.depth);
        self.height = self.height.saturating_add(nested.height);
        self.root_fields = self.root_fields.saturating_add(nested.root_fields);
        self.aliases = self.aliases.saturating_add(nested.aliases);
    }
}

impl ValidationRule for OperationLimitsRule {
    fn enter_operation(
        &mut self,
        context: &mut ValidationContext<'_>,
        operation: &Node<ast::OperationDefinition>,
    ) {
        if !context.is_selected(operation) {
            return;
        }
        let measured = Measure::new(context.document()).count(&operation.selection_set);
        let exceeded = self.max.combine(measured, |_, config, measured| {
            config.is_some_and(|limit| measured > limit)
        });
        if !exceeded.any() {
            return;
        }

        let mut messages = Vec::new();
        self.max.combine(measured, |ident, max, measured| {
            if let Some(max) = max {
                if measured > max {
                    messages.push(format!("{ident}: {measured}, max_{ident}: {max}"))
                }
            }
        });
        let message = messages.join(", ");
        tracing::warn!(
            operation.name = ?operation.name.as_ref().map(|name| name.as_str()),
            "request exceeded complexity limits: {message}"
        );
        if self.warn_only {
            return;
        }

        let location = context.location(operation);
        let OperationLimits {
            depth,
            height,
            root_fields,
            aliases,
        } = exceeded;
        let mut build = |exceeded, code, message| {
            if exceeded {
                context.report_error(
                    graphql::Error::builder()
                        .message(message)
                        .locations(location.clone().into_iter().collect::<Vec<_>>())
                        .extension_code(code)
                        .build(),
                )
            }
        };
        build(
            depth,
            "MAX_DEPTH_LIMIT",
            "Maximum depth limit exceeded in this operation",
        );
        build(
            height,
            "MAX_HEIGHT_LIMIT",
            "Maximum height (field count) limit exceeded in this operation",
        );
        build(
            root_fields,
            "MAX_ROOT_FIELDS_LIMIT",
            "Maximum root fields limit exceeded in this operation",
        );
        build(
            aliases,
            "MAX_ALIASES_LIMIT",
            "Maximum aliases limit exceeded in this operation",
        );
    }
}
