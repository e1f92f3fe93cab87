use apollo_compiler::Schema;
use pretty_assertions::assert_eq;
use test_log::test;

use super::*;
use crate::configuration;

const SCHEMA: &str = r#"
type Query {
    me: User
    topProducts(first: Int): [Product]
}

type Mutation {
    logout: Boolean
}

type User {
    id: ID!
    name: String
    friends: [User]
}

type Product {
    upc: String!
    name: String
}
"#;

fn schema() -> Valid<Schema> {
    Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap()
}

fn run(
    configuration: &Configuration,
    params: &OperationParams,
    query: &str,
) -> Result<(), ValidationErrors> {
    let schema = schema();
    let document = crate::spec::parse(query, &configuration.parser).unwrap();
    let rules = DefaultValidationRules::new(configuration);
    validate(
        &schema,
        &document,
        params,
        params.operation_name.as_deref(),
        &rules,
    )
}

fn codes(errors: &ValidationErrors) -> Vec<String> {
    errors
        .errors
        .iter()
        .filter_map(|error| error.extension_code())
        .collect()
}

#[test]
fn valid_document() {
    let params = OperationParams::builder().query("{ me { id } }").build();
    assert_eq!(
        run(&Configuration::default(), &params, "{ me { id name } }"),
        Ok(())
    );
}

#[test]
fn specified_rules_report_unknown_fields() {
    let params = OperationParams::builder().query("{ me { nope } }").build();
    let errors = run(&Configuration::default(), &params, "{ me { nope } }").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors.errors[0].message.contains("nope"));
    assert!(!errors.errors[0].locations.is_empty());
}

#[test]
fn persisted_queries_are_trusted() {
    let params = OperationParams::builder().query_id("abc").build();
    assert_eq!(
        run(&Configuration::default(), &params, "{ me { nope } }"),
        Ok(())
    );
}

#[test]
fn no_rules_means_no_validation() {
    let schema = schema();
    let document =
        crate::spec::parse("{ me { nope } }", &configuration::Parser::default()).unwrap();
    let params = OperationParams::builder().query("{ me { nope } }").build();
    let no_rules = |_: &OperationParams, _: &ast::Document, _: Option<&str>| {
        Vec::<Box<dyn ValidationRule>>::new()
    };
    assert_eq!(validate(&schema, &document, &params, None, &no_rules), Ok(()));
}

#[test]
fn depth_limit() {
    let configuration = Configuration::builder()
        .limits(Limits {
            max_depth: Some(2),
            ..Default::default()
        })
        .build();
    let params = OperationParams::builder().query("").build();
    assert_eq!(run(&configuration, &params, "{ me { id } }"), Ok(()));

    let errors = run(
        &configuration,
        &params,
        "{ me { ...F } } fragment F on User { friends { id } }",
    )
    .unwrap_err();
    assert_eq!(codes(&errors), ["MAX_DEPTH_LIMIT"]);
    assert_eq!(
        errors.errors[0].message,
        "Maximum depth limit exceeded in this operation"
    );
}

#[test]
fn limits_measure_each_fragment_once() {
    let limits = Limits {
        max_depth: Some(2),
        max_height: Some(1000),
        ..Default::default()
    };
    let only_limits = move |_: &OperationParams, _: &ast::Document, _: Option<&str>| {
        let rules: Vec<Box<dyn ValidationRule>> = OperationLimitsRule::new(&limits)
            .into_iter()
            .map(|rule| Box::new(rule) as Box<dyn ValidationRule>)
            .collect();
        rules
    };

    let levels = 64;
    let mut query = String::from("{ me { ...F0 } }\n");
    for level in 0..levels {
        let next = level + 1;
        query.push_str(&format!(
            "fragment F{level} on User {{ ...F{next} ...F{next} }}\n"
        ));
    }
    query.push_str(&format!("fragment F{levels} on User {{ friends {{ id }} }}\n"));

    let schema = schema();
    let document = crate::spec::parse(&query, &configuration::Parser::default()).unwrap();
    let params = OperationParams::builder().query(query.as_str()).build();
    let errors = validate(&schema, &document, &params, None, &only_limits).unwrap_err();
    assert_eq!(codes(&errors), ["MAX_DEPTH_LIMIT", "MAX_HEIGHT_LIMIT"]);
}

#[test]
fn fragments_spread_at_the_root_count_as_root_fields() {
    let configuration = Configuration::builder()
        .limits(Limits {
            max_root_fields: Some(1),
            ..Default::default()
        })
        .build();
    let params = OperationParams::builder().query("").build();
    let errors = run(
        &configuration,
        &params,
        "{ ...Root } fragment Root on Query { me { id } topProducts { upc } }",
    )
    .unwrap_err();
    assert_eq!(codes(&errors), ["MAX_ROOT_FIELDS_LIMIT"]);
}

#[test]
fn height_root_fields_and_aliases() {
    let configuration = Configuration::builder()
        .limits(Limits {
            max_height: Some(3),
            max_root_fields: Some(1),
            max_aliases: Some(1),
            ..Default::default()
        })
        .build();
    let params = OperationParams::builder().query("").build();
    let errors = run(
        &configuration,
        &params,
        "{ a: me { id } b: me { id } topProducts { upc } }",
    )
    .unwrap_err();
    assert_eq!(
        codes(&errors),
        [
            "MAX_HEIGHT_LIMIT",
            "MAX_ROOT_FIELDS_LIMIT",
            "MAX_ALIASES_LIMIT"
        ]
    );

    // The same field selected twice counts once
    assert_eq!(run(&configuration, &params, "{ me { id id } me { id } }"), Ok(()));
}

#[test]
fn limits_only_apply_to_the_selected_operation() {
    let configuration = Configuration::builder()
        .limits(Limits {
            max_root_fields: Some(1),
            ..Default::default()
        })
        .build();
    let params = OperationParams::builder()
        .query("")
        .operation_name("Small")
        .build();
    assert_eq!(
        run(
            &configuration,
            &params,
            "query Small { me { id } } query Large { me { id } topProducts { upc } }",
        ),
        Ok(())
    );
}

#[test]
fn warn_only_limits() {
    let configuration = Configuration::builder()
        .limits(Limits {
            max_depth: Some(1),
            warn_only: true,
            ..Default::default()
        })
        .build();
    let params = OperationParams::builder().query("").build();
    assert_eq!(
        run(&configuration, &params, "{ me { friends { id } } }"),
        Ok(())
    );
}

#[test]
fn introspection_can_be_disabled() {
    let params = OperationParams::builder().query("").build();
    let query = "{ __schema { queryType { name } } }";
    assert_eq!(run(&Configuration::default(), &params, query), Ok(()));

    let configuration = Configuration::builder().introspection(false).build();
    let errors = run(&configuration, &params, query).unwrap_err();
    assert_eq!(codes(&errors), ["INTROSPECTION_DISABLED"]);

    // __typename stays available
    assert_eq!(run(&configuration, &params, "{ __typename }"), Ok(()));
}
