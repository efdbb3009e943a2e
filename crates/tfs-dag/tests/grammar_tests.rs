use super::*;
use crate::fixtures::test_grammar;
use crate::restrictor::RestrictMode;

const DESCRIPTION: &str = r#"{
    "types": [
        { "name": "*list*" },
        { "name": "*cons*", "parents": ["*list*"] },
        { "name": "*null*", "parents": ["*list*"] },
        { "name": "word" },
        { "name": "+" }
    ],
    "features": ["FIRST", "REST", "ARGS", "KEY-ARG", "ORTH"],
    "prototypes": {
        "word": "[ word ORTH [ *top* ] ]",
        "*cons*": "[ *cons* FIRST [ *top* ] REST [ *list* ] ]"
    },
    "appropriate": { "FIRST": "*cons*", "REST": "*cons*", "ORTH": "word", "ARGS": "*list*" },
    "quick_check": [[], ["FIRST"], ["ARGS", "FIRST"]],
    "delete_features": ["ORTH"],
    "restrictor": "[ *top* ARGS [ \"rstr_del\" ] ]"
}"#;

fn builder() -> GrammarBuilder {
    let mut lattice = LatticeBuilder::new();
    lattice.declare("f", ["*top*"]).expect("f");
    lattice.declare("g", ["f"]).expect("g");
    let mut builder = Grammar::builder(lattice.build().expect("lattice"));
    builder.features(["FIRST", "REST", "G"]);
    builder
}

#[test]
fn test_grammar_from_json_description() {
    let grammar = Grammar::from_json(DESCRIPTION.as_bytes()).expect("valid description");
    assert!(grammar.type_id("word").is_some());
    assert_eq!(grammar.features().len(), 5);
    assert_eq!(grammar.quick_check().len(), 3);

    let special = grammar.special_features();
    assert_eq!(special.args, grammar.feature_id("ARGS"));
    assert_eq!(special.first, grammar.feature_id("FIRST"));
    assert_eq!(special.rest, grammar.feature_id("REST"));
    assert_eq!(special.key_arg, grammar.feature_id("KEY-ARG"));
    assert_eq!(grammar.key_arg_marker(), grammar.type_id("+"));

    let word = grammar.type_id("word").expect("word");
    let (arena, root) = grammar.prototype(word).expect("prototype of word");
    assert_eq!(arena.node_type(root), word);
    assert_eq!(arena.edges(root).len(), 1);
    assert!(grammar.prototype(grammar.type_id("*null*").expect("null")).is_none());

    let feature = |name| grammar.feature_id(name).expect("known feature");
    let ty = |name| grammar.type_id(name).expect("known type");
    assert_eq!(grammar.appropriate_type(feature("ORTH")), Some(word));
    assert_eq!(grammar.max_appropriate_type(feature("ORTH")), Some(TypeId::TOP));
    assert_eq!(grammar.appropriate_type(feature("REST")), Some(ty("*cons*")));
    assert_eq!(grammar.max_appropriate_type(feature("REST")), Some(ty("*list*")));
    // No prototype of *list*, so no value type beyond *top*.
    assert_eq!(
        grammar.appropriateness(feature("ARGS")),
        Some(Appropriateness {
            introduced_by: ty("*list*"),
            max_type: TypeId::TOP,
        })
    );
    assert_eq!(grammar.appropriateness(feature("KEY-ARG")), None);

    let orth = grammar.feature_id("ORTH").expect("ORTH");
    assert!(grammar.delete_set().contains(orth));
    match grammar.restrictor() {
        Restrictor::Tree(tree) => {
            let args = grammar.feature_id("ARGS").expect("ARGS");
            let child = tree.node(tree.root()).child(args).expect("ARGS restrictor");
            assert_eq!(tree.node(child).mode, RestrictMode::Delete);
            assert!(tree.delete_set().contains(orth));
        }
        Restrictor::Simple(_) => panic!("expected a restrictor tree"),
    }
}

#[test]
fn test_minimal_description_uses_defaults() {
    let grammar = Grammar::from_json(r#"{ "types": [ { "name": "a" } ] }"#.as_bytes())
        .expect("valid description");
    assert!(grammar.features().is_empty());
    assert!(grammar.quick_check().is_empty());
    assert!(matches!(grammar.restrictor(), Restrictor::Simple(set) if set.is_empty()));
    assert_eq!(grammar.special_features().args, None);
    assert_eq!(grammar.key_arg_marker(), None);
    assert_eq!(grammar.diff_list_type(), None);
}

#[test]
fn test_description_round_trips_through_serde() {
    let description: GrammarDescription = serde_json::from_str(DESCRIPTION).expect("parse");
    let json = serde_json::to_string(&description).expect("serialize");
    let again: GrammarDescription = serde_json::from_str(&json).expect("reparse");
    assert_eq!(again.types.len(), 5);
    assert_eq!(again.prototypes, description.prototypes);
    assert_eq!(again.appropriate, description.appropriate);
    assert_eq!(again.restrictor, description.restrictor);
}

#[test]
fn test_description_errors() {
    let err = Grammar::from_json("{ \"types\": 3 }".as_bytes()).expect_err("bad json");
    assert!(matches!(err, GrammarError::Description(_)));

    let err = Grammar::from_json(r#"{ "types": [ { "name": "a", "parents": ["b"] } ] }"#.as_bytes())
        .expect_err("unknown parent");
    assert!(matches!(err, GrammarError::Lattice(LatticeError::UnknownParent { .. })));

    let err = Grammar::from_json(
        r#"{ "features": ["FIRST"], "delete_features": ["ARGS"] }"#.as_bytes(),
    )
    .expect_err("unknown delete feature");
    assert!(matches!(err, GrammarError::UnknownFeature { ref name } if name == "ARGS"));
}

#[test]
fn test_prototype_must_have_its_type_at_the_root() {
    let mut builder = builder();
    let err = builder.prototype("g", "[ f G [ *top* ] ]").expect_err("wrong root");
    assert!(matches!(
        err,
        GrammarError::PrototypeMismatch { ref ty, ref found } if ty == "g" && found == "f"
    ));
    assert!(builder.prototype("g", "[ g G [ *top* ] ]").is_ok());
}

#[test]
fn test_prototype_errors() {
    let mut builder = builder();
    let err = builder.prototype("nope", "[ *top* ]").expect_err("unknown type");
    assert!(matches!(err, GrammarError::UnknownType { .. }));

    let err = builder.prototype("g", "[ g H [ *top* ] ]").expect_err("unknown feature");
    match err {
        GrammarError::Prototype { ty, source } => {
            assert_eq!(ty, "g");
            assert!(matches!(source, JxchgError::UnknownFeature { .. }));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_appropriateness_errors() {
    let mut builder = builder();
    let err = builder.appropriate("H", "g").expect_err("unknown feature");
    assert!(matches!(err, GrammarError::UnknownFeature { ref name } if name == "H"));
    let err = builder.appropriate("G", "nope").expect_err("unknown type");
    assert!(matches!(err, GrammarError::UnknownType { ref name } if name == "nope"));

    // Declared before the prototype that fixes the value type.
    builder.appropriate("G", "g").expect("known names");
    builder.prototype("g", "[ g G [ f ] ]").expect("prototype of g");
    let grammar = builder.build();
    let g = grammar.feature_id("G").expect("G");
    assert_eq!(grammar.appropriate_type(g), grammar.type_id("g"));
    assert_eq!(grammar.max_appropriate_type(g), grammar.type_id("f"));
}

#[test]
fn test_builder_debug_output() {
    let mut builder = builder();
    builder.appropriate("G", "g").expect("known names");
    let debug = format!("{builder:?}");
    assert!(debug.starts_with("GrammarBuilder"));
    assert!(debug.contains("appropriate"));
}

#[test]
fn test_quick_check_errors() {
    let mut builder = builder();
    let err = builder
        .quick_check_paths(&[vec!["FIRST"], vec!["ARGS"]])
        .expect_err("unknown feature");
    assert!(matches!(err, GrammarError::UnknownFeature { ref name } if name == "ARGS"));

    let err = builder
        .quick_check_dag(r#"[ *top* FIRST [ "x" ] ]"#)
        .expect_err("bad position");
    assert!(matches!(err, GrammarError::QuickCheck(QcError::BadPosition { .. })));

    builder
        .quick_check_dag(r#"[ *top* FIRST [ "2" ] REST [ "1" ] ]"#)
        .expect("valid paths");
    assert_eq!(builder.build().quick_check().len(), 2);
}

#[test]
fn test_grammar_debug_summary() {
    let grammar = test_grammar();
    let debug = format!("{grammar:?}");
    assert!(debug.starts_with("Grammar"));
    assert!(debug.contains("prototypes: 2"));
}
