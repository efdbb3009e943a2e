use super::*;
use crate::fixtures::{parse, test_grammar};
use crate::grammar::Grammar;

const PSEUDO_DAG: &str = r#"[ *top* FIRST [ "rstr_no" ARGS [ "rstr_del" ] ] REST [ "rstr_no" FIRST [ "rstr_no" ] REST [ "rstr_del" ] ] ]"#;

fn feature(grammar: &Grammar, name: &str) -> FeatureId {
    grammar.feature_id(name).expect("known feature")
}

fn tree_from(grammar: &Grammar, text: &str) -> RestrictorTree {
    let mut session = grammar.session();
    let root = parse(&mut session, text);
    RestrictorTree::from_pseudo_dag(session.arena(), root, grammar.lattice())
        .unwrap_or_else(|err| panic!("{text}: {err}"))
}

#[test]
fn test_mode_names() {
    assert_eq!(RestrictMode::from_name("rstr_keep"), Some(RestrictMode::Keep));
    assert_eq!(RestrictMode::from_name("RSTR_DEL"), Some(RestrictMode::Delete));
    assert_eq!(RestrictMode::from_name(" no "), Some(RestrictMode::None));
    assert_eq!(RestrictMode::from_name("rstr_maybe"), None);
    assert_eq!(RestrictMode::None.to_string(), "rstr_no");
    assert_eq!(RestrictMode::default(), RestrictMode::Keep);
}

#[test]
fn test_delete_set_stays_sorted_and_unique() {
    let mut set: DeleteSet = [FeatureId(4), FeatureId(1), FeatureId(3)].into_iter().collect();
    assert!(!set.insert(FeatureId(3)));
    assert!(set.insert(FeatureId(2)));
    assert_eq!(
        set.iter().collect::<Vec<_>>(),
        [FeatureId(1), FeatureId(2), FeatureId(3), FeatureId(4)]
    );
    assert!(set.contains(FeatureId(4)));
    assert!(!set.contains(FeatureId(0)));
}

#[test]
fn test_tree_from_pseudo_dag() {
    let grammar = test_grammar();
    let tree = tree_from(&grammar, PSEUDO_DAG);
    let (first, rest, args) = (
        feature(&grammar, "FIRST"),
        feature(&grammar, "REST"),
        feature(&grammar, "ARGS"),
    );

    assert_eq!(tree.len(), 6);
    let root = tree.node(tree.root());
    assert_eq!(root.mode, RestrictMode::Keep);
    assert_eq!(root.children().len(), 2);
    assert!(root.child(args).is_none());

    let first_node = tree.node(root.child(first).expect("FIRST child"));
    assert_eq!(first_node.mode, RestrictMode::None);
    let args_node = tree.node(first_node.child(args).expect("ARGS child"));
    assert_eq!(args_node.mode, RestrictMode::Delete);

    let rest_node = tree.node(root.child(rest).expect("REST child"));
    assert_eq!(rest_node.mode, RestrictMode::None);
    assert_eq!(
        tree.node(rest_node.child(rest).expect("REST.REST child")).mode,
        RestrictMode::Delete
    );
}

#[test]
fn test_keeps_by_mode() {
    let grammar = test_grammar();
    let restrictor = Restrictor::from(tree_from(&grammar, PSEUDO_DAG));
    let (first, rest, args) = (
        feature(&grammar, "FIRST"),
        feature(&grammar, "REST"),
        feature(&grammar, "ARGS"),
    );

    let root = restrictor.start();
    assert!(restrictor.keeps(root, first));
    assert!(restrictor.keeps(root, rest));
    assert!(!restrictor.keeps(root, args));

    let at_first = restrictor.descend(root, first);
    assert!(!restrictor.keeps(at_first, args));
    assert!(restrictor.keeps(at_first, rest));

    // Below the tree everything survives.
    let below = restrictor.descend(at_first, rest);
    assert_eq!(below, RestrictCursor::Open);
    assert!(restrictor.keeps(below, args));
}

#[test]
fn test_global_delete_set_applies_everywhere() {
    let grammar = test_grammar();
    let args = feature(&grammar, "ARGS");
    let tree = RestrictorTree::new(RestrictMode::None).with_delete_set([args].into_iter().collect());
    let restrictor = Restrictor::from(tree);
    assert!(!restrictor.keeps(restrictor.start(), args));
    assert!(!restrictor.keeps(RestrictCursor::Open, args));
    assert!(restrictor.keeps(restrictor.start(), feature(&grammar, "FIRST")));

    let simple = Restrictor::from(DeleteSet::from_iter([args]));
    assert_eq!(simple.start(), RestrictCursor::Open);
    assert!(!simple.keeps(simple.start(), args));
}

#[test]
fn test_coreferenced_pseudo_nodes_are_shared() {
    let grammar = test_grammar();
    let tree = tree_from(&grammar, r#"# 1 [ "rstr_no" REST # 1 FIRST [ "rstr_del" ] ]"#);
    let rest = feature(&grammar, "REST");
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.node(tree.root()).child(rest), Some(tree.root()));
}

#[test]
fn test_generalization_picks_most_specific_supertype() {
    let grammar = test_grammar();
    let tree = tree_from(&grammar, r#"[ "rstr_no,f,g" ]"#);
    let lattice = grammar.lattice();
    let ty = |name: &str| grammar.type_id(name).expect("known type");
    assert_eq!(tree.node(tree.root()).mode, RestrictMode::None);
    assert_eq!(tree.node(tree.root()).generalize_to.as_slice(), [ty("f"), ty("g")]);

    let restrictor = Restrictor::from(tree);
    let root = restrictor.start();
    assert_eq!(restrictor.generalize(root, ty("i"), lattice), ty("g"));
    assert_eq!(restrictor.generalize(root, ty("h"), lattice), ty("f"));
    assert_eq!(restrictor.generalize(root, ty("j"), lattice), ty("j"));
    assert_eq!(restrictor.generalize(RestrictCursor::Open, ty("i"), lattice), ty("i"));
}

#[test]
fn test_unknown_generalization_type() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let root = parse(&mut session, r#"[ "rstr_keep,no_such_type" ]"#);
    let err = RestrictorTree::from_pseudo_dag(session.arena(), root, grammar.lattice())
        .expect_err("unknown type");
    assert!(matches!(err, RestrictorError::UnknownType { ref name } if name == "no_such_type"));
}
