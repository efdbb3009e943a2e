use super::*;
use crate::fixtures::{parse, test_grammar};
use crate::grammar::Grammar;

fn ty(grammar: &Grammar, name: &str) -> TypeId {
    grammar.type_id(name).expect("known type")
}

#[test]
fn test_vector_follows_paths() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let dag = parse(
        &mut session,
        "[ *cons* FIRST [ j ] REST [ *cons* FIRST [ *top* ARGS [ *null* ] ] REST [ f ] ] ]",
    );
    let vector = grammar.quick_check().vector(session.arena(), dag);
    assert_eq!(
        vector.types(),
        [ty(&grammar, "*cons*"), ty(&grammar, "j"), TypeId::TOP, TypeId::BOTTOM, TypeId::BOTTOM]
    );
    assert_eq!(vector.get(7), TypeId::BOTTOM);
}

#[test]
fn test_vector_sees_unification_result() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let a = parse(&mut session, "[ *cons* FIRST [ f ] ]");
    let b = parse(&mut session, "[ *list* FIRST [ g ] REST [ *cons* FIRST [ j ] ] ]");
    assert!(session.unify_only(a, b));
    let vector = grammar.quick_check().vector(session.arena(), a);
    session.invalidate();
    assert_eq!(
        vector.types(),
        [ty(&grammar, "*cons*"), ty(&grammar, "g"), ty(&grammar, "j"), TypeId::BOTTOM, TypeId::BOTTOM]
    );
}

#[test]
fn test_compatible_ignores_absent_paths() {
    let grammar = test_grammar();
    let lattice = grammar.lattice();
    let (f, g, j) = (ty(&grammar, "f"), ty(&grammar, "g"), ty(&grammar, "j"));
    let a = QcVector::from_types([f, TypeId::BOTTOM, j]);
    assert!(a.compatible(&QcVector::from_types([g, j, TypeId::TOP]), lattice));
    assert!(a.compatible(&QcVector::from_types([TypeId::BOTTOM, f, TypeId::BOTTOM]), lattice));
    assert!(!a.compatible(&QcVector::from_types([j, TypeId::BOTTOM, j]), lattice));
    assert!(!a.compatible(&QcVector::from_types([g, TypeId::BOTTOM, f]), lattice));
}

#[test]
fn test_paths_from_pseudo_dag() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let root = parse(
        &mut session,
        r#"[ "1" FIRST [ "3" ] REST [ *top* FIRST [ "2" ] ] ]"#,
    );
    let paths = QcPaths::from_pseudo_dag(session.arena(), root, grammar.lattice())
        .expect("valid paths");
    assert_eq!(paths.len(), 3);

    let dag = parse(&mut session, "[ *cons* FIRST [ j ] REST [ *cons* FIRST [ f ] ] ]");
    assert_eq!(
        paths.vector(session.arena(), dag).types(),
        [ty(&grammar, "*cons*"), ty(&grammar, "f"), ty(&grammar, "j")]
    );
}

#[test]
fn test_pseudo_dag_with_bad_position() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    for text in [r#"[ *top* FIRST [ "first" ] ]"#, r#"[ *top* FIRST [ "0" ] ]"#] {
        let root = parse(&mut session, text);
        let err = QcPaths::from_pseudo_dag(session.arena(), root, grammar.lattice())
            .expect_err("bad position");
        assert!(matches!(err, QcError::BadPosition { .. }), "{text}");
    }
}

#[test]
fn test_cyclic_pseudo_dag_is_rejected() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let root = parse(&mut session, r#"# 1 [ "1" REST # 1 ]"#);
    let err = QcPaths::from_pseudo_dag(session.arena(), root, grammar.lattice())
        .expect_err("cyclic paths");
    assert!(matches!(err, QcError::Cyclic { .. }));
}

#[test]
fn test_empty_paths_give_empty_vector() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let dag = parse(&mut session, "[ *cons* FIRST [ j ] ]");
    let paths = QcPaths::default();
    assert!(paths.is_empty());
    assert!(paths.vector(session.arena(), dag).is_empty());
}
