use super::*;
use crate::fixtures::{BASE, parse, parse_all, test_grammar};

/// `SUBSUMPTION[i][j]` relates `BASE[i]` to `BASE[j]`: `E` equal, `T` the
/// first is more general, `A` the second is more general, `0` unrelated.
const SUBSUMPTION: [&str; 13] = [
    "ETTTTTTTTTTTT",
    "AET0TTTT00TT0",
    "AAE0TT0000000",
    "A00E0000TT00T",
    "AAA0ET0000000",
    "AAA0AE0000000",
    "AA0000ET00000",
    "AA0000AE00000",
    "A00A0000ET000",
    "A00A0000AE000",
    "AA00000000EA0",
    "AA00000000TE0",
    "A00A00000000E",
];

fn expected(i: usize, j: usize) -> Subsumption {
    match SUBSUMPTION[i].as_bytes()[j] {
        b'E' => Subsumption::EQUAL,
        b'T' => Subsumption::THIS_MORE_GENERAL,
        b'A' => Subsumption::ARG_MORE_GENERAL,
        _ => Subsumption::empty(),
    }
}

#[test]
fn test_bidirectional_subsumption_table() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let dags = parse_all(&mut session, &BASE);
    for i in 0..BASE.len() {
        for j in 0..BASE.len() {
            let result = session.subsumes_bidirectional(dags[i], dags[j]);
            assert_eq!(result, expected(i, j), "subsumption of {i} and {j}");
        }
    }
}

#[test]
fn test_one_way_subsumption_agrees_with_table() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let dags = parse_all(&mut session, &BASE);
    for i in 0..BASE.len() {
        for j in 0..BASE.len() {
            let forward = expected(i, j).contains(Subsumption::THIS_MORE_GENERAL);
            assert_eq!(session.subsumes(dags[i], dags[j]), forward, "{i} subsumes {j}");
        }
    }
}

#[test]
fn test_equality_is_mutual_subsumption() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let dags = parse_all(&mut session, &BASE);
    let copies = parse_all(&mut session, &BASE);
    for i in 0..BASE.len() {
        for j in 0..BASE.len() {
            let equal = session.dags_equal(dags[i], copies[j]);
            assert_eq!(equal, i == j, "equality of {i} and {j}");
            let both = session.subsumes_bidirectional(dags[i], copies[j]) == Subsumption::EQUAL;
            assert_eq!(equal, both);
        }
    }
}

#[test]
fn test_coreference_makes_structure_more_specific() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    let shared = parse(&mut session, "[ *cons* FIRST #1 [ j ] REST #1 ]");
    let separate = parse(&mut session, "[ *cons* FIRST [ j ] REST [ j ] ]");
    assert!(session.subsumes(separate, shared));
    assert!(!session.subsumes(shared, separate));
    assert!(!session.dags_equal(shared, separate));
}

#[test]
fn test_failure_log_names_direction() {
    let grammar = test_grammar();
    let mut session = grammar.session();
    session.record_failures(true);
    let general = parse(&mut session, "[ *cons* FIRST [ *top* ] ]");
    let specific = parse(&mut session, "[ *cons* FIRST [ j ] ]");
    assert_eq!(
        session.subsumes_bidirectional(general, specific),
        Subsumption::THIS_MORE_GENERAL
    );
    let log = session.failures().expect("recording is on");
    assert!(log.forward.is_empty());
    let first = session.arena().edges(general)[0].target;
    assert_eq!(log.backward.get(&first), Some(&FailureKind::Type));
}
