use super::*;
use std::io::Write as _;
use tempfile::NamedTempFile;

const GRAMMAR: &str = r#"{
    "types": [
        { "name": "*list*" },
        { "name": "*cons*", "parents": ["*list*"] },
        { "name": "*null*", "parents": ["*list*"] },
        { "name": "f" },
        { "name": "g", "parents": ["f"] },
        { "name": "h", "parents": ["f"] },
        { "name": "i", "parents": ["g", "h"] },
        { "name": "j" }
    ],
    "features": ["FIRST", "REST", "ARGS", "G"],
    "prototypes": { "g": "[ g G [ *top* ] ]" },
    "quick_check": [[], ["FIRST"]],
    "delete_features": ["ARGS"]
}"#;

fn test_grammar() -> Grammar {
    Grammar::from_json(GRAMMAR.as_bytes()).expect("valid grammar")
}

fn run_command(grammar: &Grammar, command: Command) -> (u8, String) {
    let mut out = Vec::new();
    let code = execute(grammar, &command, &mut out).expect("command runs");
    (code, String::from_utf8(out).expect("utf-8 output"))
}

fn unify_command(first: &str, second: &str) -> Command {
    Command::Unify {
        first: first.to_string(),
        second: second.to_string(),
        restrictor: None,
        restrict: false,
        failures: false,
    }
}

#[test]
fn test_glb() {
    let grammar = test_grammar();
    let glb = |a: &str, b: &str| {
        run_command(
            &grammar,
            Command::Glb {
                first: a.to_string(),
                second: b.to_string(),
            },
        )
    };
    assert_eq!(glb("g", "h"), (EXIT_SUCCESS, "i\n".to_string()));
    assert_eq!(glb("*list*", "*cons*"), (EXIT_SUCCESS, "*cons*\n".to_string()));
    assert_eq!(glb("f", "j"), (EXIT_FAILURE, "BOTTOM\n".to_string()));

    let mut out = Vec::new();
    let err = execute(
        &grammar,
        &Command::Glb {
            first: "nope".into(),
            second: "f".into(),
        },
        &mut out,
    )
    .expect_err("unknown type");
    assert!(err.to_string().contains("nope"));
}

#[test]
fn test_unify_prints_result() {
    let grammar = test_grammar();
    let (code, out) = run_command(
        &grammar,
        unify_command("[ *cons* FIRST #1 [ f ] REST #1 ]", "[ *cons* FIRST [ h ] REST [ g ] ]"),
    );
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "[*cons* FIRST #1[i] REST #1]\n");
}

#[test]
fn test_unify_failure_lists_nodes() {
    let grammar = test_grammar();
    let (code, out) = run_command(
        &grammar,
        Command::Unify {
            first: "[ *cons* FIRST [ f ] ]".into(),
            second: "[ *cons* FIRST [ j ] ]".into(),
            restrictor: None,
            restrict: false,
            failures: true,
        },
    );
    assert_eq!(code, EXIT_FAILURE);
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("unification failed"));
    assert!(lines.any(|line| line.trim_start().starts_with("type clash")));
}

#[test]
fn test_unify_through_default_restrictor() {
    let grammar = test_grammar();
    let (code, out) = run_command(
        &grammar,
        Command::Unify {
            first: "[ *cons* ARGS [ *null* ] ]".into(),
            second: "[ *cons* FIRST [ j ] ]".into(),
            restrictor: None,
            restrict: true,
            failures: false,
        },
    );
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "[*cons* FIRST[j]]\n");
}

#[test]
fn test_unify_through_explicit_restrictor() {
    let grammar = test_grammar();
    let (code, out) = run_command(
        &grammar,
        Command::Unify {
            first: "[ *cons* FIRST [ j ] REST [ *null* ] ]".into(),
            second: "[ *cons* ]".into(),
            restrictor: Some(r#"[ "rstr_keep" FIRST [ *top* ] ]"#.into()),
            restrict: false,
            failures: false,
        },
    );
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "[*cons* FIRST[j]]\n");
}

#[test]
fn test_structures_from_files() {
    let grammar = test_grammar();
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "[ *cons* FIRST [ g ] ]").expect("write");
    let path = format!("@{}", file.path().display());
    let (code, out) = run_command(&grammar, unify_command(&path, "[ *list* ]"));
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "[*cons* FIRST[g]]\n");

    let mut out = Vec::new();
    let missing = unify_command("@/nonexistent/fs.txt", "[ *top* ]");
    assert!(execute(&grammar, &missing, &mut out).is_err());
}

#[test]
fn test_subsumes() {
    let grammar = test_grammar();
    let subsumes = |a: &str, b: &str| {
        run_command(
            &grammar,
            Command::Subsumes {
                first: a.to_string(),
                second: b.to_string(),
            },
        )
        .1
    };
    assert_eq!(subsumes("[ *cons* ]", "[ *cons* FIRST [ j ] ]"), "first subsumes second\n");
    assert_eq!(subsumes("[ *cons* FIRST [ j ] ]", "[ *list* ]"), "second subsumes first\n");
    assert_eq!(subsumes("[ f ]", "[ f ]"), "equal\n");
    assert_eq!(subsumes("[ g ]", "[ h ]"), "incomparable\n");
}

#[test]
fn test_malformed_structure_is_an_error() {
    let grammar = test_grammar();
    let mut out = Vec::new();
    let err = execute(&grammar, &unify_command("[ *cons* NOPE [ f ] ]", "[ f ]"), &mut out)
        .expect_err("unknown feature");
    assert!(format!("{err:#}").contains("NOPE"));
}

#[test]
fn test_glb_cache_dump_and_reload() {
    let grammar = test_grammar();
    let dump = NamedTempFile::new().expect("temp file");
    let (code, out) = run_command(
        &grammar,
        Command::GlbCache {
            out: dump.path().to_path_buf(),
            saturate: true,
        },
    );
    assert_eq!(code, EXIT_SUCCESS);
    let entries = grammar.lattice().glb_cache().len();
    assert!(entries > 0);
    assert!(out.starts_with(&format!("wrote {entries} entries")));

    let fresh = test_grammar();
    assert_eq!(load_glb_cache(&fresh, dump.path()).expect("reload"), entries);
    assert_eq!(fresh.lattice().glb_cache().len(), entries);
}

#[test]
fn test_run_loads_grammar_file() {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(GRAMMAR.as_bytes()).expect("write");
    let args = CliArgs {
        grammar: file.path().to_path_buf(),
        glb_cache: None,
        command: Command::Glb {
            first: "g".into(),
            second: "h".into(),
        },
    };
    let mut out = Vec::new();
    assert_eq!(run(&args, &mut out).expect("runs"), EXIT_SUCCESS);
    assert_eq!(out, b"i\n");

    let missing = CliArgs {
        grammar: "/nonexistent/grammar.json".into(),
        ..args
    };
    assert!(run(&missing, &mut Vec::<u8>::new()).is_err());
}

#[test]
fn test_manifest_declares_only_used_dependencies() {
    let manifest = include_str!("../Cargo.toml");
    let dependencies: Vec<&str> = manifest
        .split("[dependencies]")
        .nth(1)
        .expect("dependency table")
        .lines()
        .take_while(|line| !line.starts_with('['))
        .filter_map(|line| line.split_once(" = ").map(|(name, _)| name.trim()))
        .collect();
    assert_eq!(
        dependencies,
        ["tfs", "tfs-common", "tfs-dag", "anyhow", "clap", "tracing"]
    );
}
