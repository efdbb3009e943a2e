use super::*;

fn names(lattice: &TypeLattice, ids: &[TypeId]) -> Vec<String> {
    ids.iter()
        .map(|&t| lattice.type_name(t).expect("named type").into_owned())
        .collect()
}

#[test]
fn test_missing_glb_is_inserted() {
    let mut builder = LatticeBuilder::new();
    builder
        .declare("a", ["*top*"])
        .and_then(|b| b.declare("b", ["*top*"]))
        .and_then(|b| b.declare("c", ["a", "b"]))
        .and_then(|b| b.declare("d", ["a", "b"]))
        .expect("declarations are valid");
    let lattice = builder.build().expect("lattice builds");

    let glb_type = lattice.type_id("glbtype1").expect("glb type inserted");
    let a = lattice.type_id("a").expect("a");
    let b = lattice.type_id("b").expect("b");
    let c = lattice.type_id("c").expect("c");
    let d = lattice.type_id("d").expect("d");
    assert!(lattice.is_proper_type(glb_type));
    assert_eq!(lattice.unify(a, b), glb_type);
    assert_eq!(lattice.unify(glb_type, c), c);
    assert!(lattice.unify(c, d).is_bottom());
    assert_eq!(names(&lattice, lattice.parents(glb_type)), ["a", "b"]);
    assert_eq!(names(&lattice, lattice.children(glb_type)), ["c", "d"]);
    assert_eq!(names(&lattice, lattice.parents(c)), ["glbtype1"]);
}

#[test]
fn test_proper_types_precede_leaves_in_topological_order() {
    let mut builder = LatticeBuilder::new();
    builder
        .declare("leafy", ["*top*"])
        .and_then(|b| b.declare("x", ["*top*"]))
        .and_then(|b| b.declare("y", ["*top*"]))
        .and_then(|b| b.declare("xy", ["x", "y"]))
        .expect("declarations are valid");
    let lattice = builder.build().expect("lattice builds");
    let count = lattice.first_leaf_type().0;
    for t in 0..count {
        for &parent in lattice.parents(TypeId(t)) {
            assert!(parent < TypeId(t), "parents get smaller ids");
        }
    }
    assert!(lattice.is_leaf_type(lattice.type_id("leafy").expect("leafy")));
    assert_eq!(lattice.top_distance(lattice.type_id("xy").expect("xy")), 2);
    assert_eq!(lattice.top_distance(TypeId::TOP), 0);
}

#[test]
fn test_leaf_chains() {
    let mut builder = LatticeBuilder::new();
    builder
        .declare("l1", ["*top*"])
        .and_then(|b| b.declare("l2", ["l1"]))
        .and_then(|b| b.declare("l3", ["l2"]))
        .and_then(|b| b.declare("other", ["l1"]))
        .expect("declarations are valid");
    let lattice = builder.build().expect("lattice builds");
    let t = |name: &str| lattice.type_id(name).expect("declared");
    assert_eq!(lattice.first_leaf_type(), TypeId(1));
    assert_eq!(lattice.unify(t("l3"), t("l1")), t("l3"));
    assert_eq!(lattice.unify(t("l1"), t("l3")), t("l3"));
    assert!(lattice.unify(t("l3"), t("other")).is_bottom());
    assert!(lattice.subsumes(t("l2"), t("l3")));
    assert!(!lattice.subsumes(t("l3"), t("l2")));
}

#[test]
fn test_proper_codes_are_descendant_sets() {
    let mut builder = LatticeBuilder::new();
    builder
        .declare("p", ["*top*"])
        .and_then(|b| b.declare("q", ["*top*"]))
        .and_then(|b| b.declare("pq", ["p", "q"]))
        .expect("declarations are valid");
    let lattice = builder.build().expect("lattice builds");
    let p = lattice.type_id("p").expect("p");
    let pq = lattice.type_id("pq").expect("pq");
    let top_code = lattice.bitcode(TypeId::TOP).expect("top has a code");
    let p_code = lattice.bitcode(p).expect("p has a code");
    let pq_code = lattice.bitcode(pq).expect("pq has a code");
    assert_eq!(top_code.count_ones(), lattice.first_leaf_type().index());
    assert!(pq_code.is_subset(p_code));
    assert!(p_code.is_subset(top_code));
    assert!(!p_code.is_subset(pq_code));
}

#[test]
fn test_declaration_errors() {
    let mut builder = LatticeBuilder::new();
    assert_eq!(
        builder.declare("", ["*top*"]).map(|_| ()),
        Err(LatticeError::EmptyName)
    );
    assert_eq!(
        builder.declare("*top*", ["*top*"]).map(|_| ()),
        Err(LatticeError::DuplicateType("*top*".to_owned()))
    );

    let mut builder = LatticeBuilder::new();
    builder.declare("a", ["nowhere"]).expect("declared lazily");
    assert_eq!(
        builder.build().map(|_| ()),
        Err(LatticeError::UnknownParent {
            ty: "a".to_owned(),
            parent: "nowhere".to_owned()
        })
    );
}

#[test]
fn test_cycle_is_rejected() {
    let mut builder = LatticeBuilder::new();
    builder
        .declare("a", ["b"])
        .and_then(|b| b.declare("b", ["a"]))
        .expect("declared lazily");
    assert!(matches!(
        builder.build(),
        Err(LatticeError::CyclicHierarchy(_))
    ));
}
