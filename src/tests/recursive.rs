use alloc::{format, vec::Vec};

use super::{decode_error, plans, test_value};
use crate::{
    serialize_to_vec, serialized_size, CodecErrorKind, CollectionOptions, ElementKind, ElementOp,
    IntWidth, Location, MemberSchema, Record, SchemaSet, StepOp, TypeSchema, Value, ValueType,
    MAX_DEPTH,
};

fn node_schemas() -> SchemaSet {
    SchemaSet::new().with(
        TypeSchema::new("Node")
            .member(MemberSchema::primitive("value", ValueType::Int(IntWidth::U32)))
            .member(MemberSchema::nested("next", "Node").optional()),
    )
}

fn chain(depth: u32) -> Value {
    let mut node = Record::new("Node").with("value", depth);
    for value in (0..depth).rev() {
        node = Record::new("Node").with("value", value).with("next", node);
    }
    node.into()
}

#[test]
fn test_self_reference() {
    let plans = plans(&node_schemas());
    assert_eq!(plans.len(), 1);

    let plan = plans.get("Node").unwrap();
    match plan.steps()[1].op {
        StepOp::Object(id) => assert_eq!(id, plan.id()),
        ref op => panic!("unexpected {:?}", op),
    }

    let rendered = format!("{}", plan);
    assert!(rendered.contains("    next?: Node,"));
}

#[test]
fn test_chain_round_trip() {
    let plans = plans(&node_schemas());
    let plan = plans.get("Node").unwrap();

    for depth in [0, 1, 16] {
        let bytes = test_value(plan, &chain(depth));
        // Value and flag per node, the last flag is zero.
        assert_eq!(bytes.len(), (depth as usize + 1) * 5);
        assert_eq!(bytes.last(), Some(&0));
    }
}

#[test]
fn test_depth_limit() {
    let plans = plans(&node_schemas());
    let plan = plans.get("Node").unwrap();
    let limit = CodecErrorKind::DepthLimitExceeded(MAX_DEPTH);

    // `chain(n)` holds `n + 1` nodes.
    let deepest = MAX_DEPTH as u32 - 1;
    assert_eq!(test_value(plan, &chain(deepest)).len(), MAX_DEPTH * 5);

    let too_deep = chain(deepest + 1);
    assert_eq!(serialized_size(plan, &too_deep).unwrap_err().kind, limit);
    let err = serialize_to_vec(plan, &too_deep).unwrap_err();
    assert_eq!(err.kind, limit);
    assert_eq!(err.location, Location::of_type(&"Node".into()));

    // Long chains in the input fail instead of exhausting the stack.
    let mut input = Vec::with_capacity(200_001 * 5);
    for _ in 0..200_000 {
        input.extend_from_slice(&[0, 0, 0, 0, 1]);
    }
    input.extend_from_slice(&[0, 0, 0, 0, 0]);
    assert_eq!(decode_error(plan, &input).kind, limit);
}

#[test]
fn test_mutual_reference() {
    let schemas = SchemaSet::new()
        .with(
            TypeSchema::new("Tree")
                .member(MemberSchema::primitive("label", ValueType::Str))
                .member(MemberSchema::collection(
                    "branches",
                    ValueType::named("Branch"),
                    CollectionOptions::new(ElementKind::NestedObject)
                        .with_count_prefix(IntWidth::U8),
                )),
        )
        .with(
            TypeSchema::new("Branch")
                .member(MemberSchema::primitive("weight", ValueType::F32))
                .member(MemberSchema::nested("tree", "Tree")),
        );
    let plans = plans(&schemas);
    assert_eq!(plans.len(), 2);

    let tree = plans.get("Tree").unwrap();
    let branch = plans.get("Branch").unwrap();

    match &tree.steps()[1].op {
        StepOp::Collection(spec) => {
            assert!(matches!(spec.element, ElementOp::Object(id) if id == branch.id()))
        }
        op => panic!("unexpected {:?}", op),
    }
    assert!(matches!(branch.steps()[1].op, StepOp::Object(id) if id == tree.id()));

    let leaf = |label: &str| -> Value {
        Record::new("Tree")
            .with("label", label)
            .with("branches", Vec::<Value>::new())
            .into()
    };
    let value: Value = Record::new("Tree")
        .with("label", "root")
        .with(
            "branches",
            alloc::vec![
                Value::from(Record::new("Branch").with("weight", 0.5f32).with("tree", leaf("a"))),
                Value::from(Record::new("Branch").with("weight", 1.5f32).with("tree", leaf("b"))),
            ],
        )
        .into();

    test_value(tree, &value);
}
