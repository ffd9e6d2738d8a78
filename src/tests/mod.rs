mod recursive;
mod validation;

use alloc::{vec, vec::Vec};

use crate::{
    build_plans, deserialize, serialize, serialize_to_vec, serialized_size, CodecError,
    CodecErrorKind, DrySink, GlobalBindings, PlanRef, Plans, SchemaSet, SliceSink, Value,
};

fn plans(schemas: &SchemaSet) -> Plans {
    build_plans(schemas, &GlobalBindings::new()).expect("expected valid schemas")
}

/// Serializes the value with every sink, checks sizes
/// and that the value survives a round trip.
/// Returns serialized bytes.
fn test_value(plan: PlanRef<'_>, value: &Value) -> Vec<u8> {
    let size = serialized_size(plan, value).expect("expected success");

    let buffer = serialize_to_vec(plan, value).expect("expected success");
    assert_eq!(size, buffer.len());

    let mut dry = DrySink::new();
    assert_eq!(size, serialize(plan, value, &mut dry).expect("expected success"));

    let mut exact = vec![0u8; size];
    let written = serialize(plan, value, &mut SliceSink::new(&mut exact)).expect("expected success");
    assert_eq!(size, written);
    assert_eq!(buffer, exact);

    if size > 0 {
        let mut short = vec![0u8; size - 1];
        match serialize(plan, value, &mut SliceSink::new(&mut short)) {
            Err(CodecError {
                kind: CodecErrorKind::BufferTooSmall { needed, available },
                ..
            }) => {
                assert_eq!(available, size - 1);
                assert!(needed > available);
            }
            other => panic!("expected BufferTooSmall, got {:?}", other),
        }
    }

    let (decoded, read) = deserialize(plan, &buffer).expect("expected success");
    assert_eq!(size, read);
    assert_eq!(*value, decoded);

    buffer
}

/// Deserializes the input expecting an error.
fn decode_error(plan: PlanRef<'_>, input: &[u8]) -> CodecError {
    match deserialize(plan, input) {
        Ok((value, _)) => panic!("expected error, decoded {:?}", value),
        Err(err) => err,
    }
}
