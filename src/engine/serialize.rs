use alloc::vec::Vec;

use crate::{
    buffer::{Sink, VecSink},
    codec::{write_int, write_len},
    error::CodecError,
    plan::{PlanRef, PlanStep, StepOp},
    resolve::{CollectionSpec, CountStrategy, ElementOp, PolymorphicSpec},
    value::{Record, Value},
};

use super::{
    check_count, check_shared_type, derived_value, descend, expect_list, expect_record, field,
    option_entry, prefix_width, present, serialized_size, Failure,
};

/// Serializes the value into the sink.
/// Returns number of bytes written.
///
/// Bytes written before an error are left in the sink.
pub fn serialize<S>(plan: PlanRef<'_>, value: &Value, sink: &mut S) -> Result<usize, CodecError>
where
    S: Sink,
{
    let start = sink.written();
    write_record(plan, value, sink, 0)?;
    Ok(sink.written() - start)
}

/// Serializes the value into a new vector.
pub fn serialize_to_vec(plan: PlanRef<'_>, value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(serialized_size(plan, value)?);
    serialize(plan, value, &mut VecSink::new(&mut buf))?;
    Ok(buf)
}

fn write_record(
    plan: PlanRef<'_>,
    value: &Value,
    sink: &mut dyn Sink,
    depth: usize,
) -> Result<(), CodecError> {
    let depth = descend(plan, depth)?;
    let record = expect_record(plan, value)?;

    for step in plan.steps() {
        write_step(plan, record, step, sink, depth).map_err(|f| f.locate(plan.ty(), step))?;
    }
    Ok(())
}

fn write_step(
    plan: PlanRef<'_>,
    record: &Record,
    step: &PlanStep,
    sink: &mut dyn Sink,
    depth: usize,
) -> Result<(), Failure> {
    if let StepOp::Derived(derived) = step.op {
        let value = derived_value(plan, record, step, derived)?;
        return Ok(write_int(derived.width(), &value, sink)?);
    }

    let value = field(record, &step.name);
    let is_present = present(step, value)?;
    if step.optional {
        sink.write_bytes(&[u8::from(is_present)])?;
    }
    if !is_present {
        return Ok(());
    }

    match &step.op {
        StepOp::Value(codec) => codec.write(value, sink)?,
        StepOp::Object(id) => write_record(plan.resolve(*id), value, sink, depth)?,
        StepOp::Polymorphic(spec) => write_polymorphic(plan, spec, value, sink, depth)?,
        StepOp::Collection(spec) => write_collection(plan, spec, value, sink, depth)?,
        StepOp::Derived(_) => {}
    }
    Ok(())
}

fn write_collection(
    plan: PlanRef<'_>,
    spec: &CollectionSpec,
    value: &Value,
    sink: &mut dyn Sink,
    depth: usize,
) -> Result<(), Failure> {
    let elements = expect_list(value)?;
    check_count(&spec.count, elements.len())?;
    check_shared_type(&spec.element, elements)?;

    if let CountStrategy::PrefixedCount(width) = spec.count {
        write_len(width, elements.len(), sink)?;
    }

    for element in elements {
        match &spec.element {
            ElementOp::Value(codec) => codec.write(element, sink)?,
            ElementOp::Object(id) => write_record(plan.resolve(*id), element, sink, depth)?,
            ElementOp::Polymorphic(spec) => write_polymorphic(plan, spec, element, sink, depth)?,
        }
    }
    Ok(())
}

fn write_polymorphic(
    plan: PlanRef<'_>,
    spec: &PolymorphicSpec,
    value: &Value,
    sink: &mut dyn Sink,
    depth: usize,
) -> Result<(), Failure> {
    let prefix = prefix_width(spec)?;
    let entry = option_entry(spec, value)?;

    if prefix.is_some() {
        write_int(spec.discriminator, &Value::UInt(entry.discriminator), sink)?;
    }
    write_record(plan.resolve(entry.plan), value, sink, depth)?;
    Ok(())
}
