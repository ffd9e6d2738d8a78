use crate::{
    codec::Codec,
    error::CodecError,
    plan::{PlanRef, PlanStep, StepOp},
    resolve::{CollectionSpec, ElementOp, PolymorphicSpec},
    value::{Record, Value},
};

use super::{
    check_count, check_shared_type, derived_value, descend, expect_list, expect_record, field,
    option_entry, prefix_width, present, Failure,
};

/// Returns number of bytes `serialize` writes for the value.
pub fn serialized_size(plan: PlanRef<'_>, value: &Value) -> Result<usize, CodecError> {
    record_size(plan, value, 0)
}

fn record_size(plan: PlanRef<'_>, value: &Value, depth: usize) -> Result<usize, CodecError> {
    let depth = descend(plan, depth)?;
    let record = expect_record(plan, value)?;

    let mut size = 0;
    for step in plan.steps() {
        size += step_size(plan, record, step, depth).map_err(|f| f.locate(plan.ty(), step))?;
    }
    Ok(size)
}

fn step_size(
    plan: PlanRef<'_>,
    record: &Record,
    step: &PlanStep,
    depth: usize,
) -> Result<usize, Failure> {
    if let StepOp::Derived(derived) = step.op {
        let value = derived_value(plan, record, step, derived)?;
        return Ok(Codec::Int(derived.width()).size(&value)?);
    }

    let value = field(record, &step.name);
    let flag = usize::from(step.optional);
    if !present(step, value)? {
        return Ok(flag);
    }

    let size = match &step.op {
        StepOp::Value(codec) => codec.size(value)?,
        StepOp::Object(id) => record_size(plan.resolve(*id), value, depth)?,
        StepOp::Polymorphic(spec) => polymorphic_size(plan, spec, value, depth)?,
        StepOp::Collection(spec) => collection_size(plan, spec, value, depth)?,
        StepOp::Derived(_) => 0,
    };
    Ok(flag + size)
}

fn collection_size(
    plan: PlanRef<'_>,
    spec: &CollectionSpec,
    value: &Value,
    depth: usize,
) -> Result<usize, Failure> {
    let elements = expect_list(value)?;
    let prefix = check_count(&spec.count, elements.len())?;
    check_shared_type(&spec.element, elements)?;

    let mut size = prefix.unwrap_or(0);
    for element in elements {
        size += match &spec.element {
            ElementOp::Value(codec) => codec.size(element)?,
            ElementOp::Object(id) => record_size(plan.resolve(*id), element, depth)?,
            ElementOp::Polymorphic(spec) => polymorphic_size(plan, spec, element, depth)?,
        };
    }
    Ok(size)
}

fn polymorphic_size(
    plan: PlanRef<'_>,
    spec: &PolymorphicSpec,
    value: &Value,
    depth: usize,
) -> Result<usize, Failure> {
    let prefix = prefix_width(spec)?;
    let entry = option_entry(spec, value)?;
    Ok(prefix.unwrap_or(0) + record_size(plan.resolve(entry.plan), value, depth)?)
}
