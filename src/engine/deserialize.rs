use alloc::vec::Vec;

use crate::{
    error::{CodecError, CodecErrorKind},
    plan::{PlanRef, PlanStep, StepOp},
    reader::Reader,
    resolve::{CollectionSpec, CountStrategy, DiscriminatorPlacement, ElementOp, PolymorphicSpec},
    value::{Record, Value},
};

use super::{descend, raw_discriminator, Failure};

/// Deserializes a value from the input.
/// Returns the value and number of bytes read.
///
/// Absent members are left out of decoded records.
pub fn deserialize(plan: PlanRef<'_>, input: &[u8]) -> Result<(Value, usize), CodecError> {
    let mut reader = Reader::new(input);
    let value = read_record(plan, &mut reader, 0)?;
    Ok((value, reader.position()))
}

fn read_record(
    plan: PlanRef<'_>,
    reader: &mut Reader<'_>,
    depth: usize,
) -> Result<Value, CodecError> {
    let depth = descend(plan, depth)?;
    let mut record = Record::new(plan.ty().clone());

    for step in plan.steps() {
        let value = read_step(plan, &record, step, reader, depth)
            .map_err(|f| f.locate(plan.ty(), step))?;
        if !value.is_absent() {
            record.push(step.name.clone(), value);
        }
    }
    Ok(Value::Record(record))
}

fn read_step(
    plan: PlanRef<'_>,
    record: &Record,
    step: &PlanStep,
    reader: &mut Reader<'_>,
    depth: usize,
) -> Result<Value, Failure> {
    if let StepOp::Derived(derived) = step.op {
        return Ok(reader.read_int(derived.width())?);
    }

    if step.optional && !reader.read_flag()? {
        return Ok(Value::Absent);
    }

    match &step.op {
        StepOp::Value(codec) => Ok(codec.read(reader)?),
        StepOp::Object(id) => Ok(read_record(plan.resolve(*id), reader, depth)?),
        StepOp::Polymorphic(spec) => read_polymorphic(plan, record, spec, reader, depth),
        StepOp::Collection(spec) => read_collection(plan, record, spec, reader, depth),
        StepOp::Derived(_) => Ok(Value::Absent),
    }
}

fn read_collection(
    plan: PlanRef<'_>,
    record: &Record,
    spec: &CollectionSpec,
    reader: &mut Reader<'_>,
    depth: usize,
) -> Result<Value, Failure> {
    let count = match &spec.count {
        CountStrategy::FixedCount(n) => Some(*n),
        CountStrategy::CountField { field, .. } => Some(decoded_count(record, field)?),
        CountStrategy::PrefixedCount(width) => Some(reader.read_len(*width)?),
        CountStrategy::Unbounded => None,
    };

    let elements = match count {
        Some(count) => {
            // Count comes from the input, do not trust it for allocation.
            let mut elements = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                elements.push(read_element(plan, record, &spec.element, reader, depth)?);
            }
            elements
        }
        None => {
            let mut elements = Vec::new();
            while !reader.is_empty() {
                let start = reader.position();
                match read_element(plan, record, &spec.element, reader, depth) {
                    // An element that reads nothing would repeat forever.
                    Ok(_) if reader.position() == start => {
                        return Err(CodecErrorKind::PartialElement(reader.remaining()).into());
                    }
                    Ok(element) => elements.push(element),
                    Err(failure) if truncated(&failure) => {
                        let left = reader.remaining() + (reader.position() - start);
                        return Err(CodecErrorKind::PartialElement(left).into());
                    }
                    Err(failure) => return Err(failure),
                }
            }
            elements
        }
    };

    Ok(Value::List(elements))
}

fn read_element(
    plan: PlanRef<'_>,
    record: &Record,
    element: &ElementOp,
    reader: &mut Reader<'_>,
    depth: usize,
) -> Result<Value, Failure> {
    match element {
        ElementOp::Value(codec) => Ok(codec.read(reader)?),
        ElementOp::Object(id) => Ok(read_record(plan.resolve(*id), reader, depth)?),
        ElementOp::Polymorphic(spec) => read_polymorphic(plan, record, spec, reader, depth),
    }
}

fn read_polymorphic(
    plan: PlanRef<'_>,
    record: &Record,
    spec: &PolymorphicSpec,
    reader: &mut Reader<'_>,
    depth: usize,
) -> Result<Value, Failure> {
    let discriminator = match &spec.placement {
        DiscriminatorPlacement::SharedField { field } => record
            .get(field)
            .and_then(raw_discriminator)
            .ok_or(CodecErrorKind::TypeMismatch("discriminator"))?,
        DiscriminatorPlacement::PerElementPrefix => reader.read_raw(spec.discriminator)?,
        DiscriminatorPlacement::ImplicitFromFirstElement => {
            return Err(CodecErrorKind::UnsupportedPlacement.into())
        }
    };

    let entry = spec
        .table
        .by_discriminator(discriminator)
        .ok_or(CodecErrorKind::UnknownDiscriminator(discriminator))?;

    Ok(read_record(plan.resolve(entry.plan), reader, depth)?)
}

/// Count of a collection from an already decoded count field.
fn decoded_count(record: &Record, field: &str) -> Result<usize, CodecErrorKind> {
    match record.get(field) {
        Some(Value::Int(count)) if *count < 0 => Err(CodecErrorKind::InvalidLength(*count)),
        Some(value) => value
            .as_u64()
            .and_then(|count| usize::try_from(count).ok())
            .ok_or(CodecErrorKind::InvalidLength(i64::MAX)),
        None => Err(CodecErrorKind::TypeMismatch("count")),
    }
}

fn truncated(failure: &Failure) -> bool {
    matches!(failure.kind(), CodecErrorKind::TruncatedInput { .. })
}
