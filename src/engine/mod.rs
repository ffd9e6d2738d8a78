//! Execution of codec plans.
//!
//! Functions here hold no state besides the plan and the value,
//! and can be called concurrently with shared plans.

mod deserialize;
mod serialize;
mod size;

use alembic_schema::Name;

use crate::{
    codec::check_len,
    error::{CodecError, CodecErrorKind, Location},
    plan::{Derived, PlanRef, PlanStep, StepOp},
    resolve::{
        CollectionSpec, CountStrategy, DiscriminatorPlacement, ElementOp, PolymorphicSpec,
        TableEntry,
    },
    value::{Record, Value},
};

pub use self::{
    deserialize::deserialize,
    serialize::{serialize, serialize_to_vec},
    size::serialized_size,
};

/// Deepest nesting of records the engine descends into.
pub const MAX_DEPTH: usize = 128;

static ABSENT: Value = Value::Absent;

/// Failure inside a step.
/// Errors of nested records are already located.
enum Failure {
    Kind(CodecErrorKind),
    Located(CodecError),
}

impl From<CodecErrorKind> for Failure {
    #[inline(always)]
    fn from(kind: CodecErrorKind) -> Self {
        Failure::Kind(kind)
    }
}

impl From<CodecError> for Failure {
    #[inline(always)]
    fn from(error: CodecError) -> Self {
        Failure::Located(error)
    }
}

impl Failure {
    fn kind(&self) -> &CodecErrorKind {
        match self {
            Failure::Kind(kind) => kind,
            Failure::Located(error) => &error.kind,
        }
    }

    fn locate(self, ty: &Name, step: &PlanStep) -> CodecError {
        match self {
            Failure::Kind(kind) => CodecError::new(Location::of_member(ty, &step.name), kind),
            Failure::Located(error) => error,
        }
    }
}

/// Enters a nested record, failing past [`MAX_DEPTH`].
fn descend(plan: PlanRef<'_>, depth: usize) -> Result<usize, CodecError> {
    if depth >= MAX_DEPTH {
        return Err(CodecError::new(
            Location::of_type(plan.ty()),
            CodecErrorKind::DepthLimitExceeded(MAX_DEPTH),
        ));
    }
    Ok(depth + 1)
}

/// Checks that the value is a record of the plan's type.
fn expect_record<'v>(plan: PlanRef<'_>, value: &'v Value) -> Result<&'v Record, CodecError> {
    let kind = match value {
        Value::Record(record) if record.ty() == plan.ty() => return Ok(record),
        Value::Record(record) => CodecErrorKind::RecordMismatch {
            expected: plan.ty().clone(),
            found: record.ty().clone(),
        },
        Value::Absent => CodecErrorKind::NullNotAllowed,
        _ => CodecErrorKind::TypeMismatch("record"),
    };
    Err(CodecError::new(Location::of_type(plan.ty()), kind))
}

fn expect_list(value: &Value) -> Result<&[Value], CodecErrorKind> {
    value.as_list().ok_or(CodecErrorKind::TypeMismatch("list"))
}

/// Value of a member, missing members are absent.
fn field<'v>(record: &'v Record, name: &str) -> &'v Value {
    record.get(name).unwrap_or(&ABSENT)
}

/// Checks that the value is present unless the step is presence-flagged.
fn present(step: &PlanStep, value: &Value) -> Result<bool, CodecErrorKind> {
    match (value.is_absent(), step.optional) {
        (true, false) => Err(CodecErrorKind::NullNotAllowed),
        (absent, _) => Ok(!absent),
    }
}

/// Checks element count against the count strategy.
/// Returns width of the count prefix, if any.
fn check_count(count: &CountStrategy, len: usize) -> Result<Option<usize>, CodecErrorKind> {
    match *count {
        CountStrategy::FixedCount(expected) if expected != len => {
            Err(CodecErrorKind::CountMismatch {
                expected,
                actual: len,
            })
        }
        CountStrategy::PrefixedCount(width) => {
            check_len(width, len)?;
            Ok(Some(width.size()))
        }
        _ => Ok(None),
    }
}

/// Finds table entry of the runtime type of a polymorphic value.
fn option_entry<'p>(
    spec: &'p PolymorphicSpec,
    value: &Value,
) -> Result<&'p TableEntry, CodecErrorKind> {
    let ty = value
        .record_type()
        .ok_or(CodecErrorKind::TypeMismatch("record"))?;

    spec.table
        .by_type(ty)
        .ok_or_else(|| CodecErrorKind::UnmappedType(ty.clone()))
}

/// Width of the discriminator written before each value, if any.
fn prefix_width(spec: &PolymorphicSpec) -> Result<Option<usize>, CodecErrorKind> {
    match spec.placement {
        DiscriminatorPlacement::SharedField { .. } => Ok(None),
        DiscriminatorPlacement::PerElementPrefix => Ok(Some(spec.discriminator.size())),
        DiscriminatorPlacement::ImplicitFromFirstElement => {
            Err(CodecErrorKind::UnsupportedPlacement)
        }
    }
}

/// Checks that elements sharing one discriminator have one type.
fn check_shared_type(element: &ElementOp, elements: &[Value]) -> Result<(), CodecErrorKind> {
    let ElementOp::Polymorphic(PolymorphicSpec {
        placement: DiscriminatorPlacement::SharedField { .. },
        ..
    }) = element
    else {
        return Ok(());
    };

    let mut types = elements.iter().map(Value::record_type);
    let Some(Some(expected)) = types.next() else {
        return Ok(());
    };

    for found in types.flatten() {
        if found != expected {
            return Err(CodecErrorKind::MixedTypes {
                expected: expected.clone(),
                found: found.clone(),
            });
        }
    }
    Ok(())
}

/// Computes value of a derived step from the member it serves.
fn derived_value(
    plan: PlanRef<'_>,
    record: &Record,
    step: &PlanStep,
    derived: Derived,
) -> Result<Value, CodecErrorKind> {
    let target = &plan.steps()[derived.target()];
    let value = field(record, &target.name);

    match derived {
        Derived::Count { width, .. } => {
            let len = match value {
                Value::Absent => 0,
                value => expect_list(value)?.len(),
            };
            check_len(width, len)?;
            Ok(Value::UInt(len as u64))
        }
        Derived::Discriminator { .. } => {
            let (spec, runtime) = match &target.op {
                StepOp::Polymorphic(spec) => (spec, value.record_type()),
                StepOp::Collection(CollectionSpec {
                    element: ElementOp::Polymorphic(spec),
                    ..
                }) => (
                    spec,
                    value
                        .as_list()
                        .and_then(<[Value]>::first)
                        .and_then(Value::record_type),
                ),
                _ => return Err(CodecErrorKind::TypeMismatch("polymorphic member")),
            };

            match runtime {
                Some(ty) => spec
                    .table
                    .by_type(ty)
                    .map(|entry| Value::UInt(entry.discriminator))
                    .ok_or_else(|| CodecErrorKind::UnmappedType(ty.clone())),

                // Nothing to take the type from.
                None => match record.get(&step.name) {
                    Some(own) if !own.is_absent() => Ok(own.clone()),
                    _ => Ok(Value::UInt(
                        spec.table.first().map_or(0, |entry| entry.discriminator),
                    )),
                },
            }
        }
    }
}

/// Bits of a decoded discriminator.
fn raw_discriminator(value: &Value) -> Option<u64> {
    match *value {
        Value::UInt(raw) => Some(raw),
        Value::Int(raw) => Some(raw as u64),
        _ => None,
    }
}
