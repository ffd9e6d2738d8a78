use alembic_schema::{CollectionOptions, IntWidth, MemberKind, Name, TypeSchema};

use crate::{
    codec::{Codec, DEFAULT_PREFIX},
    error::SchemaErrorKind,
    plan::PlanId,
    resolve::PolymorphicSpec,
};

/// How the number of elements of a collection is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CountStrategy {
    /// Count is known from the schema, nothing is written.
    FixedCount(usize),

    /// Count is carried by a preceding sibling member.
    CountField { field: Name, width: IntWidth },

    /// Count is written right before the elements.
    PrefixedCount(IntWidth),

    /// Elements continue until the input is exhausted.
    Unbounded,
}

/// Resolved collection: element operation and count strategy.
#[derive(Clone, Debug)]
pub struct CollectionSpec {
    pub element: ElementOp,
    pub count: CountStrategy,
}

/// How each element of a collection is written.
#[derive(Clone, Debug)]
pub enum ElementOp {
    Value(Codec),
    Object(PlanId),
    Polymorphic(PolymorphicSpec),
}

/// Picks the single count strategy of a collection declared
/// at `position` among the members of `enclosing`.
///
/// A collection without any count source gets a count prefix
/// of the default width.
pub fn resolve_count(
    options: &CollectionOptions,
    enclosing: &TypeSchema,
    position: usize,
) -> Result<CountStrategy, SchemaErrorKind> {
    let sources = options.count_sources();
    if sources > 1 {
        return Err(SchemaErrorKind::AmbiguousCountStrategy(sources));
    }

    if let Some(count) = options.fixed_count {
        return usize::try_from(count)
            .map(CountStrategy::FixedCount)
            .map_err(|_| SchemaErrorKind::InvalidFixedCount(count));
    }

    if let Some(field) = &options.count_field {
        let invalid = |reason| SchemaErrorKind::InvalidCountField {
            field: field.clone(),
            reason,
        };

        let (idx, member) = enclosing
            .find_member(field)
            .ok_or_else(|| invalid("does not exist"))?;

        if idx == position {
            return Err(invalid("refers to the collection itself"));
        }
        if idx > position {
            return Err(invalid("must precede the collection"));
        }
        if member.ignored {
            return Err(invalid("is ignored"));
        }
        if member.optional {
            return Err(invalid("is optional"));
        }
        if !matches!(member.kind, MemberKind::Primitive) {
            return Err(invalid("is not a primitive member"));
        }

        let width = member
            .value_type
            .integral()
            .ok_or_else(|| invalid("is not an integer or enum"))?;

        return Ok(CountStrategy::CountField {
            field: field.clone(),
            width,
        });
    }

    if let Some(width) = options.count_prefix {
        return Ok(CountStrategy::PrefixedCount(width));
    }

    if options.unbounded {
        return Ok(CountStrategy::Unbounded);
    }

    Ok(CountStrategy::PrefixedCount(DEFAULT_PREFIX))
}
