//!
//! Alembic turns declarative type schemas into byte-exact codec plans
//! and executes them to size, write and read values.
//!
//! Schemas come from the [`schema`] crate. [`PlanBuilder`] resolves codecs,
//! collection count strategies and polymorphic option tables,
//! validates the result and freezes it into [`Plans`].
//! Plans are then used with [`serialize`], [`deserialize`]
//! and [`serialized_size`].
//!
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod buffer;
mod builder;
mod codec;
mod engine;
mod error;
mod plan;
mod reader;
mod resolve;
mod validate;
mod value;

#[cfg(feature = "std")]
mod cache;

pub use alembic_schema as schema;
pub use alembic_schema::{
    CollectionOptions, ElementKind, GenerationMode, IntWidth, MemberKind, MemberSchema, Name,
    PolymorphicOptions, SchemaSet, Scope, SerializerBinding, TypeSchema, ValueType,
};

pub use self::{
    buffer::{DrySink, SliceSink, Sink, VecSink},
    builder::PlanBuilder,
    codec::{Codec, ValueCodec, DEFAULT_PREFIX},
    engine::{deserialize, serialize, serialize_to_vec, serialized_size, MAX_DEPTH},
    error::{
        CodecError, CodecErrorKind, Location, SchemaError, SchemaErrorKind, SchemaErrors,
    },
    plan::{CodecPlan, Derived, PlanId, PlanRef, PlanStep, Plans, StepOp},
    reader::Reader,
    resolve::{
        resolve_codec, resolve_count, resolve_polymorphic, CollectionSpec, CountStrategy,
        DiscriminatorPlacement, ElementOp, GlobalBindings, OptionTable, PolymorphicSpec, Resolved,
        TableEntry,
    },
    validate::Validator,
    value::{Record, Value},
};

#[cfg(feature = "std")]
pub use self::cache::PlanCache;

/// Builds plans of every type in the schema set.
pub fn build_plans(schemas: &SchemaSet, globals: &GlobalBindings) -> Result<Plans, SchemaErrors> {
    let mut builder = PlanBuilder::new(schemas, globals);
    builder.build_all();
    builder.finish()
}

#[cfg(test)]
mod tests;
