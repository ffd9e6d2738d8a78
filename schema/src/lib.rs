//! Declarative schema model consumed by `alembic`.
//!
//! Values here describe types as an extractor found them:
//! members in declaration order and every serialization option
//! exactly as it was declared.
//! Nothing in this crate resolves or validates options.
#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

mod member;
mod name;
mod schema;
mod types;

pub use self::{
    member::{CollectionOptions, ElementKind, MemberKind, MemberSchema, PolymorphicOptions},
    name::Name,
    schema::{GenerationMode, SchemaSet, Scope, SerializerBinding, TypeSchema},
    types::{IntWidth, ValueType},
};
