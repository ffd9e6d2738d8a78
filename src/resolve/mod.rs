//! Resolution of declared member options into concrete codecs,
//! count strategies and discriminator tables.

mod collection;
mod polymorphic;
mod serializer;

use alloc::sync::Arc;

use ahash::RandomState;
use alembic_schema::{Name, ValueType};
use hashbrown::HashMap;

use crate::codec::ValueCodec;

pub use self::{
    collection::{resolve_count, CollectionSpec, CountStrategy, ElementOp},
    polymorphic::{
        resolve_polymorphic, DiscriminatorPlacement, OptionTable, PolymorphicSpec, TableEntry,
    },
    serializer::{resolve_codec, Resolved},
};

/// Explicit resolution context shared by all types:
/// registry of named custom codecs and global default bindings.
#[derive(Clone, Default)]
pub struct GlobalBindings {
    codecs: HashMap<Name, Arc<dyn ValueCodec>, RandomState>,
    defaults: HashMap<ValueType, Name, RandomState>,
}

impl GlobalBindings {
    pub fn new() -> Self {
        GlobalBindings::default()
    }

    /// Registers a named codec so that bindings can refer to it.
    pub fn register(&mut self, name: impl Into<Name>, codec: Arc<dyn ValueCodec>) -> &mut Self {
        self.codecs.insert(name.into(), codec);
        self
    }

    /// Binds a registered codec to a value type at global scope.
    pub fn bind(&mut self, value_type: ValueType, codec: impl Into<Name>) -> &mut Self {
        self.defaults.insert(value_type, codec.into());
        self
    }

    /// Removes global binding of the value type.
    pub fn unbind(&mut self, value_type: &ValueType) -> &mut Self {
        self.defaults.remove(value_type);
        self
    }

    pub fn codec(&self, name: &str) -> Option<&Arc<dyn ValueCodec>> {
        self.codecs.get(name)
    }

    pub fn default_for(&self, value_type: &ValueType) -> Option<&Name> {
        self.defaults.get(value_type)
    }
}
