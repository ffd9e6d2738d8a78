use alloc::vec::Vec;

use crate::{
    name::Name,
    types::{IntWidth, ValueType},
};

/// Declared member of a type, with all its serialization options.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberSchema {
    pub name: Name,

    /// Declared value type.
    /// For collections this is the element type,
    /// for polymorphic members this is the common base type.
    pub value_type: ValueType,

    pub kind: MemberKind,

    /// Ignored members are not part of the wire format.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ignored: bool,

    /// Optional members are preceded by a presence flag.
    #[cfg_attr(feature = "serde", serde(default))]
    pub optional: bool,

    /// Member-scope serializer binding: name of the codec to use.
    #[cfg_attr(feature = "serde", serde(default))]
    pub serializer: Option<Name>,
}

impl MemberSchema {
    pub fn new(name: impl Into<Name>, value_type: ValueType, kind: MemberKind) -> Self {
        MemberSchema {
            name: name.into(),
            value_type,
            kind,
            ignored: false,
            optional: false,
            serializer: None,
        }
    }

    pub fn primitive(name: impl Into<Name>, value_type: ValueType) -> Self {
        MemberSchema::new(name, value_type, MemberKind::Primitive)
    }

    pub fn nested(name: impl Into<Name>, ty: impl Into<Name>) -> Self {
        MemberSchema::new(name, ValueType::Named(ty.into()), MemberKind::NestedObject)
    }

    pub fn collection(
        name: impl Into<Name>,
        element_type: ValueType,
        options: CollectionOptions,
    ) -> Self {
        MemberSchema::new(name, element_type, MemberKind::Collection(options))
    }

    pub fn polymorphic(
        name: impl Into<Name>,
        base: impl Into<Name>,
        options: PolymorphicOptions,
    ) -> Self {
        MemberSchema::new(
            name,
            ValueType::Named(base.into()),
            MemberKind::PolymorphicScalar(options),
        )
    }

    /// Marks member as presence-flagged.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks member as excluded from serialization.
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Binds a codec to this member.
    #[must_use]
    pub fn with_serializer(mut self, codec: impl Into<Name>) -> Self {
        self.serializer = Some(codec.into());
        self
    }
}

/// How a member is composed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemberKind {
    Primitive,
    NestedObject,
    Collection(CollectionOptions),
    PolymorphicScalar(PolymorphicOptions),
}

/// How an element of a collection is composed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementKind {
    Primitive,
    NestedObject,
    PolymorphicElement(PolymorphicOptions),
}

/// Collection options as they were declared.
///
/// Every count source is kept as-is,
/// choosing exactly one of them is the job of the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionOptions {
    pub element: ElementKind,

    /// Element count known in advance. No count is written.
    #[cfg_attr(feature = "serde", serde(default))]
    pub fixed_count: Option<i64>,

    /// Sibling member that carries the element count.
    #[cfg_attr(feature = "serde", serde(default))]
    pub count_field: Option<Name>,

    /// Count written right before the elements.
    #[cfg_attr(feature = "serde", serde(default))]
    pub count_prefix: Option<IntWidth>,

    /// Elements run until the end of input.
    #[cfg_attr(feature = "serde", serde(default))]
    pub unbounded: bool,
}

impl CollectionOptions {
    pub fn new(element: ElementKind) -> Self {
        CollectionOptions {
            element,
            fixed_count: None,
            count_field: None,
            count_prefix: None,
            unbounded: false,
        }
    }

    #[must_use]
    pub fn with_fixed_count(mut self, count: i64) -> Self {
        self.fixed_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_count_field(mut self, field: impl Into<Name>) -> Self {
        self.count_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_count_prefix(mut self, width: IntWidth) -> Self {
        self.count_prefix = Some(width);
        self
    }

    #[must_use]
    pub fn with_unbounded(mut self) -> Self {
        self.unbounded = true;
        self
    }

    /// Number of count sources configured.
    pub fn count_sources(&self) -> usize {
        usize::from(self.fixed_count.is_some())
            + usize::from(self.count_field.is_some())
            + usize::from(self.count_prefix.is_some())
            + usize::from(self.unbounded)
    }
}

/// Polymorphism options as they were declared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolymorphicOptions {
    /// Explicit discriminator type.
    #[cfg_attr(feature = "serde", serde(default))]
    pub discriminator: Option<ValueType>,

    /// Sibling member that carries the discriminator.
    #[cfg_attr(feature = "serde", serde(default))]
    pub shared_field: Option<Name>,

    /// Each value is preceded by its own discriminator.
    #[cfg_attr(feature = "serde", serde(default))]
    pub per_element: bool,

    /// Discriminator to concrete type pairs, in declaration order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub options: Vec<(u64, Name)>,
}

impl PolymorphicOptions {
    pub fn new() -> Self {
        PolymorphicOptions::default()
    }

    #[must_use]
    pub fn option(mut self, discriminator: u64, ty: impl Into<Name>) -> Self {
        self.options.push((discriminator, ty.into()));
        self
    }

    #[must_use]
    pub fn with_discriminator(mut self, ty: ValueType) -> Self {
        self.discriminator = Some(ty);
        self
    }

    #[must_use]
    pub fn with_shared_field(mut self, field: impl Into<Name>) -> Self {
        self.shared_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_per_element(mut self) -> Self {
        self.per_element = true;
        self
    }
}
