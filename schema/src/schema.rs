use alloc::{collections::BTreeMap, vec::Vec};

use crate::{member::MemberSchema, name::Name, types::ValueType};

/// Whether the codec for a type is emitted together with the type
/// or as a standalone artifact.
/// Carried through to the plan, has no effect on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GenerationMode {
    #[default]
    Monolithic,
    Separate,
}

/// Scope a serializer binding was declared at.
/// Narrower scopes take precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scope {
    Member,
    Type,
    Global,
}

/// Assigns a named codec to a value type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerializerBinding {
    pub value_type: ValueType,
    pub codec: Name,
    pub scope: Scope,
}

impl SerializerBinding {
    pub fn new(value_type: ValueType, codec: impl Into<Name>, scope: Scope) -> Self {
        SerializerBinding {
            value_type,
            codec: codec.into(),
            scope,
        }
    }
}

/// Schema of one type: its members in wire order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeSchema {
    pub name: Name,

    /// Members in declaration order.
    pub members: Vec<MemberSchema>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: GenerationMode,

    /// Type-scope serializer bindings.
    /// Member and global bindings here are reported as schema errors.
    #[cfg_attr(feature = "serde", serde(default))]
    pub serializers: Vec<SerializerBinding>,
}

impl TypeSchema {
    pub fn new(name: impl Into<Name>) -> Self {
        TypeSchema {
            name: name.into(),
            members: Vec::new(),
            mode: GenerationMode::Monolithic,
            serializers: Vec::new(),
        }
    }

    #[must_use]
    pub fn member(mut self, member: MemberSchema) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Adds a type-scope serializer binding.
    #[must_use]
    pub fn with_serializer(mut self, value_type: ValueType, codec: impl Into<Name>) -> Self {
        self.serializers
            .push(SerializerBinding::new(value_type, codec, Scope::Type));
        self
    }

    pub fn find_member(&self, name: &str) -> Option<(usize, &MemberSchema)> {
        self.members
            .iter()
            .enumerate()
            .find(|(_, member)| member.name == name)
    }

    /// Returns codec bound to the value type at type scope.
    pub fn type_binding(&self, value_type: &ValueType) -> Option<&Name> {
        self.serializers
            .iter()
            .find(|binding| binding.scope == Scope::Type && binding.value_type == *value_type)
            .map(|binding| &binding.codec)
    }
}

/// Complete set of type schemas known to the resolver.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(from = "Vec<TypeSchema>", into = "Vec<TypeSchema>")
)]
pub struct SchemaSet {
    types: Vec<TypeSchema>,
    index: BTreeMap<Name, usize>,
}

impl SchemaSet {
    pub fn new() -> Self {
        SchemaSet::default()
    }

    /// Adds a schema, replacing earlier schema with the same name.
    pub fn insert(&mut self, schema: TypeSchema) {
        match self.index.get(&schema.name) {
            Some(&idx) => self.types[idx] = schema,
            None => {
                self.index.insert(schema.name.clone(), self.types.len());
                self.types.push(schema);
            }
        }
    }

    #[must_use]
    pub fn with(mut self, schema: TypeSchema) -> Self {
        self.insert(schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeSchema> {
        self.index.get(name).map(|&idx| &self.types[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterates over schemas in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeSchema> + '_ {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl From<Vec<TypeSchema>> for SchemaSet {
    fn from(types: Vec<TypeSchema>) -> Self {
        let mut set = SchemaSet::new();
        for schema in types {
            set.insert(schema);
        }
        set
    }
}

impl From<SchemaSet> for Vec<TypeSchema> {
    fn from(set: SchemaSet) -> Self {
        set.types
    }
}

impl FromIterator<TypeSchema> for SchemaSet {
    fn from_iter<I: IntoIterator<Item = TypeSchema>>(iter: I) -> Self {
        let mut set = SchemaSet::new();
        for schema in iter {
            set.insert(schema);
        }
        set
    }
}
