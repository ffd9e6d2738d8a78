use alloc::{string::String, vec::Vec};
use core::fmt;

use alembic_schema::{IntWidth, Name, ValueType};

/// Type and member an error refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub ty: Name,
    pub member: Option<Name>,
}

impl Location {
    pub fn of_type(ty: &Name) -> Self {
        Location {
            ty: ty.clone(),
            member: None,
        }
    }

    pub fn of_member(ty: &Name, member: &Name) -> Self {
        Location {
            ty: ty.clone(),
            member: Some(member.clone()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            None => write!(f, "{}", self.ty),
            Some(member) => write!(f, "{}.{}", self.ty, member),
        }
    }
}

/// Problem found in a schema while resolving or validating it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaErrorKind {
    #[error("no codec for value type `{0}`")]
    UnresolvedCodec(ValueType),

    #[error("codec `{0}` is not registered")]
    UnregisteredCodec(Name),

    #[error("{0} count sources configured, exactly one is allowed")]
    AmbiguousCountStrategy(usize),

    #[error("count field `{field}` {reason}")]
    InvalidCountField { field: Name, reason: &'static str },

    #[error("fixed count {0} is negative")]
    InvalidFixedCount(i64),

    #[error("type `{0}` has no schema")]
    MissingSchemaMarker(Name),

    #[error("discriminator {0} is used more than once")]
    DuplicateDiscriminator(u64),

    #[error("type `{0}` appears more than once in the option table")]
    DuplicateOptionType(Name),

    #[error("discriminator field `{field}` {reason}")]
    InvalidDiscriminatorField { field: Name, reason: &'static str },

    #[error("discriminator type `{0}` is not an integer or enum")]
    InvalidDiscriminatorType(ValueType),

    #[error("discriminator {discriminator} does not fit into `{width}`")]
    DiscriminatorOutOfRange { discriminator: u64, width: IntWidth },

    #[error("both a shared discriminator field and per-element discriminators are configured")]
    AmbiguousPlacement,

    #[error("discriminator placement is implicit, configure a shared field or per-element discriminators")]
    UnsupportedPlacement,

    #[error("option table is empty")]
    EmptyOptionTable,

    #[error("unbounded collection must be the last member")]
    UnboundedNotLast,

    #[error("type `{0}` ends with an unbounded collection and can only be referenced by the last member")]
    OpenEndedReference(Name),

    #[error("unbounded collection of elements that occupy no bytes")]
    ZeroWidthElement,

    #[error("member `{0}` is declared more than once")]
    DuplicateMember(Name),

    #[error("binding of codec `{0}` with {1} scope is not allowed among type bindings")]
    MisplacedBinding(Name, &'static str),
}

/// Schema error with its location.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{location}: {kind}")]
pub struct SchemaError {
    pub location: Location,
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    pub fn new(location: Location, kind: SchemaErrorKind) -> Self {
        SchemaError { location, kind }
    }

    #[inline]
    pub fn kind(&self) -> &SchemaErrorKind {
        &self.kind
    }
}

/// Every schema error found in one pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaErrors(Vec<SchemaError>);

impl SchemaErrors {
    pub(crate) fn new(errors: Vec<SchemaError>) -> Self {
        debug_assert!(!errors.is_empty());
        SchemaErrors(errors)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, SchemaError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if any error has the given kind.
    pub fn contains(&self, kind: &SchemaErrorKind) -> bool {
        self.0.iter().any(|error| error.kind == *kind)
    }

    pub fn into_vec(self) -> Vec<SchemaError> {
        self.0
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} schema error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

impl core::error::Error for SchemaErrors {}

impl<'a> IntoIterator for &'a SchemaErrors {
    type Item = &'a SchemaError;
    type IntoIter = core::slice::Iter<'a, SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Failure while sizing, serializing or deserializing a value.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodecErrorKind {
    #[error("absent value for a member without presence flag")]
    NullNotAllowed,

    #[error("type `{0}` is not in the option table")]
    UnmappedType(Name),

    #[error("input truncated: {needed} bytes needed, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("unknown discriminator {0}")]
    UnknownDiscriminator(u64),

    #[error("{0} trailing bytes do not form a whole element")]
    PartialElement(usize),

    #[error("buffer too small: {needed} bytes needed, {available} available")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("value does not match, expected {0}")]
    TypeMismatch(&'static str),

    #[error("expected record of type `{expected}`, found `{found}`")]
    RecordMismatch { expected: Name, found: Name },

    #[error("elements sharing one discriminator must have one type, expected `{expected}`, found `{found}`")]
    MixedTypes { expected: Name, found: Name },

    #[error("collection has {actual} elements, {expected} expected")]
    CountMismatch { expected: usize, actual: usize },

    #[error("length {len} does not fit into `{width}`")]
    LengthOverflow { len: usize, width: IntWidth },

    #[error("invalid length {0}")]
    InvalidLength(i64),

    #[error("invalid flag byte {0}")]
    InvalidFlag(u8),

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("discriminator placement is not supported")]
    UnsupportedPlacement,

    #[error("records are nested deeper than {0} levels")]
    DepthLimitExceeded(usize),

    #[error("{0}")]
    Custom(String),
}

/// Codec error with the step that failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{location}: {kind}")]
pub struct CodecError {
    pub location: Location,
    pub kind: CodecErrorKind,
}

impl CodecError {
    pub fn new(location: Location, kind: CodecErrorKind) -> Self {
        CodecError { location, kind }
    }

    #[inline]
    pub fn kind(&self) -> &CodecErrorKind {
        &self.kind
    }
}
