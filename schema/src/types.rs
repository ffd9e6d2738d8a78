use core::fmt;

use crate::name::Name;

/// Fixed-size integer representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntWidth {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    /// Number of bits in the integer.
    pub const fn bits(self) -> u32 {
        match self {
            IntWidth::U8 | IntWidth::I8 => 8,
            IntWidth::U16 | IntWidth::I16 => 16,
            IntWidth::U32 | IntWidth::I32 => 32,
            IntWidth::U64 | IntWidth::I64 => 64,
        }
    }

    /// Number of bytes the integer occupies on the wire.
    pub const fn size(self) -> usize {
        (self.bits() / 8) as usize
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            IntWidth::I8 | IntWidth::I16 | IntWidth::I32 | IntWidth::I64
        )
    }

    /// Largest non-negative value representable with this width.
    pub const fn max_unsigned(self) -> u64 {
        match self {
            IntWidth::U8 => u8::MAX as u64,
            IntWidth::U16 => u16::MAX as u64,
            IntWidth::U32 => u32::MAX as u64,
            IntWidth::U64 => u64::MAX,
            IntWidth::I8 => i8::MAX as u64,
            IntWidth::I16 => i16::MAX as u64,
            IntWidth::I32 => i32::MAX as u64,
            IntWidth::I64 => i64::MAX as u64,
        }
    }

    /// Smallest unsigned width able to hold `max`.
    pub const fn smallest_unsigned(max: u64) -> IntWidth {
        match max {
            0..=0xFF => IntWidth::U8,
            0x100..=0xFFFF => IntWidth::U16,
            0x10000..=0xFFFF_FFFF => IntWidth::U32,
            _ => IntWidth::U64,
        }
    }
}

impl fmt::Display for IntWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_signed() { 'i' } else { 'u' };
        write!(f, "{}{}", sign, self.bits())
    }
}

/// Declared type of a member value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    Bool,
    Int(IntWidth),
    F32,
    F64,

    /// UTF-8 string.
    Str,

    /// Opaque byte blob.
    Bytes,

    /// Enumeration encoded as its integer representation.
    Enum { name: Name, repr: IntWidth },

    /// Another type described by a schema.
    Named(Name),
}

impl ValueType {
    pub fn named(name: impl Into<Name>) -> Self {
        ValueType::Named(name.into())
    }

    /// Returns integer representation of integral and enum types.
    pub fn integral(&self) -> Option<IntWidth> {
        match self {
            ValueType::Int(width) => Some(*width),
            ValueType::Enum { repr, .. } => Some(*repr),
            _ => None,
        }
    }

    /// Returns name of the schema type this value type refers to.
    pub fn type_name(&self) -> Option<&Name> {
        match self {
            ValueType::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("bool"),
            ValueType::Int(width) => fmt::Display::fmt(width, f),
            ValueType::F32 => f.write_str("f32"),
            ValueType::F64 => f.write_str("f64"),
            ValueType::Str => f.write_str("str"),
            ValueType::Bytes => f.write_str("bytes"),
            ValueType::Enum { name, repr } => write!(f, "{}({})", name, repr),
            ValueType::Named(name) => fmt::Display::fmt(name, f),
        }
    }
}
