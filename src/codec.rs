use alloc::{string::String, sync::Arc, vec::Vec};
use core::fmt;

use alembic_schema::{IntWidth, Name, ValueType};

use crate::{buffer::Sink, error::CodecErrorKind, reader::Reader, value::Value};

cfg_if::cfg_if! {
    if #[cfg(feature = "fixed8")] {
        /// Width of string and byte length prefixes and of default collection counts.
        pub const DEFAULT_PREFIX: IntWidth = IntWidth::U8;
    } else if #[cfg(feature = "fixed16")] {
        /// Width of string and byte length prefixes and of default collection counts.
        pub const DEFAULT_PREFIX: IntWidth = IntWidth::U16;
    } else if #[cfg(feature = "fixed64")] {
        /// Width of string and byte length prefixes and of default collection counts.
        pub const DEFAULT_PREFIX: IntWidth = IntWidth::U64;
    } else {
        /// Width of string and byte length prefixes and of default collection counts.
        pub const DEFAULT_PREFIX: IntWidth = IntWidth::U32;
    }
}

/// User-provided codec for one value type.
///
/// Implementations must be deterministic and `size` must return
/// exactly the number of bytes `write` produces.
pub trait ValueCodec: Send + Sync {
    fn size(&self, value: &Value) -> Result<usize, CodecErrorKind>;

    fn write(&self, value: &Value, sink: &mut dyn Sink) -> Result<(), CodecErrorKind>;

    fn read(&self, reader: &mut Reader<'_>) -> Result<Value, CodecErrorKind>;
}

/// Resolved codec of a value.
#[derive(Clone)]
pub enum Codec {
    /// One byte, `0` or `1`.
    Bool,
    Int(IntWidth),
    F32,
    F64,

    /// UTF-8 bytes preceded by their length.
    Str { prefix: IntWidth },

    /// Raw bytes preceded by their length.
    Bytes { prefix: IntWidth },

    /// Registered custom codec.
    Custom {
        name: Name,
        codec: Arc<dyn ValueCodec>,
    },
}

impl Codec {
    /// Returns built-in codec for well-known value types.
    pub fn builtin(value_type: &ValueType) -> Option<Codec> {
        match value_type {
            ValueType::Bool => Some(Codec::Bool),
            ValueType::Int(width) => Some(Codec::Int(*width)),
            ValueType::Enum { repr, .. } => Some(Codec::Int(*repr)),
            ValueType::F32 => Some(Codec::F32),
            ValueType::F64 => Some(Codec::F64),
            ValueType::Str => Some(Codec::Str {
                prefix: DEFAULT_PREFIX,
            }),
            ValueType::Bytes => Some(Codec::Bytes {
                prefix: DEFAULT_PREFIX,
            }),
            ValueType::Named(_) => None,
        }
    }

    pub fn custom(name: impl Into<Name>, codec: Arc<dyn ValueCodec>) -> Self {
        Codec::Custom {
            name: name.into(),
            codec,
        }
    }

    /// Returns true for custom codecs.
    pub fn is_custom(&self) -> bool {
        matches!(self, Codec::Custom { .. })
    }

    /// Name of the custom codec.
    pub fn custom_name(&self) -> Option<&Name> {
        match self {
            Codec::Custom { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn size(&self, value: &Value) -> Result<usize, CodecErrorKind> {
        match (self, value) {
            (Codec::Bool, Value::Bool(_)) => Ok(1),
            (Codec::Int(width), _) => {
                int_bytes(*width, value)?;
                Ok(width.size())
            }
            (Codec::F32, Value::F32(_)) => Ok(4),
            (Codec::F64, Value::F64(_)) => Ok(8),
            (Codec::Str { prefix }, Value::Str(s)) => {
                len_bytes(*prefix, s.len())?;
                Ok(prefix.size() + s.len())
            }
            (Codec::Bytes { prefix }, Value::Bytes(b)) => {
                len_bytes(*prefix, b.len())?;
                Ok(prefix.size() + b.len())
            }
            (Codec::Custom { codec, .. }, _) => codec.size(value),
            _ => Err(self.mismatch()),
        }
    }

    pub fn write(&self, value: &Value, sink: &mut dyn Sink) -> Result<(), CodecErrorKind> {
        match (self, value) {
            (Codec::Bool, Value::Bool(b)) => sink.write_bytes(&[u8::from(*b)]),
            (Codec::Int(width), _) => write_int(*width, value, sink),
            (Codec::F32, Value::F32(f)) => sink.write_bytes(&f.to_le_bytes()),
            (Codec::F64, Value::F64(f)) => sink.write_bytes(&f.to_le_bytes()),
            (Codec::Str { prefix }, Value::Str(s)) => {
                write_len(*prefix, s.len(), sink)?;
                sink.write_bytes(s.as_bytes())
            }
            (Codec::Bytes { prefix }, Value::Bytes(b)) => {
                write_len(*prefix, b.len(), sink)?;
                sink.write_bytes(b)
            }
            (Codec::Custom { codec, .. }, _) => codec.write(value, sink),
            _ => Err(self.mismatch()),
        }
    }

    pub fn read(&self, reader: &mut Reader<'_>) -> Result<Value, CodecErrorKind> {
        match self {
            Codec::Bool => reader.read_flag().map(Value::Bool),
            Codec::Int(width) => reader.read_int(*width),
            Codec::F32 => Ok(Value::F32(f32::from_le_bytes(reader.read_byte_array()?))),
            Codec::F64 => Ok(Value::F64(f64::from_le_bytes(reader.read_byte_array()?))),
            Codec::Str { prefix } => {
                let len = reader.read_len(*prefix)?;
                let bytes = reader.read_bytes(len)?;
                let s = core::str::from_utf8(bytes).map_err(|_| CodecErrorKind::InvalidUtf8)?;
                Ok(Value::Str(String::from(s)))
            }
            Codec::Bytes { prefix } => {
                let len = reader.read_len(*prefix)?;
                Ok(Value::Bytes(Vec::from(reader.read_bytes(len)?)))
            }
            Codec::Custom { codec, .. } => codec.read(reader),
        }
    }

    fn mismatch(&self) -> CodecErrorKind {
        CodecErrorKind::TypeMismatch(match self {
            Codec::Bool => "bool",
            Codec::Int(_) => "integer",
            Codec::F32 => "f32",
            Codec::F64 => "f64",
            Codec::Str { .. } => "string",
            Codec::Bytes { .. } => "bytes",
            Codec::Custom { .. } => "custom",
        })
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Bool => f.write_str("bool"),
            Codec::Int(width) => write!(f, "{}", width),
            Codec::F32 => f.write_str("f32"),
            Codec::F64 => f.write_str("f64"),
            Codec::Str { prefix } => write!(f, "str<{}>", prefix),
            Codec::Bytes { prefix } => write!(f, "bytes<{}>", prefix),
            Codec::Custom { name, .. } => write!(f, "custom `{}`", name),
        }
    }
}

/// Encodes integer value with the given width.
/// Both `Int` and `UInt` values are accepted if they fit.
fn int_bytes(width: IntWidth, value: &Value) -> Result<[u8; 8], CodecErrorKind> {
    let value = value
        .as_i128()
        .ok_or(CodecErrorKind::TypeMismatch("integer"))?;

    let bits = width.bits();
    let (min, max) = if width.is_signed() {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, (1i128 << bits) - 1)
    };

    if value < min || value > max {
        return Err(CodecErrorKind::TypeMismatch("integer in range"));
    }

    // Two's complement truncated to 64 bits, little-endian.
    Ok((value as u64).to_le_bytes())
}

pub(crate) fn write_int(
    width: IntWidth,
    value: &Value,
    sink: &mut dyn Sink,
) -> Result<(), CodecErrorKind> {
    let bytes = int_bytes(width, value)?;
    sink.write_bytes(&bytes[..width.size()])
}

fn len_bytes(width: IntWidth, len: usize) -> Result<[u8; 8], CodecErrorKind> {
    match u64::try_from(len) {
        Ok(n) if n <= width.max_unsigned() => Ok(n.to_le_bytes()),
        _ => Err(CodecErrorKind::LengthOverflow { len, width }),
    }
}

/// Writes a length or count with the given width.
pub(crate) fn write_len(
    width: IntWidth,
    len: usize,
    sink: &mut dyn Sink,
) -> Result<(), CodecErrorKind> {
    let bytes = len_bytes(width, len)?;
    sink.write_bytes(&bytes[..width.size()])
}

/// Checks that a length fits the width.
pub(crate) fn check_len(width: IntWidth, len: usize) -> Result<(), CodecErrorKind> {
    len_bytes(width, len).map(|_| ())
}
