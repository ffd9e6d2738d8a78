//! Dynamic values a codec plan is executed against.

use alloc::{string::String, vec::Vec};

use alembic_schema::Name;

/// Value of a member, an element or a whole record.
///
/// Signed integer and signed enum members decode into `Int`,
/// unsigned ones into `UInt`.
/// Either variant is accepted when serializing if it fits the width,
/// and `Int` and `UInt` holding the same number compare equal.
#[derive(Clone, Debug)]
pub enum Value {
    /// Missing value of a presence-flagged member.
    Absent,
    Bool(bool),
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Returns integer value as non-negative number.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt(value) => Some(value),
            Value::Int(value) => u64::try_from(value).ok(),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::UInt(value) => Some(i128::from(value)),
            Value::Int(value) => Some(i128::from(value)),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Name of the record type, used to find runtime type of polymorphic values.
    pub fn record_type(&self) -> Option<&Name> {
        self.as_record().map(Record::ty)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Int(a), Value::UInt(b)) | (Value::UInt(b), Value::Int(a)) => {
                u64::try_from(*a) == Ok(*b)
            }
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident$(($cast:ty))?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline(always)]
                fn from(value: $ty) -> Self {
                    Value::$variant(value $(as $cast)?)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int(i64),
    i16 => Int(i64),
    i32 => Int(i64),
    i64 => Int,
    u8 => UInt(u64),
    u16 => UInt(u64),
    u32 => UInt(u64),
    u64 => UInt,
    f32 => F32,
    f64 => F64,
    String => Str,
    Vec<u8> => Bytes,
    Vec<Value> => List,
    Record => Record,
}

impl From<&str> for Value {
    #[inline(always)]
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    #[inline]
    fn from(value: Option<T>) -> Self {
        match value {
            None => Value::Absent,
            Some(value) => value.into(),
        }
    }
}

/// Record of a schema type: its type name and member values in order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    ty: Name,
    fields: Vec<(Name, Value)>,
}

impl Record {
    pub fn new(ty: impl Into<Name>) -> Self {
        Record {
            ty: ty.into(),
            fields: Vec::new(),
        }
    }

    /// Sets a field, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<Name>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, replacing its previous value.
    pub fn set(&mut self, name: impl Into<Name>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub(crate) fn push(&mut self, name: Name, value: Value) {
        self.fields.push((name, value));
    }

    #[inline]
    pub fn ty(&self) -> &Name {
        &self.ty
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Iterates over fields in order.
    pub fn fields(&self) -> impl Iterator<Item = (&Name, &Value)> + '_ {
        self.fields.iter().map(|(name, value)| (name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_variants_compare_by_number() {
        assert_eq!(Value::Int(3), Value::UInt(3));
        assert_eq!(Value::UInt(3), Value::from(3i32));
        assert_ne!(Value::Int(-1), Value::UInt(u64::MAX));
        assert_ne!(Value::Int(1), Value::Bool(true));

        let signed = Record::new("T").with("n", 3);
        let unsigned = Record::new("T").with("n", 3u16);
        assert_eq!(signed, unsigned);
    }
}
