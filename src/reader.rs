use alembic_schema::IntWidth;

use crate::{error::CodecErrorKind, value::Value};

/// Input cursor used by the deserializer.
pub struct Reader<'de> {
    input: &'de [u8],
    pos: usize,
}

impl<'de> Reader<'de> {
    #[inline(always)]
    pub const fn new(input: &'de [u8]) -> Self {
        Reader { input, pos: 0 }
    }

    /// Number of bytes consumed so far.
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pos == self.input.len()
    }

    /// Reads `len` bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'de [u8], CodecErrorKind> {
        if len > self.remaining() {
            return Err(CodecErrorKind::TruncatedInput {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    #[inline]
    pub fn read_byte_array<const N: usize>(&mut self) -> Result<[u8; N], CodecErrorKind> {
        let mut array = [0; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    #[inline]
    pub fn read_byte(&mut self) -> Result<u8, CodecErrorKind> {
        let [byte] = self.read_byte_array::<1>()?;
        Ok(byte)
    }

    /// Reads raw little-endian bits of an integer, zero-extended.
    #[inline]
    pub fn read_raw(&mut self, width: IntWidth) -> Result<u64, CodecErrorKind> {
        let mut bytes = [0u8; 8];
        bytes[..width.size()].copy_from_slice(self.read_bytes(width.size())?);
        Ok(u64::from_le_bytes(bytes))
    }

    /// Reads an integer, sign-extending signed widths.
    pub fn read_int(&mut self, width: IntWidth) -> Result<Value, CodecErrorKind> {
        let raw = self.read_raw(width)?;
        if width.is_signed() {
            let shift = 64 - width.bits();
            Ok(Value::Int(((raw << shift) as i64) >> shift))
        } else {
            Ok(Value::UInt(raw))
        }
    }

    /// Reads a length or count.
    pub fn read_len(&mut self, width: IntWidth) -> Result<usize, CodecErrorKind> {
        match self.read_int(width)? {
            Value::Int(len) if len < 0 => Err(CodecErrorKind::InvalidLength(len)),
            value => value
                .as_u64()
                .and_then(|len| usize::try_from(len).ok())
                .ok_or(CodecErrorKind::InvalidLength(i64::MAX)),
        }
    }

    /// Reads a one-byte flag, `0` or `1`.
    pub fn read_flag(&mut self) -> Result<bool, CodecErrorKind> {
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(CodecErrorKind::InvalidFlag(byte)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extension() {
        let mut reader = Reader::new(&[0xFF, 0xFE, 0xFF, 0x80]);
        assert_eq!(reader.read_int(IntWidth::I8).unwrap(), Value::Int(-1));
        assert_eq!(reader.read_int(IntWidth::I16).unwrap(), Value::Int(-2));
        assert_eq!(reader.read_int(IntWidth::U8).unwrap(), Value::UInt(0x80));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncated() {
        let mut reader = Reader::new(&[1, 2, 3]);
        assert_eq!(
            reader.read_raw(IntWidth::U32),
            Err(CodecErrorKind::TruncatedInput {
                needed: 4,
                remaining: 3
            })
        );
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_negative_length() {
        let mut reader = Reader::new(&[0xFF]);
        assert_eq!(
            reader.read_len(IntWidth::I8),
            Err(CodecErrorKind::InvalidLength(-1))
        );
    }

    #[test]
    fn test_flag() {
        let mut reader = Reader::new(&[0, 1, 2]);
        assert!(!reader.read_flag().unwrap());
        assert!(reader.read_flag().unwrap());
        assert_eq!(reader.read_flag(), Err(CodecErrorKind::InvalidFlag(2)));
    }
}
