use alloc::vec::Vec;

use crate::error::CodecErrorKind;

/// Byte sink used by the serializer.
/// Sinks can be extensible or fixed size.
pub trait Sink {
    /// Appends bytes to the sink.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecErrorKind>;

    /// Number of bytes written so far.
    fn written(&self) -> usize;
}

/// No-op sink that does not store anything.
/// Used to measure the size of serialized data.
#[derive(Clone, Copy, Debug, Default)]
pub struct DrySink {
    written: usize,
}

impl DrySink {
    pub const fn new() -> Self {
        DrySink { written: 0 }
    }
}

impl Sink for DrySink {
    #[inline(always)]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecErrorKind> {
        self.written += bytes.len();
        Ok(())
    }

    #[inline(always)]
    fn written(&self) -> usize {
        self.written
    }
}

/// Fixed sink over a byte slice.
/// Fails with `BufferTooSmall` when serialized data does not fit.
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceSink<'a> {
    #[inline(always)]
    pub fn new(buf: &'a mut [u8]) -> Self {
        SliceSink { buf, pos: 0 }
    }
}

impl Sink for SliceSink<'_> {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecErrorKind> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            return Err(CodecErrorKind::BufferTooSmall {
                needed: end,
                available: self.buf.len(),
            });
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    #[inline(always)]
    fn written(&self) -> usize {
        self.pos
    }
}

/// Extensible sink that appends to a vector.
/// Cannot fail except for OOM.
pub struct VecSink<'a> {
    buf: &'a mut Vec<u8>,
    start: usize,
}

impl<'a> VecSink<'a> {
    /// Creates a new sink that appends to the given vector.
    /// Bytes already in the vector are kept and not counted.
    #[inline(always)]
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        let start = buf.len();
        VecSink { buf, start }
    }
}

impl Sink for VecSink<'_> {
    #[inline(always)]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecErrorKind> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    #[inline(always)]
    fn written(&self) -> usize {
        self.buf.len() - self.start
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn test_slice_sink_too_small() {
        let mut buf = [0u8; 3];
        let mut sink = SliceSink::new(&mut buf);
        sink.write_bytes(&[1, 2]).unwrap();

        assert_eq!(
            sink.write_bytes(&[3, 4]),
            Err(CodecErrorKind::BufferTooSmall {
                needed: 4,
                available: 3
            })
        );
        assert_eq!(sink.written(), 2);
        assert_eq!(buf, [1, 2, 0]);
    }

    #[test]
    fn test_vec_sink_counts_own_bytes() {
        let mut buf = vec![9u8];
        let mut sink = VecSink::new(&mut buf);
        sink.write_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(sink.written(), 3);
        assert_eq!(buf, [9, 1, 2, 3]);
    }

    #[test]
    fn test_dry_sink() {
        let mut sink = DrySink::new();
        sink.write_bytes(&[0; 7]).unwrap();
        sink.write_bytes(&[]).unwrap();
        assert_eq!(sink.written(), 7);
    }
}
