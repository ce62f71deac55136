//! Bounds-checked record reader.

use crate::error::{CodecError, CodecResult};

/// Size of a log word. Fixed record fields and padding are measured in words.
pub const WORD_SIZE: usize = 8;

/// Rounds `len` up to the next multiple of [`WORD_SIZE`].
///
/// Returns `None` if the result does not fit in a `u64`.
#[must_use]
pub const fn round_up_u64(len: u64) -> Option<u64> {
    match len.checked_add(WORD_SIZE as u64 - 1) {
        Some(v) => Some(v & !(WORD_SIZE as u64 - 1)),
        None => None,
    }
}

/// A cursor over a record buffer.
///
/// Every read checks the remaining length first and fails with
/// [`CodecError::Truncated`] instead of reading past the end. The cursor only
/// advances when a read succeeds, so after a sequence of reads
/// [`position`](Self::position) is exactly the number of bytes consumed.
///
/// All multi-byte values are decoded little-endian (host order).
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> RecordReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Returns the number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the offset of the cursor relative to the outermost buffer.
    ///
    /// Differs from [`position`](Self::position) only for readers produced by
    /// [`nested`](Self::nested); used for error reporting.
    pub fn absolute_position(&self) -> usize {
        self.base + self.pos
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns the unread bytes without consuming them.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns true if every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(CodecError::truncated(
                self.absolute_position(),
                len,
                available,
            ));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a `u16`.
    pub fn read_u16(&mut self) -> CodecResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a `u32`.
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a `u64`.
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        let bytes = self.take(8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(word))
    }

    /// Reads `N` consecutive `u64` words.
    pub fn read_words<const N: usize>(&mut self) -> CodecResult<[u64; N]> {
        self.ensure(N * 8)?;
        let mut words = [0u64; N];
        for word in &mut words {
            *word = self.read_u64()?;
        }
        Ok(words)
    }

    /// Reads a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        self.take(len)
    }

    /// Reads a raw byte run whose length comes from a 64-bit log field.
    pub fn read_bytes_u64(&mut self, len: u64) -> CodecResult<&'a [u8]> {
        let len = checked_len(len, 1, self.remaining())?;
        self.take(len)
    }

    /// Reads a NUL-terminated byte string and advances past the terminator.
    ///
    /// The returned slice excludes the terminator.
    pub fn read_cstr(&mut self) -> CodecResult<&'a [u8]> {
        let start = self.absolute_position();
        let rest = self.remaining_bytes();
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(CodecError::MissingTerminator { offset: start })?;
        let bytes = &rest[..len];
        self.pos += len + 1;
        Ok(bytes)
    }

    /// Reads a NUL-terminated string that must be UTF-8.
    pub fn read_utf8_cstr(&mut self) -> CodecResult<&'a str> {
        let start = self.absolute_position();
        let bytes = self.read_cstr()?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { offset: start })
    }

    /// Skips `len` bytes.
    pub fn skip(&mut self, len: usize) -> CodecResult<()> {
        self.take(len).map(|_| ())
    }

    /// Splits off the next `len` bytes as an independent reader and advances
    /// past them.
    ///
    /// Used for sub-structures whose extent is declared up front, so a
    /// malformed entry inside cannot consume bytes that belong to the next
    /// structure.
    pub fn nested(&mut self, len: u64) -> CodecResult<RecordReader<'a>> {
        let base = self.absolute_position();
        let len = checked_len(len, 1, self.remaining())?;
        let data = self.take(len)?;
        Ok(RecordReader { data, pos: 0, base })
    }

    /// Checks that `count` elements of `elem_size` bytes fit in the rest of
    /// the buffer and returns the count as a `usize`.
    ///
    /// Call before allocating for a logged count so a corrupt count cannot
    /// trigger a huge allocation.
    pub fn checked_count(&self, count: u64, elem_size: usize) -> CodecResult<usize> {
        let len = checked_len(count, elem_size, self.remaining())?;
        self.ensure(len)?;
        Ok(len / elem_size.max(1))
    }

    fn ensure(&self, len: usize) -> CodecResult<()> {
        let available = self.remaining();
        if len > available {
            return Err(CodecError::truncated(
                self.absolute_position(),
                len,
                available,
            ));
        }
        Ok(())
    }
}

/// Converts `count * elem_size` to a `usize`, failing if it overflows or
/// exceeds what any buffer could hold.
fn checked_len(count: u64, elem_size: usize, available: usize) -> CodecResult<usize> {
    let total = count
        .checked_mul(elem_size as u64)
        .ok_or(CodecError::size_limit(count, u64::MAX / elem_size.max(1) as u64))?;
    usize::try_from(total).map_err(|_| CodecError::size_limit(total, available as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fields() {
        let data = [
            0x01, 0x02, // u16
            0x03, 0x04, 0x05, 0x06, // u32
            0x07, 0, 0, 0, 0, 0, 0, 0x80, // u64
        ];
        let mut reader = RecordReader::new(&data);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
        assert_eq!(reader.read_u32().unwrap(), 0x0605_0403);
        assert_eq!(reader.read_u64().unwrap(), 0x8000_0000_0000_0007);
        assert!(reader.is_empty());
        assert_eq!(reader.position(), 14);
    }

    #[test]
    fn truncated_read_does_not_advance() {
        let data = [1u8, 2, 3];
        let mut reader = RecordReader::new(&data);
        let err = reader.read_u32().unwrap_err();
        assert_eq!(err, CodecError::truncated(0, 4, 3));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn cstr_consumes_terminator() {
        let data = b"foo\0bar\0";
        let mut reader = RecordReader::new(data);
        assert_eq!(reader.read_cstr().unwrap(), b"foo");
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_cstr().unwrap(), b"bar");
        assert!(reader.is_empty());
    }

    #[test]
    fn empty_cstr_is_one_byte() {
        let data = b"\0x\0";
        let mut reader = RecordReader::new(data);
        assert_eq!(reader.read_cstr().unwrap(), b"");
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn unterminated_cstr_is_rejected() {
        let data = b"abc";
        let mut reader = RecordReader::new(data);
        assert_eq!(
            reader.read_cstr().unwrap_err(),
            CodecError::MissingTerminator { offset: 0 }
        );
    }

    #[test]
    fn utf8_cstr_rejects_invalid_bytes() {
        let data = [0xff, 0xfe, 0x00];
        let mut reader = RecordReader::new(&data);
        assert_eq!(
            reader.read_utf8_cstr().unwrap_err(),
            CodecError::InvalidUtf8 { offset: 0 }
        );
    }

    #[test]
    fn nested_reader_is_bounded_and_reports_absolute_offsets() {
        let data = [0u8; 12];
        let mut reader = RecordReader::new(&data);
        reader.skip(2).unwrap();
        let mut inner = reader.nested(6).unwrap();
        assert_eq!(reader.position(), 8);
        assert_eq!(inner.read_u32().unwrap(), 0);
        let err = inner.read_u32().unwrap_err();
        assert_eq!(err, CodecError::truncated(6, 4, 2));
    }

    #[test]
    fn checked_count_rejects_oversized_counts() {
        let data = [0u8; 16];
        let reader = RecordReader::new(&data);
        assert_eq!(reader.checked_count(2, 8).unwrap(), 2);
        assert!(reader.checked_count(3, 8).is_err());
        assert!(reader.checked_count(u64::MAX, 8).is_err());
    }

    proptest::proptest! {
        #[test]
        fn position_tracks_consumed_bytes(
            data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
            ops in proptest::collection::vec(0u8..4, 0..16),
        ) {
            let mut reader = RecordReader::new(&data);
            let mut consumed = 0usize;
            for op in ops {
                let before = reader.position();
                let result = match op {
                    0 => reader.read_u16().map(|_| 2),
                    1 => reader.read_u32().map(|_| 4),
                    2 => reader.read_u64().map(|_| 8),
                    _ => reader.read_cstr().map(|s| s.len() + 1),
                };
                match result {
                    Ok(n) => consumed += n,
                    Err(_) => proptest::prop_assert_eq!(reader.position(), before),
                }
                proptest::prop_assert_eq!(reader.position(), consumed);
                proptest::prop_assert!(reader.position() <= data.len());
            }
        }
    }

    #[test]
    fn round_up_to_word() {
        assert_eq!(round_up_u64(0), Some(0));
        assert_eq!(round_up_u64(1), Some(8));
        assert_eq!(round_up_u64(8), Some(8));
        assert_eq!(round_up_u64(13), Some(16));
        assert_eq!(round_up_u64(u64::MAX), None);
    }
}
