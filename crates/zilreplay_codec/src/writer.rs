//! Record writer.

use bytes::{BufMut, BytesMut};

use crate::reader::WORD_SIZE;

/// Builds a record buffer field by field in host (little-endian) order.
///
/// The writer mirrors [`RecordReader`](crate::RecordReader): anything written
/// with `put_*` reads back with the matching `read_*`.
#[derive(Debug, Clone, Default)]
pub struct RecordWriter {
    buffer: BytesMut,
}

impl RecordWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends a `u16`.
    pub fn put_u16(&mut self, value: u16) {
        self.buffer.put_u16_le(value);
    }

    /// Appends a `u32`.
    pub fn put_u32(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    /// Appends a `u64`.
    pub fn put_u64(&mut self, value: u64) {
        self.buffer.put_u64_le(value);
    }

    /// Appends a run of `u64` words.
    pub fn put_words(&mut self, words: &[u64]) {
        for &word in words {
            self.buffer.put_u64_le(word);
        }
    }

    /// Appends raw bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
    }

    /// Appends `bytes` followed by a NUL terminator.
    pub fn put_cstr(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
        self.buffer.put_u8(0);
    }

    /// Appends zero bytes until the length is a multiple of the log word size.
    pub fn pad_to_word(&mut self) {
        let rem = self.buffer.len() % WORD_SIZE;
        if rem != 0 {
            self.buffer.put_bytes(0, WORD_SIZE - rem);
        }
    }

    /// Overwrites the `u64` at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + 8` is past the end of what has been written.
    pub fn patch_u64(&mut self, offset: usize, value: u64) {
        self.buffer[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Returns the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer and returns the buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordReader;

    #[test]
    fn written_fields_read_back() {
        let mut writer = RecordWriter::new();
        writer.put_u16(0xBEEF);
        writer.put_u32(17);
        writer.put_words(&[1, 2]);
        writer.put_cstr(b"name");
        let bytes = writer.into_vec();

        let mut reader = RecordReader::new(&bytes);
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_u32().unwrap(), 17);
        assert_eq!(reader.read_words::<2>().unwrap(), [1, 2]);
        assert_eq!(reader.read_cstr().unwrap(), b"name");
        assert!(reader.is_empty());
    }

    #[test]
    fn pad_to_word_aligns() {
        let mut writer = RecordWriter::new();
        writer.put_bytes(b"abc");
        writer.pad_to_word();
        assert_eq!(writer.len(), 8);
        writer.pad_to_word();
        assert_eq!(writer.len(), 8);
    }

    #[test]
    fn patch_overwrites_in_place() {
        let mut writer = RecordWriter::new();
        writer.put_u64(0);
        writer.put_u64(9);
        writer.patch_u64(0, 42);
        let mut reader = RecordReader::new(writer.as_bytes());
        assert_eq!(reader.read_u64().unwrap(), 42);
        assert_eq!(reader.read_u64().unwrap(), 9);
    }
}
