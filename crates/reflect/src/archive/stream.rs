//! Little-endian byte stream used by the binary archive
//!
//! A [`ByteStream`] is a growable buffer with a read cursor. Writes always
//! append; reads consume from the cursor. Lengths and counts are `u32`, strings
//! are a `u32` byte length followed by UTF-8.

use super::error::{ArchiveError, ArchiveResult};

/// Append-only writer and forward-only reader over a byte buffer
#[derive(Debug, Default, Clone)]
pub struct ByteStream {
    buf: Vec<u8>,
    pos: usize,
}

impl ByteStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing bytes for reading
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { buf: bytes, pos: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Read cursor position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // Writing

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.write_bytes(value.as_bytes());
    }

    /// Reserve a `u32` length slot, returning its offset for [`end_length`](Self::end_length)
    pub fn begin_length(&mut self) -> usize {
        let at = self.buf.len();
        self.write_u32(0);
        at
    }

    /// Patch the slot at `at` with the number of bytes written after it
    pub fn end_length(&mut self, at: usize) {
        let length = (self.buf.len() - at - 4) as u32;
        self.patch_u32(at, length);
    }

    /// Overwrite a previously written `u32`
    pub fn patch_u32(&mut self, at: usize, value: u32) {
        self.buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    // Reading

    pub fn read_array<const N: usize>(&mut self) -> ArchiveResult<[u8; N]> {
        let bytes = self.read_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_slice(&mut self, len: usize) -> ArchiveResult<&[u8]> {
        if self.remaining() < len {
            return Err(ArchiveError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..self.pos])
    }

    pub fn read_u8(&mut self) -> ArchiveResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> ArchiveResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> ArchiveResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> ArchiveResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> ArchiveResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_string(&mut self) -> ArchiveResult<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_slice(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ArchiveError::data_format(format!("Invalid UTF-8 in string: {}", e)))
    }

    /// Read a `u32` element count, rejecting counts the remaining bytes cannot hold
    pub fn read_count(&mut self, min_element_size: usize) -> ArchiveResult<usize> {
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_element_size.max(1)) > self.remaining() {
            return Err(ArchiveError::data_format(format!(
                "Element count {} exceeds the {} bytes remaining",
                count,
                self.remaining()
            )));
        }
        Ok(count)
    }

    pub fn skip(&mut self, len: usize) -> ArchiveResult<()> {
        self.read_slice(len).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut stream = ByteStream::new();
        stream.write_u16(0xFEFF);
        stream.write_string("Mesh");
        stream.write_i32(-1);

        let mut reader = ByteStream::from_bytes(stream.into_bytes());
        assert_eq!(reader.read_u16().unwrap(), 0xFEFF);
        assert_eq!(reader.read_string().unwrap(), "Mesh");
        assert_eq!(reader.read_i32().unwrap(), -1);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_length_patching() {
        let mut stream = ByteStream::new();
        let at = stream.begin_length();
        stream.write_u32(7);
        stream.write_u8(1);
        stream.end_length(at);

        let mut reader = ByteStream::from_bytes(stream.into_bytes());
        assert_eq!(reader.read_u32().unwrap(), 5);
    }

    #[test]
    fn test_short_read_is_eof() {
        let mut reader = ByteStream::from_bytes(vec![1, 2]);
        assert!(matches!(
            reader.read_u32(),
            Err(ArchiveError::UnexpectedEof {
                needed: 4,
                remaining: 2
            })
        ));
    }

    #[test]
    fn test_count_bounded_by_remaining() {
        let mut stream = ByteStream::new();
        stream.write_u32(1_000_000);
        let mut reader = ByteStream::from_bytes(stream.into_bytes());
        assert!(matches!(
            reader.read_count(1),
            Err(ArchiveError::DataFormat(_))
        ));
    }
}
