//! Little-endian wire reader and writer for the archive format.
//!
//! The archive is a flat sequence of primitive values. [`WireWriter`] appends
//! to a growable buffer; [`WireReader`] consumes a frozen buffer and reports
//! truncation as [`Error::BufferTooShort`] instead of panicking.

use crate::error::{Error, Result};
use crate::objref::ObjRef;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Archive header (8 bytes).
///
/// # Wire Format
/// ```text
/// +0: magic    (u32, 4 bytes)
/// +4: version  (u16, 2 bytes)
/// +6: flags    (u16, 2 bytes)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Format magic number.
    pub magic: u32,
    /// Format version.
    pub version: u16,
    /// Reserved flags.
    pub flags: u16,
}

impl ArchiveHeader {
    /// Encoded length of the header in bytes.
    pub const ENCODED_LENGTH: usize = 8;
    /// Magic number identifying an archive ("HDM1").
    pub const MAGIC: u32 = 0x4844_4D31;
    /// Current format version.
    pub const VERSION: u16 = 1;

    /// Creates the header for the current format version.
    #[must_use]
    pub const fn current() -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            flags: 0,
        }
    }

    /// Encodes the header.
    pub fn encode(&self, writer: &mut WireWriter) {
        writer.put_u32(self.magic);
        writer.put_u16(self.version);
        writer.put_u16(self.flags);
    }

    /// Decodes and validates a header.
    ///
    /// # Errors
    /// Returns an error if the buffer is truncated, the magic does not match
    /// or the version is newer than [`Self::VERSION`].
    pub fn decode(reader: &mut WireReader) -> Result<Self> {
        let magic = reader.get_u32()?;
        if magic != Self::MAGIC {
            return Err(Error::BadMagic {
                expected: Self::MAGIC,
                actual: magic,
            });
        }
        let version = reader.get_u16()?;
        if version > Self::VERSION {
            return Err(Error::UnsupportedVersion {
                version,
                supported: Self::VERSION,
            });
        }
        let flags = reader.get_u16()?;
        Ok(Self {
            magic,
            version,
            flags,
        })
    }
}

/// Appending writer over a growable byte buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    #[inline]
    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    #[inline]
    pub fn put_i16(&mut self, value: i16) {
        self.buf.put_i16_le(value);
    }

    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    #[inline]
    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    #[inline]
    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    #[inline]
    pub fn put_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn put_str(&mut self, value: &str) {
        self.put_u32(value.len() as u32);
        self.buf.put_slice(value.as_bytes());
    }

    /// Writes an object reference as a `(tag, index)` pair.
    ///
    /// `index` must already be the one-based wire index; zero encodes null.
    pub fn put_ref(&mut self, tag: u32, index: u32) {
        self.put_u32(tag);
        self.put_u32(index);
    }

    /// Writes the null reference.
    pub fn put_null_ref(&mut self) {
        self.put_ref(0, 0);
    }

    /// Consumes the writer and returns the frozen buffer.
    #[must_use]
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Bounds-checked reader over a frozen byte buffer.
#[derive(Debug, Clone)]
pub struct WireReader {
    buf: Bytes,
}

impl WireReader {
    /// Creates a reader over `buf`.
    #[must_use]
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    fn ensure(&self, required: usize) -> Result<()> {
        let available = self.buf.remaining();
        if available < required {
            return Err(Error::BufferTooShort {
                required,
                available,
            });
        }
        Ok(())
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64_le())
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// Returns `Error::InvalidUtf8` (carrying the declared length) if the
    /// bytes are not valid UTF-8.
    pub fn get_str(&mut self) -> Result<String> {
        let len = self.get_u32()?;
        self.ensure(len as usize)?;
        let raw = self.buf.split_to(len as usize);
        String::from_utf8(raw.to_vec()).map_err(|_| Error::InvalidUtf8 { id: len })
    }

    /// Reads a `u32` element count.
    ///
    /// # Errors
    /// Returns `Error::CountTooLarge` if `count` elements of at least
    /// `min_size` bytes each cannot fit in the unread input.
    pub fn get_count(&mut self, min_size: usize) -> Result<u32> {
        let count = self.get_u32()?;
        self.check_count(u64::from(count), min_size)?;
        Ok(count)
    }

    /// Checks that `count` elements of at least `min_size` bytes each fit in
    /// the unread input.
    ///
    /// # Errors
    /// Returns `Error::CountTooLarge` otherwise.
    pub fn check_count(&self, count: u64, min_size: usize) -> Result<()> {
        let available = self.buf.remaining();
        let required = count.saturating_mul(min_size as u64);
        if required > available as u64 {
            return Err(Error::CountTooLarge {
                count,
                min_size,
                available,
            });
        }
        Ok(())
    }

    /// Encoded size of a reference.
    pub const REF_LENGTH: usize = 8;

    /// Reads a `(tag, wire index)` pair and converts it to an [`ObjRef`].
    pub fn get_ref(&mut self) -> Result<Option<ObjRef>> {
        let tag = self.get_u32()?;
        let index = self.get_u32()?;
        Ok(ObjRef::from_wire(tag, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode() {
        let mut writer = WireWriter::new();
        ArchiveHeader::current().encode(&mut writer);
        assert_eq!(writer.len(), ArchiveHeader::ENCODED_LENGTH);

        let mut reader = WireReader::new(writer.finish());
        let header = ArchiveHeader::decode(&mut reader).unwrap();
        assert_eq!(header, ArchiveHeader::current());
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_header_bad_magic() {
        let mut writer = WireWriter::new();
        writer.put_u32(0xDEAD_BEEF);
        writer.put_u16(1);
        writer.put_u16(0);
        let mut reader = WireReader::new(writer.finish());
        assert!(matches!(
            ArchiveHeader::decode(&mut reader),
            Err(Error::BadMagic { actual: 0xDEAD_BEEF, .. })
        ));
    }

    #[test]
    fn test_header_future_version() {
        let mut writer = WireWriter::new();
        writer.put_u32(ArchiveHeader::MAGIC);
        writer.put_u16(ArchiveHeader::VERSION + 1);
        writer.put_u16(0);
        let mut reader = WireReader::new(writer.finish());
        assert!(matches!(
            ArchiveHeader::decode(&mut reader),
            Err(Error::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_primitives() {
        let mut writer = WireWriter::with_capacity(64);
        writer.put_bool(true);
        writer.put_i16(-3);
        writer.put_i32(-70_000);
        writer.put_u64(u64::MAX);
        writer.put_i64(i64::MIN);
        writer.put_str("top.u1");
        writer.put_ref(4, 2);
        writer.put_null_ref();

        let mut reader = WireReader::new(writer.finish());
        assert!(reader.get_bool().unwrap());
        assert_eq!(reader.get_i16().unwrap(), -3);
        assert_eq!(reader.get_i32().unwrap(), -70_000);
        assert_eq!(reader.get_u64().unwrap(), u64::MAX);
        assert_eq!(reader.get_i64().unwrap(), i64::MIN);
        assert_eq!(reader.get_str().unwrap(), "top.u1");
        assert_eq!(reader.get_ref().unwrap(), Some(ObjRef::new(4, 1)));
        assert_eq!(reader.get_ref().unwrap(), None);
    }

    #[test]
    fn test_truncated_read() {
        let mut reader = WireReader::new(Bytes::from_static(&[1, 2]));
        assert_eq!(
            reader.get_u32(),
            Err(Error::BufferTooShort {
                required: 4,
                available: 2
            })
        );
    }

    #[test]
    fn test_count_bounded_by_input() {
        let mut writer = WireWriter::new();
        writer.put_u32(2);
        writer.put_u64(0);
        writer.put_u64(0);
        writer.put_u32(u32::MAX);
        writer.put_u32(0);
        let mut reader = WireReader::new(writer.finish());

        assert_eq!(reader.get_count(WireReader::REF_LENGTH).unwrap(), 2);
        reader.get_u64().unwrap();
        reader.get_u64().unwrap();
        assert_eq!(
            reader.get_count(1),
            Err(Error::CountTooLarge {
                count: u64::from(u32::MAX),
                min_size: 1,
                available: 4
            })
        );
    }
}
