use bytes::{Buf, BufMut, BytesMut};

use crate::common::{Result, StrataError, INT_SIZE};

/// Page is a block-sized memory buffer with typed, bounds-checked accessors.
///
/// Integers are stored as 4-byte big-endian `i32`. Byte strings are stored
/// as a 4-byte big-endian length followed by the raw bytes; strings use the
/// same layout with UTF-8 contents.
///
/// | Field  | Offset     | Size |
/// |--------|------------|------|
/// | length | offset     | 4    |
/// | bytes  | offset + 4 | len  |
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    data: BytesMut,
}

impl Page {
    /// Creates a zero-filled page of the given block size.
    pub fn new(block_size: usize) -> Self {
        Self {
            data: BytesMut::zeroed(block_size),
        }
    }

    /// Creates a page holding a copy of the given bytes. The page size is
    /// the slice length.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: BytesMut::from(bytes),
        }
    }

    /// Returns the number of bytes needed to store a byte string of the
    /// given length.
    pub fn max_length(len: usize) -> usize {
        INT_SIZE + len
    }

    /// Returns the size of the page in bytes.
    pub fn block_size(&self) -> usize {
        self.data.len()
    }

    /// Reads the 4-byte integer stored at `offset`.
    pub fn get_int(&self, offset: usize) -> Result<i32> {
        self.check_bounds(offset, INT_SIZE)?;
        Ok((&self.data[offset..offset + INT_SIZE]).get_i32())
    }

    /// Stores a 4-byte integer at `offset`.
    pub fn set_int(&mut self, offset: usize, value: i32) -> Result<()> {
        self.check_bounds(offset, INT_SIZE)?;
        (&mut self.data[offset..offset + INT_SIZE]).put_i32(value);
        Ok(())
    }

    /// Reads the length-prefixed byte string stored at `offset`.
    pub fn get_bytes(&self, offset: usize) -> Result<&[u8]> {
        let len = self.get_int(offset)?;
        let len = usize::try_from(len).map_err(|_| StrataError::PageBounds {
            offset,
            len: INT_SIZE,
            block_size: self.block_size(),
        })?;
        let start = offset + INT_SIZE;
        self.check_bounds(start, len)?;
        Ok(&self.data[start..start + len])
    }

    /// Stores `bytes` at `offset` behind a 4-byte length prefix.
    /// Nothing is written when the string does not fit.
    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.check_bounds(offset, Self::max_length(bytes.len()))?;
        let len = i32::try_from(bytes.len()).map_err(|_| StrataError::PageBounds {
            offset,
            len: bytes.len(),
            block_size: self.block_size(),
        })?;
        let mut target = &mut self.data[offset..offset + Self::max_length(bytes.len())];
        target.put_i32(len);
        target.put_slice(bytes);
        Ok(())
    }

    /// Reads the UTF-8 string stored at `offset`.
    pub fn get_string(&self, offset: usize) -> Result<String> {
        let bytes = self.get_bytes(offset)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| StrataError::InvalidString { offset })
    }

    /// Stores a string at `offset` using the byte string layout.
    pub fn set_string(&mut self, offset: usize, value: &str) -> Result<()> {
        self.set_bytes(offset, value.as_bytes())
    }

    /// Returns the raw page contents.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Returns the raw page contents for block I/O.
    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero-fills the page.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    fn check_bounds(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(StrataError::PageBounds {
                offset,
                len,
                block_size: self.data.len(),
            }),
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("block_size", &self.data.len())
            .finish_non_exhaustive()
    }
}
