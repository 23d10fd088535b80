use std::str;

use super::*;

/// A validated region inside a reader: payload start and declared size.
///
/// `start` indexes into the reader's byte slice and `size` counts the
/// object's logical units (bytes, code units or elements depending on the
/// kind that produced it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ptr {
    pub(crate) start: usize,
    pub(crate) size: u64,
}

impl Ptr {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A read-only view of one message.
///
/// The reader borrows the bytes for its lifetime and never mutates them.
/// Every accessor either returns a bounds-checked view or fails; on failure
/// no view is produced. Readers are cheap to copy and independent readers
/// over the same bytes may be used in parallel.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Reader<'a> {
        Reader { data }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Validate the root header and hand back a view of the root table.
    ///
    /// The offset bounds check runs before the table magic check, so a root
    /// offset past the end fails with [`Error::OutOfBounds`] rather than
    /// [`Error::Magic`]. A zero root offset is rejected as well; a
    /// well-formed message always has one.
    pub fn root<S: TableSchema>(&self) -> Result<TableIn<'a, S>> {
        if self.data.len() < HEADER_SIZE {
            return Err(Error::OutOfBounds);
        }
        let magic = LittleEndian::read_u32(&self.data[0..4]);
        if magic != ROOT_MAGIC {
            return Err(Error::Magic {
                got: magic,
                expected: ROOT_MAGIC,
            });
        }
        let offset = read_u48(&self.data[4..10]);
        if offset == 0 {
            return Err(Error::OutOfBounds);
        }
        let ptr = self
            .get_ptr(offset, S::MAGIC, 1, 0)?
            .ok_or(Error::OutOfBounds)?;
        Ok(TableIn::new(*self, ptr))
    }

    /// Validate an object header: bounds of the header itself, then the
    /// magic, then the declared size. Returns the payload start and size
    /// without checking the payload end. Offset zero is the canonical
    /// "absent" encoding and yields `None`.
    pub(crate) fn get_object(&self, offset: u64, magic: u32) -> Result<Option<(usize, u64)>> {
        if offset + HEADER_SIZE as u64 > self.data.len() as u64 {
            return Err(Error::OutOfBounds);
        }
        if offset == 0 {
            return Ok(None);
        }
        let at = offset as usize;
        let got = LittleEndian::read_u32(&self.data[at..at + 4]);
        if got != magic {
            return Err(Error::Magic {
                got,
                expected: magic,
            });
        }
        let size = read_u48(&self.data[at + 4..at + HEADER_SIZE]);
        Ok(Some((at + HEADER_SIZE, size)))
    }

    /// Full object validation: header checks plus the payload end check
    /// `offset + 10 + size * stride + extra <= len`. `extra` covers trailing
    /// bytes outside the counted payload, such as the NUL after a text.
    pub(crate) fn get_ptr(
        &self,
        offset: u64,
        magic: u32,
        stride: u64,
        extra: u64,
    ) -> Result<Option<Ptr>> {
        let Some((start, size)) = self.get_object(offset, magic)? else {
            return Ok(None);
        };
        let end = start as u64 + payload_bytes(stride, size) + extra;
        if end > self.data.len() as u64 {
            return Err(Error::OutOfBounds);
        }
        Ok(Some(Ptr { start, size }))
    }

    /// Bounds check for an object whose bytes lie inside a parent and carry
    /// no header of their own.
    pub(crate) fn get_ptr_inplace(
        &self,
        start: usize,
        size: u64,
        stride: u64,
        extra: u64,
    ) -> Result<Ptr> {
        let end = start as u64 + payload_bytes(stride, size) + extra;
        if end > self.data.len() as u64 {
            return Err(Error::OutOfBounds);
        }
        Ok(Ptr { start, size })
    }

    pub(crate) fn validate_text(&self, ptr: Ptr) -> Result<()> {
        if self.data[ptr.start + ptr.size as usize] != 0 {
            return Err(Error::InvalidText);
        }
        Ok(())
    }

    pub(crate) fn text(&self, ptr: Ptr) -> Result<&'a str> {
        self.validate_text(ptr)?;
        str::from_utf8(&self.data[ptr.start..ptr.start + ptr.size as usize])
            .map_err(|_| Error::InvalidText)
    }

    pub(crate) fn bytes(&self, ptr: Ptr) -> &'a [u8] {
        &self.data[ptr.start..ptr.start + ptr.size as usize]
    }

    /// Text object at `offset`; `None` when the offset is zero.
    pub fn get_text(&self, offset: u64) -> Result<Option<&'a str>> {
        let Some(ptr) = self.get_ptr(offset, TEXT_MAGIC, 1, 1)? else {
            return Ok(None);
        };
        self.text(ptr).map(Some)
    }

    /// Bytes object at `offset`; `None` when the offset is zero.
    pub fn get_bytes(&self, offset: u64) -> Result<Option<&'a [u8]>> {
        let Some(ptr) = self.get_ptr(offset, BYTES_MAGIC, 1, 0)? else {
            return Ok(None);
        };
        Ok(Some(self.bytes(ptr)))
    }

    /// Table object at `offset`; `None` when the offset is zero.
    pub fn get_table<S: TableSchema>(&self, offset: u64) -> Result<Option<TableIn<'a, S>>> {
        let Some(ptr) = self.get_ptr(offset, S::MAGIC, 1, 0)? else {
            return Ok(None);
        };
        Ok(Some(TableIn::new(*self, ptr)))
    }

    /// List object at `offset`; `None` when the offset is zero.
    pub fn get_list<K: ListKind>(&self, offset: u64) -> Result<Option<ListIn<'a, K>>> {
        let Some(ptr) = self.get_ptr(offset, LIST_MAGIC, K::STRIDE, 0)? else {
            return Ok(None);
        };
        Ok(Some(ListIn::new(*self, ptr)))
    }

    /// Direct list at `offset`; `None` when the offset is zero.
    pub fn get_direct_list<S: TableSchema>(
        &self,
        offset: u64,
    ) -> Result<Option<DirectListIn<'a, S>>> {
        DirectListIn::get(*self, offset)
    }

    /// Headerless text laid out inside a parent object.
    pub fn get_text_inplace(&self, start: usize, size: u64) -> Result<&'a str> {
        let ptr = self.get_ptr_inplace(start, size, 1, 1)?;
        self.text(ptr)
    }

    /// Headerless bytes laid out inside a parent object.
    pub fn get_bytes_inplace(&self, start: usize, size: u64) -> Result<&'a [u8]> {
        let ptr = self.get_ptr_inplace(start, size, 1, 0)?;
        Ok(self.bytes(ptr))
    }

    /// Headerless table body laid out inside a parent object.
    pub fn get_table_inplace<S: TableSchema>(
        &self,
        start: usize,
        size: u64,
    ) -> Result<TableIn<'a, S>> {
        let ptr = self.get_ptr_inplace(start, size, 1, 0)?;
        Ok(TableIn::new(*self, ptr))
    }

    /// Headerless list payload laid out inside a parent object.
    pub fn get_list_inplace<K: ListKind>(&self, start: usize, size: u64) -> Result<ListIn<'a, K>> {
        let ptr = self.get_ptr_inplace(start, size, K::STRIDE, 0)?;
        Ok(ListIn::new(*self, ptr))
    }
}
