use std::io;

use super::*;

const INITIAL_CAPACITY: usize = 256;

/// An appendable byte region with a monotonically increasing write cursor.
///
/// The first 10 bytes are reserved for the root header and count as present
/// from creation, so a fresh buffer has size 10. Storage is delegated to a
/// [`Backing`]; the default heap backing grows geometrically.
///
/// Addresses are unstable across [`expand`](Buffer::expand): growth may move
/// the whole region, so callers keep offsets, never pointers.
pub struct Buffer {
    backing: Box<dyn Backing>,
    size: usize,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer::with_backing(Box::new(HeapBacking::new()))
    }

    pub fn with_backing(backing: Box<dyn Backing>) -> Buffer {
        let mut buffer = Buffer {
            backing,
            size: HEADER_SIZE,
        };
        if buffer.backing.bytes().len() < INITIAL_CAPACITY {
            buffer.grow(INITIAL_CAPACITY);
        }
        buffer
    }

    /// Current logical size, including the reserved root header.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Rewind to the reserved root header without shrinking capacity. The
    /// buffer can then be reused for a fresh message.
    pub fn clear(&mut self) {
        self.size = HEADER_SIZE;
    }

    /// Reserve `n` bytes at the end, doubling capacity until they fit, and
    /// return the offset of the reserved region.
    ///
    /// A backing that fails to grow leaves the writer unusable; the failure
    /// is fatal and panics.
    pub fn expand(&mut self, n: usize) -> usize {
        let mut cap = self.backing.bytes().len().max(1);
        if self.size + n > cap {
            while self.size + n > cap {
                cap *= 2;
            }
            self.grow(cap);
        }
        let at = self.size;
        self.size += n;
        at
    }

    fn grow(&mut self, cap: usize) {
        if let Err(err) = self.backing.set_capacity(cap) {
            panic!("buffer backing failed to grow to {} bytes: {}", cap, err);
        }
    }

    /// Overwrite a region previously reserved by [`expand`](Buffer::expand).
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) {
        debug_assert!(offset + bytes.len() <= self.size);
        self.backing.bytes_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn write_u16_at(&mut self, offset: usize, value: u16) {
        LittleEndian::write_u16(self.slice_mut(offset, 2), value);
    }

    pub fn write_u32_at(&mut self, offset: usize, value: u32) {
        LittleEndian::write_u32(self.slice_mut(offset, 4), value);
    }

    pub fn write_u48_at(&mut self, offset: usize, value: u64) {
        write_u48(self.slice_mut(offset, 6), value);
    }

    pub fn fill(&mut self, offset: usize, len: usize, byte: u8) {
        for b in self.slice_mut(offset, len) {
            *b = byte;
        }
    }

    pub(crate) fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        debug_assert!(offset + len <= self.size);
        &mut self.backing.bytes_mut()[offset..offset + len]
    }

    pub(crate) fn read_u48_at(&self, offset: usize) -> u64 {
        read_u48(&self.backing.bytes()[offset..offset + 6])
    }

    /// Stamp the root header and trim the backing to the final size. The
    /// returned slice is the finished message.
    pub fn finalize(&mut self, root_body_offset: u64) -> io::Result<&[u8]> {
        self.write_u32_at(0, ROOT_MAGIC);
        self.write_u48_at(4, root_body_offset);
        self.backing.finalize(self.size)?;
        Ok(&self.backing.bytes()[..self.size])
    }
}

impl Default for Buffer {
    fn default() -> Buffer {
        Buffer::new()
    }
}
