use std::io;
use std::marker::PhantomData;

use super::*;

/// Builds one message by appending objects to a [`Buffer`].
///
/// Every `construct_*` call reserves a region, writes its header and default
/// payload, and returns a handle. Allocation may move the buffer, so no
/// address survives it: handles carry only offsets, and setters resolve the
/// address again on every call, taking the writer by `&mut`. An object's
/// offset never changes once its handle exists; pointing a field at it later
/// is always legal, including from several parents.
///
/// A writer is single-threaded and owns its buffer exclusively. Dropping it
/// releases heap capacity; with a file backing the file simply keeps its
/// last written content until the caller commits it.
pub struct Writer {
    buffer: Buffer,
}

impl Writer {
    pub fn new() -> Writer {
        Writer {
            buffer: Buffer::new(),
        }
    }

    pub fn with_backing(backing: Box<dyn Backing>) -> Writer {
        Writer {
            buffer: Buffer::with_backing(backing),
        }
    }

    /// Rewind for a fresh message, keeping the allocated capacity. A
    /// message built after `clear` is byte-identical to the same message
    /// built in a new writer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Construct a table with its schema's default body.
    ///
    /// The handle names the body start; fields referring to the table store
    /// the header offset, ten bytes lower.
    pub fn construct<S: TableSchema>(&mut self) -> TableHandle<S> {
        let body = S::DEFAULT;
        let at = self.buffer.expand(HEADER_SIZE + body.len());
        self.buffer.write_u32_at(at, S::MAGIC);
        self.buffer.write_u48_at(at + 4, body.len() as u64);
        self.buffer.write_at(at + HEADER_SIZE, body);
        TableHandle {
            offset: (at + HEADER_SIZE) as u64,
            _schema: PhantomData,
        }
    }

    /// Construct a text object: header, UTF-8 bytes, one trailing NUL.
    pub fn construct_text(&mut self, text: &str) -> TextHandle {
        let at = self.buffer.expand(HEADER_SIZE + text.len() + 1);
        self.buffer.write_u32_at(at, TEXT_MAGIC);
        self.buffer.write_u48_at(at + 4, text.len() as u64);
        self.buffer.write_at(at + HEADER_SIZE, text.as_bytes());
        self.buffer.fill(at + HEADER_SIZE + text.len(), 1, 0);
        TextHandle { offset: at as u64 }
    }

    /// Construct a bytes object by copying `bytes`.
    pub fn construct_bytes(&mut self, bytes: &[u8]) -> BytesHandle {
        let handle = self.reserve_bytes(bytes.len());
        self.buffer
            .write_at(handle.offset as usize + HEADER_SIZE, bytes);
        handle
    }

    /// Construct a zero-filled bytes object to be filled in afterwards
    /// through [`bytes_mut`](Writer::bytes_mut).
    pub fn reserve_bytes(&mut self, len: usize) -> BytesHandle {
        let at = self.buffer.expand(HEADER_SIZE + len);
        self.buffer.write_u32_at(at, BYTES_MAGIC);
        self.buffer.write_u48_at(at + 4, len as u64);
        self.buffer.fill(at + HEADER_SIZE, len, 0);
        BytesHandle { offset: at as u64 }
    }

    /// The payload of a bytes object, resolved afresh on every call so it
    /// stays usable after later allocations.
    pub fn bytes_mut(&mut self, handle: BytesHandle) -> &mut [u8] {
        let at = handle.offset as usize;
        let len = self.buffer.read_u48_at(at + 4) as usize;
        self.buffer.slice_mut(at + HEADER_SIZE, len)
    }

    /// Construct a list of `len` elements, every slot filled with the
    /// kind's default byte.
    pub fn construct_list<K: ListKind>(&mut self, len: u64) -> ListHandle<K> {
        let bytes = payload_bytes(K::STRIDE, len) as usize;
        let at = self.buffer.expand(HEADER_SIZE + bytes);
        self.buffer.write_u32_at(at, LIST_MAGIC);
        self.buffer.write_u48_at(at + 4, len);
        self.buffer.fill(at + HEADER_SIZE, bytes, K::FILL);
        ListHandle {
            offset: (at + HEADER_SIZE) as u64,
            len,
            _kind: PhantomData,
        }
    }

    /// Construct a direct list of `len` default-initialized element bodies
    /// laid out back-to-back.
    pub fn construct_direct_list<S: TableSchema>(&mut self, len: u64) -> DirectListHandle<S> {
        let width = S::DEFAULT.len();
        assert!(
            width <= MAX_ITEM_WIDTH as usize,
            "direct list item size {} exceeds {}",
            width,
            MAX_ITEM_WIDTH
        );
        let at = self
            .buffer
            .expand(HEADER_SIZE + DIRECT_SUB_HEADER_SIZE + len as usize * width);
        self.buffer.write_u32_at(at, DIRECT_LIST_MAGIC);
        self.buffer.write_u48_at(at + 4, len);
        self.buffer.write_u32_at(at + HEADER_SIZE, S::MAGIC);
        self.buffer
            .write_u32_at(at + HEADER_SIZE + 4, width as u32);
        let first = at + HEADER_SIZE + DIRECT_SUB_HEADER_SIZE;
        for index in 0..len as usize {
            self.buffer.write_at(first + index * width, S::DEFAULT);
        }
        DirectListHandle {
            offset: at as u64,
            len,
            _schema: PhantomData,
        }
    }

    /// Duplicate a list payload read from some message (possibly another
    /// reader's) into this writer. Only kinds whose payload holds values
    /// inline can be copied bytewise; reference kinds are copied
    /// element-wise by schema-level code.
    pub fn copy_list<K: InlineKind>(&mut self, src: &ListIn<'_, K>) -> ListHandle<K> {
        let handle = self.construct_list::<K>(src.len());
        self.buffer.write_at(handle.offset as usize, src.payload());
        handle
    }

    /// Stamp the root header with `root` and trim the buffer. The returned
    /// slice is the finished message; with a file backing it is also the
    /// file's content, truncated to exactly this length.
    pub fn finalize<S: TableSchema>(&mut self, root: TableHandle<S>) -> io::Result<&[u8]> {
        self.buffer.finalize(root.offset - HEADER_SIZE as u64)
    }

    pub(crate) fn mut_bytes(&mut self, at: usize, len: usize) -> &mut [u8] {
        self.buffer.slice_mut(at, len)
    }

    pub(crate) fn put_u16(&mut self, at: usize, value: u16) {
        self.buffer.write_u16_at(at, value);
    }

    pub(crate) fn put_u48(&mut self, at: usize, value: u64) {
        self.buffer.write_u48_at(at, value);
    }

    fn end(&self) -> u64 {
        self.buffer.size() as u64
    }
}

impl Default for Writer {
    fn default() -> Writer {
        Writer::new()
    }
}

/// Handle to a written text object; holds the header offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextHandle {
    pub(crate) offset: u64,
}

impl TextHandle {
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Handle to a written bytes object; holds the header offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytesHandle {
    pub(crate) offset: u64,
}

impl BytesHandle {
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Handle to a written table; holds the body start offset.
///
/// Setters take the field's byte offset inside the body, as emitted by the
/// schema compiler, and the writer the table was constructed in.
pub struct TableHandle<S: TableSchema> {
    pub(crate) offset: u64,
    _schema: PhantomData<S>,
}

impl<S: TableSchema> Clone for TableHandle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: TableSchema> Copy for TableHandle<S> {}

impl<S: TableSchema> TableHandle<S> {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn body_end(&self) -> u64 {
        self.offset + S::DEFAULT.len() as u64
    }

    fn at(&self, field: usize) -> usize {
        debug_assert!(field < S::DEFAULT.len());
        self.offset as usize + field
    }

    pub fn set_pod<P: Pod>(self, writer: &mut Writer, field: usize, value: P) {
        value.write(writer.mut_bytes(self.at(field), P::WIDTH));
    }

    pub fn set_bit(self, writer: &mut Writer, field: usize, bit: u8) {
        writer.mut_bytes(self.at(field), 1)[0] |= 1 << bit;
    }

    pub fn unset_bit(self, writer: &mut Writer, field: usize, bit: u8) {
        writer.mut_bytes(self.at(field), 1)[0] &= !(1 << bit);
    }

    pub fn set_enum<E: EnumSchema>(self, writer: &mut Writer, field: usize, value: E) {
        writer.mut_bytes(self.at(field), 1)[0] = value.to_byte();
    }

    pub fn set_table<S2: TableSchema>(
        self,
        writer: &mut Writer,
        field: usize,
        table: TableHandle<S2>,
    ) {
        writer.put_u48(self.at(field), table.offset - HEADER_SIZE as u64);
    }

    pub fn set_text(self, writer: &mut Writer, field: usize, text: TextHandle) {
        writer.put_u48(self.at(field), text.offset);
    }

    pub fn set_bytes(self, writer: &mut Writer, field: usize, bytes: BytesHandle) {
        writer.put_u48(self.at(field), bytes.offset);
    }

    pub fn set_list<K: ListKind>(self, writer: &mut Writer, field: usize, list: ListHandle<K>) {
        writer.put_u48(self.at(field), list.offset - HEADER_SIZE as u64);
    }

    pub fn set_direct_list<S2: TableSchema>(
        self,
        writer: &mut Writer,
        field: usize,
        list: DirectListHandle<S2>,
    ) {
        writer.put_u48(self.at(field), list.offset);
    }

    /// The pointer-union slot at `field` (8 bytes in the body).
    pub fn union_at(self, field: usize) -> UnionSlotOut {
        UnionSlotOut {
            offset: self.offset + field as u64,
        }
    }

    /// The inplace-union slot at `field` (tag plus payload size in the
    /// body; payload after the body).
    pub fn inplace_union_at(self, field: usize) -> InplaceUnionSlot<S> {
        InplaceUnionSlot {
            table: self,
            field,
        }
    }

    fn assert_tail(&self, writer: &Writer) {
        assert_eq!(
            writer.end(),
            self.body_end(),
            "inplace payload must directly follow its table; nothing may be \
             allocated in between"
        );
    }

    /// Append an inplace text payload after this table's body and record
    /// its length at `field`.
    ///
    /// The table must be the last allocation in the writer; any allocation
    /// between constructing the table and adding the payload trips an
    /// assertion.
    pub fn add_inplace_text(self, writer: &mut Writer, field: usize, text: &str) {
        self.assert_tail(writer);
        writer.put_u48(self.at(field), text.len() as u64);
        let at = writer.buffer.expand(text.len() + 1);
        writer.buffer.write_at(at, text.as_bytes());
        writer.buffer.fill(at + text.len(), 1, 0);
    }

    /// Append an inplace bytes payload; same tail rule as
    /// [`add_inplace_text`](TableHandle::add_inplace_text).
    pub fn add_inplace_bytes(self, writer: &mut Writer, field: usize, bytes: &[u8]) {
        self.assert_tail(writer);
        writer.put_u48(self.at(field), bytes.len() as u64);
        let at = writer.buffer.expand(bytes.len());
        writer.buffer.write_at(at, bytes);
    }

    /// Append an inplace list payload; same tail rule as
    /// [`add_inplace_text`](TableHandle::add_inplace_text).
    pub fn add_inplace_list<K: ListKind>(
        self,
        writer: &mut Writer,
        field: usize,
        len: u64,
    ) -> ListHandle<K> {
        self.assert_tail(writer);
        writer.put_u48(self.at(field), len);
        let bytes = payload_bytes(K::STRIDE, len) as usize;
        let at = writer.buffer.expand(bytes);
        writer.buffer.fill(at, bytes, K::FILL);
        ListHandle {
            offset: at as u64,
            len,
            _kind: PhantomData,
        }
    }

    /// Append an inplace table body; same tail rule as
    /// [`add_inplace_text`](TableHandle::add_inplace_text).
    pub fn add_inplace_table<S2: TableSchema>(
        self,
        writer: &mut Writer,
        field: usize,
    ) -> TableHandle<S2> {
        self.assert_tail(writer);
        writer.put_u48(self.at(field), S2::DEFAULT.len() as u64);
        let at = writer.buffer.expand(S2::DEFAULT.len());
        writer.buffer.write_at(at, S2::DEFAULT);
        TableHandle {
            offset: at as u64,
            _schema: PhantomData,
        }
    }
}

/// Handle to a written list; holds the payload start offset and length.
pub struct ListHandle<K: ListKind> {
    pub(crate) offset: u64,
    len: u64,
    _kind: PhantomData<K>,
}

impl<K: ListKind> Clone for ListHandle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: ListKind> Copy for ListHandle<K> {}

impl<K: ListKind> ListHandle<K> {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<K: ListWrite> ListHandle<K> {
    /// Store `value` at `index`. Writer-side indexes are programming
    /// errors when out of range and panic.
    pub fn set(self, writer: &mut Writer, index: u64, value: K::Value) {
        assert!(
            index < self.len,
            "index {} out of range for list of length {}",
            index,
            self.len
        );
        K::set(writer, self.offset as usize, index, value);
    }
}

impl<U> ListHandle<UnionKind<U>> {
    /// The union slot at `index` of a union list.
    pub fn slot(self, index: u64) -> UnionSlotOut {
        assert!(
            index < self.len,
            "index {} out of range for list of length {}",
            index,
            self.len
        );
        UnionSlotOut {
            offset: self.offset + index * 8,
        }
    }
}

/// Handle to a written direct list; holds the header offset.
pub struct DirectListHandle<S: TableSchema> {
    pub(crate) offset: u64,
    len: u64,
    _schema: PhantomData<S>,
}

impl<S: TableSchema> Clone for DirectListHandle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: TableSchema> Copy for DirectListHandle<S> {}

impl<S: TableSchema> DirectListHandle<S> {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The element body at `index`, addressable like any other table.
    pub fn at(self, index: u64) -> TableHandle<S> {
        assert!(
            index < self.len,
            "index {} out of range for list of length {}",
            index,
            self.len
        );
        let width = S::DEFAULT.len() as u64;
        TableHandle {
            offset: self.offset
                + (HEADER_SIZE + DIRECT_SUB_HEADER_SIZE) as u64
                + index * width,
            _schema: PhantomData,
        }
    }
}

/// An 8-byte pointer-union slot: 16-bit tag plus 48-bit target offset.
///
/// Arms are written with the tag the schema assigns them; tag zero is
/// reserved for "unset".
#[derive(Debug, Clone, Copy)]
pub struct UnionSlotOut {
    offset: u64,
}

impl UnionSlotOut {
    fn set(self, writer: &mut Writer, tag: u16, target: u64) {
        debug_assert!(tag != 0);
        writer.put_u16(self.offset as usize, tag);
        writer.put_u48(self.offset as usize + 2, target);
    }

    pub fn set_table<S: TableSchema>(self, writer: &mut Writer, tag: u16, table: TableHandle<S>) {
        self.set(writer, tag, table.offset - HEADER_SIZE as u64);
    }

    pub fn set_text(self, writer: &mut Writer, tag: u16, text: TextHandle) {
        self.set(writer, tag, text.offset);
    }

    pub fn set_bytes(self, writer: &mut Writer, tag: u16, bytes: BytesHandle) {
        self.set(writer, tag, bytes.offset);
    }

    pub fn set_list<K: ListKind>(self, writer: &mut Writer, tag: u16, list: ListHandle<K>) {
        self.set(writer, tag, list.offset - HEADER_SIZE as u64);
    }

    pub fn set_direct_list<S: TableSchema>(
        self,
        writer: &mut Writer,
        tag: u16,
        list: DirectListHandle<S>,
    ) {
        self.set(writer, tag, list.offset);
    }
}

/// An inplace-union slot: tag and payload size live in the enclosing
/// table's body, the payload directly after it.
///
/// Setting an arm requires the enclosing table to be the writer's last
/// allocation, and a table can hold at most one inplace payload.
pub struct InplaceUnionSlot<S: TableSchema> {
    table: TableHandle<S>,
    field: usize,
}

impl<S: TableSchema> Clone for InplaceUnionSlot<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: TableSchema> Copy for InplaceUnionSlot<S> {}

impl<S: TableSchema> InplaceUnionSlot<S> {
    fn set_tag(self, writer: &mut Writer, tag: u16) {
        debug_assert!(tag != 0);
        writer.put_u16(self.table.at(self.field), tag);
    }

    pub fn set_text(self, writer: &mut Writer, tag: u16, text: &str) {
        self.set_tag(writer, tag);
        self.table.add_inplace_text(writer, self.field + 2, text);
    }

    pub fn set_bytes(self, writer: &mut Writer, tag: u16, bytes: &[u8]) {
        self.set_tag(writer, tag);
        self.table.add_inplace_bytes(writer, self.field + 2, bytes);
    }

    pub fn set_list<K: ListKind>(self, writer: &mut Writer, tag: u16, len: u64) -> ListHandle<K> {
        self.set_tag(writer, tag);
        self.table.add_inplace_list(writer, self.field + 2, len)
    }

    pub fn set_table<S2: TableSchema>(self, writer: &mut Writer, tag: u16) -> TableHandle<S2> {
        self.set_tag(writer, tag);
        self.table.add_inplace_table(writer, self.field + 2)
    }
}
