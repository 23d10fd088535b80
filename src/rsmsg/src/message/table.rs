use std::marker::PhantomData;

use super::*;

/// Read view of one table body.
///
/// Field accessors take the byte offset of the field inside the body, as
/// emitted by the schema compiler. A field that lies past the declared body
/// size reads as its default (zero for pods, unset for everything optional),
/// so readers built against an older schema keep working on messages from a
/// newer writer.
pub struct TableIn<'a, S: TableSchema> {
    reader: Reader<'a>,
    start: usize,
    size: u64,
    _schema: PhantomData<S>,
}

impl<'a, S: TableSchema> Clone for TableIn<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: TableSchema> Copy for TableIn<'a, S> {}

impl<'a, S: TableSchema> std::fmt::Debug for TableIn<'a, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableIn")
            .field("start", &self.start)
            .field("size", &self.size)
            .finish()
    }
}

impl<'a, S: TableSchema> TableIn<'a, S> {
    pub(crate) fn new(reader: Reader<'a>, ptr: Ptr) -> TableIn<'a, S> {
        TableIn {
            reader,
            start: ptr.start,
            size: ptr.size,
            _schema: PhantomData,
        }
    }

    /// Declared body size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The raw body bytes.
    pub fn body(&self) -> &'a [u8] {
        &self.reader.data()[self.start..self.start + self.size as usize]
    }

    fn field(&self, offset: usize, width: usize) -> Option<&'a [u8]> {
        if (offset + width) as u64 > self.size {
            return None;
        }
        let at = self.start + offset;
        Some(&self.reader.data()[at..at + width])
    }

    fn offset_field(&self, offset: usize) -> u64 {
        match self.field(offset, 6) {
            Some(buf) => read_u48(buf),
            None => 0,
        }
    }

    fn body_end(&self) -> usize {
        self.start + self.size as usize
    }

    pub fn get_pod<P: Pod>(&self, offset: usize) -> P {
        match self.field(offset, P::WIDTH) {
            Some(buf) => P::read(buf),
            None => P::read(&[0u8; 8][..P::WIDTH]),
        }
    }

    /// Pod field with a schema-supplied default for bodies too short to
    /// contain it.
    pub fn get_pod_default<P: Pod>(&self, offset: usize, default: P) -> P {
        match self.field(offset, P::WIDTH) {
            Some(buf) => P::read(buf),
            None => default,
        }
    }

    pub fn get_bit(&self, offset: usize, bit: u8, default: bool) -> bool {
        match self.field(offset, 1) {
            Some(buf) => buf[0] & (1 << bit) != 0,
            None => default,
        }
    }

    pub fn get_enum<E: EnumSchema>(&self, offset: usize) -> Option<E> {
        let byte = match self.field(offset, 1) {
            Some(buf) => buf[0],
            None => 0xFF,
        };
        if byte >= E::COUNT {
            return None;
        }
        Some(E::from_byte(byte))
    }

    pub fn get_text(&self, offset: usize) -> Result<Option<&'a str>> {
        self.reader.get_text(self.offset_field(offset))
    }

    pub fn get_bytes(&self, offset: usize) -> Result<Option<&'a [u8]>> {
        self.reader.get_bytes(self.offset_field(offset))
    }

    pub fn get_table<S2: TableSchema>(&self, offset: usize) -> Result<Option<TableIn<'a, S2>>> {
        self.reader.get_table(self.offset_field(offset))
    }

    pub fn get_list<K: ListKind>(&self, offset: usize) -> Result<Option<ListIn<'a, K>>> {
        self.reader.get_list(self.offset_field(offset))
    }

    pub fn get_direct_list<S2: TableSchema>(
        &self,
        offset: usize,
    ) -> Result<Option<DirectListIn<'a, S2>>> {
        self.reader.get_direct_list(self.offset_field(offset))
    }

    /// Pointer union slot: 16-bit tag plus 48-bit offset. Tag zero or
    /// offset zero reads as unset.
    pub fn get_union<U: UnionSchema<'a>>(&self, offset: usize) -> Result<Option<U::In>> {
        let Some(slot) = self.field(offset, 8) else {
            return Ok(None);
        };
        let tag = LittleEndian::read_u16(&slot[0..2]);
        let target = read_u48(&slot[2..8]);
        if tag == 0 || target == 0 {
            return Ok(None);
        }
        U::read_at(self.reader, tag, target).map(Some)
    }

    /// Inplace union slot: 16-bit tag plus 48-bit payload size, the payload
    /// itself lying immediately after this table's body.
    pub fn get_union_inplace<U: UnionSchema<'a>>(&self, offset: usize) -> Result<Option<U::In>> {
        let Some(slot) = self.field(offset, 8) else {
            return Ok(None);
        };
        let tag = LittleEndian::read_u16(&slot[0..2]);
        if tag == 0 {
            return Ok(None);
        }
        let size = read_u48(&slot[2..8]);
        U::read_inplace(self.reader, tag, self.body_end(), size).map(Some)
    }

    /// Inplace text whose 48-bit length sits at `offset` in the body.
    pub fn get_inplace_text(&self, offset: usize) -> Result<&'a str> {
        self.reader
            .get_text_inplace(self.body_end(), self.offset_field(offset))
    }

    pub fn get_inplace_bytes(&self, offset: usize) -> Result<&'a [u8]> {
        self.reader
            .get_bytes_inplace(self.body_end(), self.offset_field(offset))
    }

    pub fn get_inplace_list<K: ListKind>(&self, offset: usize) -> Result<ListIn<'a, K>> {
        self.reader
            .get_list_inplace(self.body_end(), self.offset_field(offset))
    }

    pub fn get_inplace_table<S2: TableSchema>(&self, offset: usize) -> Result<TableIn<'a, S2>> {
        self.reader
            .get_table_inplace(self.body_end(), self.offset_field(offset))
    }
}
