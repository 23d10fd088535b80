//! Inplace objects: payloads laid out directly after their table's body,
//! and the tail rule the writer enforces while emitting them.

use rsmsg::*;

/// NotePad body (10 bytes): id u32 at 0, inplace text length at 4.
struct NotePad;

impl TableSchema for NotePad {
    const DEFAULT: &'static [u8] = &[0; 10];
}

/// BlobPad body (10 bytes): id u32 at 0, inplace bytes length at 4.
struct BlobPad;

impl TableSchema for BlobPad {
    const DEFAULT: &'static [u8] = &[0; 10];
}

/// ListPad body (10 bytes): id u32 at 0, inplace u16-list length at 4.
struct ListPad;

impl TableSchema for ListPad {
    const DEFAULT: &'static [u8] = &[0; 10];
}

/// Inner body (4 bytes): one u32.
struct Inner;

impl TableSchema for Inner {
    const DEFAULT: &'static [u8] = &[0; 4];
}

/// Box body (8 bytes): one inplace union slot.
struct InplaceBox;

impl TableSchema for InplaceBox {
    const DEFAULT: &'static [u8] = &[0; 8];
}

enum StuffIn<'a> {
    Inner(TableIn<'a, Inner>),
    Note(&'a str),
}

struct Stuff;

impl<'a> UnionSchema<'a> for Stuff {
    type In = StuffIn<'a>;

    fn read_at(_reader: Reader<'a>, _tag: u16, _offset: u64) -> Result<StuffIn<'a>> {
        Err(Error::OutOfBounds)
    }

    fn read_inplace(reader: Reader<'a>, tag: u16, start: usize, size: u64) -> Result<StuffIn<'a>> {
        match tag {
            1 => Ok(StuffIn::Inner(reader.get_table_inplace(start, size)?)),
            2 => Ok(StuffIn::Note(reader.get_text_inplace(start, size)?)),
            _ => Err(Error::OutOfBounds),
        }
    }
}

/// Shelf body (24 bytes): four table references.
struct Shelf;

impl TableSchema for Shelf {
    const DEFAULT: &'static [u8] = &[0; 24];
}

const SHELF_NOTE: usize = 0;
const SHELF_BLOB: usize = 6;
const SHELF_LIST: usize = 12;
const SHELF_BOX: usize = 18;

#[test]
fn inplace_payloads_round_trip() {
    let mut w = Writer::new();

    let note = w.construct::<NotePad>();
    note.set_pod(&mut w, 0, 45u32);
    note.add_inplace_text(&mut w, 4, "cake");

    let blob = w.construct::<BlobPad>();
    blob.set_pod(&mut w, 0, 46u32);
    blob.add_inplace_bytes(&mut w, 4, b"hi");

    let pad = w.construct::<ListPad>();
    pad.set_pod(&mut w, 0, 47u32);
    let values = pad.add_inplace_list::<PodKind<u16>>(&mut w, 4, 2);
    values.set(&mut w, 0, 24);
    values.set(&mut w, 1, 99);

    let boxed = w.construct::<InplaceBox>();
    let inner = boxed.inplace_union_at(0).set_table::<Inner>(&mut w, 1);
    inner.set_pod(&mut w, 0, 101u32);

    let shelf = w.construct::<Shelf>();
    shelf.set_table(&mut w, SHELF_NOTE, note);
    shelf.set_table(&mut w, SHELF_BLOB, blob);
    shelf.set_table(&mut w, SHELF_LIST, pad);
    shelf.set_table(&mut w, SHELF_BOX, boxed);
    let data = w.finalize(shelf).unwrap().to_vec();

    let shelf = Reader::new(&data).root::<Shelf>().unwrap();

    let note = shelf.get_table::<NotePad>(SHELF_NOTE).unwrap().unwrap();
    assert_eq!(note.get_pod::<u32>(0), 45);
    assert_eq!(note.get_inplace_text(4).unwrap(), "cake");

    let blob = shelf.get_table::<BlobPad>(SHELF_BLOB).unwrap().unwrap();
    assert_eq!(blob.get_pod::<u32>(0), 46);
    assert_eq!(blob.get_inplace_bytes(4).unwrap(), b"hi");

    let pad = shelf.get_table::<ListPad>(SHELF_LIST).unwrap().unwrap();
    assert_eq!(pad.get_pod::<u32>(0), 47);
    let values = pad.get_inplace_list::<PodKind<u16>>(4).unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values.at(0).unwrap(), 24);
    assert_eq!(values.at(1).unwrap(), 99);

    let boxed = shelf.get_table::<InplaceBox>(SHELF_BOX).unwrap().unwrap();
    match boxed.get_union_inplace::<Stuff>(0).unwrap() {
        Some(StuffIn::Inner(inner)) => assert_eq!(inner.get_pod::<u32>(0), 101),
        _ => panic!("expected the inner arm"),
    }
}

#[test]
fn inplace_union_text_arm() {
    let mut w = Writer::new();
    let boxed = w.construct::<InplaceBox>();
    boxed.inplace_union_at(0).set_text(&mut w, 2, "foobar");
    let root = w.construct::<Shelf>();
    root.set_table(&mut w, SHELF_BOX, boxed);
    let data = w.finalize(root).unwrap().to_vec();

    let root = Reader::new(&data).root::<Shelf>().unwrap();
    let boxed = root.get_table::<InplaceBox>(SHELF_BOX).unwrap().unwrap();
    match boxed.get_union_inplace::<Stuff>(0).unwrap() {
        Some(StuffIn::Note(note)) => assert_eq!(note, "foobar"),
        _ => panic!("expected the note arm"),
    }
}

#[test]
fn unset_inplace_union_reads_as_absent() {
    let mut w = Writer::new();
    let boxed = w.construct::<InplaceBox>();
    let root = w.construct::<Shelf>();
    root.set_table(&mut w, SHELF_BOX, boxed);
    let data = w.finalize(root).unwrap().to_vec();

    let root = Reader::new(&data).root::<Shelf>().unwrap();
    let boxed = root.get_table::<InplaceBox>(SHELF_BOX).unwrap().unwrap();
    assert!(boxed.get_union_inplace::<Stuff>(0).unwrap().is_none());
}

#[test]
#[should_panic(expected = "inplace payload must directly follow its table")]
fn allocating_between_table_and_inplace_payload_panics() {
    let mut w = Writer::new();
    let note = w.construct::<NotePad>();
    w.construct_text("interloper");
    note.add_inplace_text(&mut w, 4, "too late");
}

#[test]
fn truncated_inplace_payload_is_rejected() {
    let mut w = Writer::new();
    let note = w.construct::<NotePad>();
    note.add_inplace_text(&mut w, 4, "cake");
    let root = w.construct::<Shelf>();
    root.set_table(&mut w, SHELF_NOTE, note);
    let data = w.finalize(root).unwrap().to_vec();

    // Claim a longer payload than the buffer holds.
    let root = Reader::new(&data[..data.len()]).root::<Shelf>().unwrap();
    let note = root.get_table::<NotePad>(SHELF_NOTE).unwrap().unwrap();
    assert_eq!(note.get_inplace_text(4).unwrap(), "cake");

    let mut corrupt = data.clone();
    let body = 20; // NotePad body starts after root and table headers
    corrupt[body + 4] = 200;
    let root = Reader::new(&corrupt).root::<Shelf>().unwrap();
    let note = root.get_table::<NotePad>(SHELF_NOTE).unwrap().unwrap();
    assert_eq!(note.get_inplace_text(4).unwrap_err(), Error::OutOfBounds);
}
