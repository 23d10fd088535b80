mod backing;
mod buffer;
mod direct;
mod error;
mod kind;
mod list;
mod reader;
mod table;
mod wire;
mod writer;

use byteorder::{ByteOrder, LittleEndian};

pub use backing::{Backing, FileBacking, HeapBacking};
pub use buffer::Buffer;
pub use direct::{DirectListIn, DirectListIter};
pub use error::{Error, Result};
pub use kind::*;
pub use list::{ListIn, ListIter};
pub use reader::{Ptr, Reader};
pub use table::TableIn;
pub use wire::*;
pub use writer::{
    BytesHandle, DirectListHandle, InplaceUnionSlot, ListHandle, TableHandle, TextHandle,
    UnionSlotOut, Writer,
};
