use std::{error, fmt};

/// Errors raised by read-side validation.
///
/// An accessor either yields a valid view or fails with one of these; there
/// is no partial success and no recovery inside the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A 4-byte object fingerprint did not match the expected kind.
    Magic { got: u32, expected: u32 },
    /// An offset or computed object end lies outside the message bytes.
    OutOfBounds,
    /// A text payload is not NUL-terminated, or is not valid UTF-8.
    InvalidText,
    /// A direct list declared a per-element width above 65534 bytes.
    TooLargeItemSize(u32),
    /// Checked indexing past the end of a list, or into an unset slot.
    OutOfRange { index: u64, len: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Magic { got, expected } => {
                write!(f, "bad magic {:#010x}, expected {:#010x}", got, expected)
            }
            Error::OutOfBounds => write!(f, "offset out of bounds"),
            Error::InvalidText => write!(f, "text payload is not NUL-terminated utf-8"),
            Error::TooLargeItemSize(width) => {
                write!(f, "direct list item size {} exceeds 65534", width)
            }
            Error::OutOfRange { index, len } => {
                write!(f, "index {} out of range for list of length {}", index, len)
            }
        }
    }
}

impl error::Error for Error {}
