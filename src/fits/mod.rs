/// Minimal FITS codec: just enough of the format to read binary-table light
/// curves and to write multi-extension image cubes.
///
/// Layout of a file:
/// ```text
///  ┌──────────────┬───────────┐┌──────────────┬───────────┐
///  │ header (N×2880)│ data (M×2880)││ header       │ data      │ ...
///  └──────────────┴───────────┘└──────────────┴───────────┘
///        HDU 1 (primary)              HDU 2 (first extension)
/// ```
///
/// Headers are 80-byte ASCII cards terminated by `END` and padded with
/// spaces; data units are big-endian and padded with zeros.

pub mod header;
pub mod image;
pub mod reader;
pub mod table;
pub mod writer;

use thiserror::Error;

pub use header::{Header, Value};
pub use image::{Bitpix, Image, ImageSpec, Pixels};
pub use reader::{FitsReader, Hdu, HduKind};
pub use table::{BinTable, ColumnData, TableColumn};
pub use writer::FitsWriter;

/// Size of a FITS logical record.
pub const BLOCK_LEN: usize = 2880;

/// Size of one header card.
pub const CARD_LEN: usize = 80;

/// Round `len` up to a whole number of FITS blocks.
pub fn padded_len(len: u64) -> u64 {
    len.div_ceil(BLOCK_LEN as u64) * BLOCK_LEN as u64
}

/// Errors raised by the codec itself. Callers attach the file path.
#[derive(Error, Debug)]
pub enum FitsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("HDU {0} does not exist")]
    MissingHdu(usize),

    #[error("malformed header: {0}")]
    Header(String),

    #[error("missing required keyword {0}")]
    MissingKeyword(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("data unit truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: u64, found: u64 },

    #[error("write of {len} bytes at offset {offset} falls outside the current data unit")]
    OutOfBounds { offset: u64, len: u64 },
}

pub type Result<T> = std::result::Result<T, FitsError>;
