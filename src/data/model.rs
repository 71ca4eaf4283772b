use std::fmt;

use crate::error::{CubeError, Result};
use crate::fits::Bitpix;

// ---------------------------------------------------------------------------
// Cell – a single decoded table value
// ---------------------------------------------------------------------------

/// A scalar read from one row of a source column, before conversion to the
/// cube's element type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    /// Undefined in the source (Parquet null, empty CSV field, …).
    Null,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// ElementType / Element – what a cube stores
// ---------------------------------------------------------------------------

/// Storage type of a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float64,
    Int32,
}

impl ElementType {
    pub fn bitpix(self) -> Bitpix {
        match self {
            ElementType::Float64 => Bitpix::Double,
            ElementType::Int32 => Bitpix::Int,
        }
    }

    /// Integer `BLANK` value declared in the cube header, if any.
    pub fn blank(self) -> Option<i64> {
        match self {
            ElementType::Float64 => None,
            ElementType::Int32 => Some(i32::MISSING as i64),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Float64 => write!(f, "float64"),
            ElementType::Int32 => write!(f, "int32"),
        }
    }
}

/// A Rust type that can be stored in a cube.
///
/// Floating cubes mark missing cells with NaN. Integer cubes use
/// `i32::MIN`, which is also written to the header as `BLANK`; a genuine
/// source value of `i32::MIN` is therefore indistinguishable from padding.
pub trait Element: Copy + PartialEq + fmt::Debug {
    const TYPE: ElementType;
    const MISSING: Self;

    /// Convert a source cell; `None` when the value does not fit.
    ///
    /// Floats narrow to integers by truncation toward zero.
    fn from_cell(cell: Cell) -> Option<Self>;

    fn is_missing(&self) -> bool;

    /// Append the big-endian encoding of `self`.
    fn put_be(self, out: &mut Vec<u8>);
}

impl Element for f64 {
    const TYPE: ElementType = ElementType::Float64;
    const MISSING: Self = f64::NAN;

    fn from_cell(cell: Cell) -> Option<Self> {
        Some(match cell {
            Cell::Int(i) => i as f64,
            Cell::Float(f) => f,
            Cell::Null => Self::MISSING,
        })
    }

    fn is_missing(&self) -> bool {
        self.is_nan()
    }

    fn put_be(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl Element for i32 {
    const TYPE: ElementType = ElementType::Int32;
    const MISSING: Self = i32::MIN;

    fn from_cell(cell: Cell) -> Option<Self> {
        match cell {
            Cell::Int(i) => i32::try_from(i).ok(),
            Cell::Float(f) if f.is_finite() && f >= i32::MIN as f64 && f <= i32::MAX as f64 => {
                Some(f as i32)
            }
            Cell::Float(_) => None,
            Cell::Null => Some(Self::MISSING),
        }
    }

    fn is_missing(&self) -> bool {
        *self == Self::MISSING
    }

    fn put_be(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

// ---------------------------------------------------------------------------
// Quantity – one measurement extracted into one cube
// ---------------------------------------------------------------------------

/// A measurement to extract: the cube's name, the source field it is read
/// from, and the cube's element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity {
    pub name: &'static str,
    pub field: &'static str,
    pub element: ElementType,
}

/// The cubes of every output file, in the order they are written.
pub const QUANTITIES: [Quantity; 6] = [
    Quantity { name: "HJD", field: "TIME", element: ElementType::Float64 },
    Quantity { name: "FLUX", field: "DETFLUX", element: ElementType::Float64 },
    Quantity { name: "FLUXERR", field: "DETFLUX_ERR", element: ElementType::Float64 },
    Quantity { name: "CCDX", field: "CENT_COL", element: ElementType::Float64 },
    Quantity { name: "CCDY", field: "CENT_ROW", element: ElementType::Float64 },
    Quantity { name: "QUALITY", field: "QUALITY", element: ElementType::Int32 },
];

// ---------------------------------------------------------------------------
// DimensionPlan – shape shared by every cube of a run
// ---------------------------------------------------------------------------

/// Cube shape: `epochs` samples along the fast axis, `objects` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionPlan {
    pub objects: usize,
    pub epochs: usize,
}

impl DimensionPlan {
    /// Both dimensions must be at least one.
    pub fn new(objects: usize, epochs: usize) -> Result<Self> {
        if objects == 0 || epochs == 0 {
            return Err(CubeError::Shape(format!(
                "cube of {epochs} epochs x {objects} objects has no cells"
            )));
        }
        Ok(Self { objects, epochs })
    }

    /// Axis lengths in FITS order (`NAXIS1` = epochs, `NAXIS2` = objects).
    pub fn axes(&self) -> [usize; 2] {
        [self.epochs, self.objects]
    }
}

impl fmt::Display for DimensionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} images, {} objects", self.epochs, self.objects)
    }
}
