use super::{FitsError, Hdu, Header, Result, Value};

/// Pixel storage type, by its `BITPIX` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitpix {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Bitpix {
    pub fn code(self) -> i64 {
        match self {
            Bitpix::Byte => 8,
            Bitpix::Short => 16,
            Bitpix::Int => 32,
            Bitpix::Long => 64,
            Bitpix::Float => -32,
            Bitpix::Double => -64,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            8 => Bitpix::Byte,
            16 => Bitpix::Short,
            32 => Bitpix::Int,
            64 => Bitpix::Long,
            -32 => Bitpix::Float,
            -64 => Bitpix::Double,
            _ => return None,
        })
    }

    /// Bytes per pixel.
    pub fn size(self) -> usize {
        (self.code().unsigned_abs() / 8) as usize
    }
}

/// The empty primary HDU that heads every output file.
///
/// A rectangular cube cannot live in the primary HDU of a file that also
/// carries named extensions, so the primary is a data-less placeholder and
/// each cube goes into its own `IMAGE` extension.
pub fn primary_placeholder() -> Header {
    let mut h = Header::new();
    h.push_commented("SIMPLE", Value::Logical(true), "file does conform to FITS standard")
        .push_commented("BITPIX", Value::Integer(8), "number of bits per data pixel")
        .push_commented("NAXIS", Value::Integer(0), "number of data axes")
        .push_commented("EXTEND", Value::Logical(true), "FITS dataset may contain extensions");
    h
}

/// Shape and metadata of an `IMAGE` extension.
#[derive(Debug, Clone)]
pub struct ImageSpec<'a> {
    pub name: &'a str,
    pub bitpix: Bitpix,
    /// Axis lengths, fastest-varying first (`NAXIS1`, `NAXIS2`, …).
    pub axes: &'a [usize],
    /// Integer value that marks an undefined pixel.
    pub blank: Option<i64>,
}

impl ImageSpec<'_> {
    pub fn header(&self) -> Header {
        let mut h = Header::new();
        h.push_commented("XTENSION", Value::Text("IMAGE".into()), "IMAGE extension")
            .push("BITPIX", Value::Integer(self.bitpix.code()))
            .push("NAXIS", Value::Integer(self.axes.len() as i64));
        for (i, n) in self.axes.iter().enumerate() {
            h.push(format!("NAXIS{}", i + 1), Value::Integer(*n as i64));
        }
        h.push("PCOUNT", Value::Integer(0))
            .push("GCOUNT", Value::Integer(1));
        if let Some(blank) = self.blank {
            h.push_commented("BLANK", Value::Integer(blank), "value of undefined pixels");
        }
        h.push("EXTNAME", Value::Text(self.name.to_string()));
        h
    }

    /// Data unit size in bytes, or `None` if it overflows.
    pub fn data_len(&self) -> Option<u64> {
        self.axes
            .iter()
            .try_fold(self.bitpix.size() as u64, |acc, n| acc.checked_mul(*n as u64))
    }
}

/// Decoded pixel values, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    Byte(Vec<u8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

/// An image HDU read back into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub name: Option<String>,
    pub axes: Vec<usize>,
    pub blank: Option<i64>,
    pub pixels: Pixels,
}

impl Image {
    /// Decode the data unit `data` belonging to `hdu`.
    pub fn decode(hdu: &Hdu, data: &[u8]) -> Result<Self> {
        let h = &hdu.header;
        let code = h.require_integer("BITPIX")?;
        let bitpix = Bitpix::from_code(code)
            .ok_or_else(|| FitsError::Header(format!("invalid BITPIX {code}")))?;
        let naxis = h.require_size("NAXIS")?;
        let axes = (1..=naxis)
            .map(|i| h.require_size(&format!("NAXIS{i}")).map(|n| n as usize))
            .collect::<Result<Vec<_>>>()?;
        let count: usize = if axes.is_empty() { 0 } else { axes.iter().product() };
        let expected = count * bitpix.size();
        if data.len() < expected {
            return Err(FitsError::Truncated {
                expected: expected as u64,
                found: data.len() as u64,
            });
        }
        let data = &data[..expected];

        let pixels = match bitpix {
            Bitpix::Byte => Pixels::Byte(data.to_vec()),
            Bitpix::Short => Pixels::Short(
                data.chunks_exact(2)
                    .map(|b| i16::from_be_bytes([b[0], b[1]]))
                    .collect(),
            ),
            Bitpix::Int => Pixels::Int(
                data.chunks_exact(4)
                    .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            Bitpix::Long => Pixels::Long(
                data.chunks_exact(8)
                    .map(|b| i64::from_be_bytes(b.try_into().unwrap_or([0; 8])))
                    .collect(),
            ),
            Bitpix::Float => Pixels::Float(
                data.chunks_exact(4)
                    .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            Bitpix::Double => Pixels::Double(
                data.chunks_exact(8)
                    .map(|b| f64::from_be_bytes(b.try_into().unwrap_or([0; 8])))
                    .collect(),
            ),
        };

        Ok(Image {
            name: hdu.name().map(str::to_string),
            axes,
            blank: h.integer("BLANK"),
            pixels,
        })
    }
}
