use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::Path;

use super::{image, FitsError, FitsWriter, Header, Result, Value};
use crate::data::model::Cell;

// ---------------------------------------------------------------------------
// TFORM – per-column storage format
// ---------------------------------------------------------------------------

/// A parsed `TFORMn` value: repeat count and type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TForm {
    pub repeat: usize,
    pub code: char,
}

impl TForm {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let digits = raw.chars().take_while(|c| c.is_ascii_digit()).count();
        let repeat = if digits == 0 {
            1
        } else {
            raw[..digits]
                .parse()
                .map_err(|_| FitsError::Header(format!("bad repeat count in TFORM '{raw}'")))?
        };
        let code = raw[digits..]
            .chars()
            .next()
            .ok_or_else(|| FitsError::Header(format!("TFORM '{raw}' has no type code")))?
            .to_ascii_uppercase();
        let form = TForm { repeat, code };
        form.width()?;
        Ok(form)
    }

    /// Bytes this field occupies in each row.
    pub fn width(self) -> Result<usize> {
        let r = self.repeat;
        Ok(match self.code {
            'L' | 'B' | 'A' => r,
            'X' => r.div_ceil(8),
            'I' => 2 * r,
            'J' | 'E' => 4 * r,
            'K' | 'D' | 'C' | 'P' => 8 * r,
            'M' | 'Q' => 16 * r,
            other => return Err(FitsError::Header(format!("unknown TFORM code '{other}'"))),
        })
    }
}

// ---------------------------------------------------------------------------
// BinTable – description of a BINTABLE extension
// ---------------------------------------------------------------------------

/// One field of a binary table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDesc {
    pub name: String,
    pub form: TForm,
    /// Byte offset of the field within a row.
    pub offset: usize,
    pub scale: f64,
    pub zero: f64,
}

/// Row layout of a `BINTABLE` extension.
#[derive(Debug, Clone, PartialEq)]
pub struct BinTable {
    pub rows: usize,
    pub row_len: usize,
    pub columns: Vec<ColumnDesc>,
}

impl BinTable {
    pub fn from_header(h: &Header) -> Result<Self> {
        let row_len = h.require_size("NAXIS1")? as usize;
        let rows = h.require_size("NAXIS2")? as usize;
        let fields = h.require_size("TFIELDS")? as usize;

        let mut columns = Vec::with_capacity(fields);
        let mut offset = 0;
        for n in 1..=fields {
            let tform = h
                .text(&format!("TFORM{n}"))
                .ok_or_else(|| FitsError::MissingKeyword(format!("TFORM{n}")))?;
            let form = TForm::parse(tform)?;
            columns.push(ColumnDesc {
                name: h.text(&format!("TTYPE{n}")).unwrap_or_default().to_string(),
                form,
                offset,
                scale: h.real(&format!("TSCAL{n}")).unwrap_or(1.0),
                zero: h.real(&format!("TZERO{n}")).unwrap_or(0.0),
            });
            offset += form.width()?;
        }
        if offset != row_len {
            return Err(FitsError::Header(format!(
                "fields occupy {offset} bytes but NAXIS1 is {row_len}"
            )));
        }

        Ok(BinTable {
            rows,
            row_len,
            columns,
        })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Decode column `index` from the table's data unit.
    ///
    /// Only scalar numeric and logical fields are supported. `TSCALn` and
    /// `TZEROn` are applied; a scaled integer stays an integer when the
    /// scaling is a whole-number offset.
    pub fn decode_column(&self, index: usize, data: &[u8]) -> Result<Vec<Cell>> {
        let col = &self.columns[index];
        if col.form.repeat != 1 || !matches!(col.form.code, 'L' | 'B' | 'I' | 'J' | 'K' | 'E' | 'D') {
            return Err(FitsError::Unsupported(format!(
                "column '{}' has TFORM {}{}; only scalar numeric columns can be read",
                col.name, col.form.repeat, col.form.code
            )));
        }
        let needed = self.rows * self.row_len;
        if data.len() < needed {
            return Err(FitsError::Truncated {
                expected: needed as u64,
                found: data.len() as u64,
            });
        }

        let width = col.form.width()?;
        let cells = data[..needed]
            .chunks_exact(self.row_len.max(1))
            .take(self.rows)
            .map(|row| {
                let raw = &row[col.offset..col.offset + width];
                scale(decode_cell(col.form.code, raw), col.scale, col.zero)
            })
            .collect();
        Ok(cells)
    }
}

fn decode_cell(code: char, b: &[u8]) -> Cell {
    match code {
        'L' => match b[0] {
            b'T' => Cell::Int(1),
            b'F' => Cell::Int(0),
            _ => Cell::Null,
        },
        'B' => Cell::Int(b[0] as i64),
        'I' => Cell::Int(i16::from_be_bytes([b[0], b[1]]) as i64),
        'J' => Cell::Int(i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as i64),
        'K' => Cell::Int(i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])),
        'E' => Cell::Float(f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64),
        _ => Cell::Float(f64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])),
    }
}

fn scale(cell: Cell, scale: f64, zero: f64) -> Cell {
    if scale == 1.0 && zero == 0.0 {
        return cell;
    }
    match cell {
        Cell::Int(i) if scale == 1.0 && zero.fract() == 0.0 && zero.abs() < 9.0e18 => {
            match i.checked_add(zero as i64) {
                Some(v) => Cell::Int(v),
                None => Cell::Float(i as f64 + zero),
            }
        }
        Cell::Int(i) => Cell::Float(i as f64 * scale + zero),
        Cell::Float(f) => Cell::Float(f * scale + zero),
        Cell::Null => Cell::Null,
    }
}

// ---------------------------------------------------------------------------
// Writing tables
// ---------------------------------------------------------------------------

/// Values for one table column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Short(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Long(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tform(&self) -> TForm {
        let code = match self {
            ColumnData::Short(_) => 'I',
            ColumnData::Int(_) => 'J',
            ColumnData::Long(_) => 'K',
            ColumnData::Float(_) => 'E',
            ColumnData::Double(_) => 'D',
        };
        TForm { repeat: 1, code }
    }

    fn put(&self, row: usize, out: &mut Vec<u8>) {
        match self {
            ColumnData::Short(v) => out.extend_from_slice(&v[row].to_be_bytes()),
            ColumnData::Int(v) => out.extend_from_slice(&v[row].to_be_bytes()),
            ColumnData::Long(v) => out.extend_from_slice(&v[row].to_be_bytes()),
            ColumnData::Float(v) => out.extend_from_slice(&v[row].to_be_bytes()),
            ColumnData::Double(v) => out.extend_from_slice(&v[row].to_be_bytes()),
        }
    }
}

/// A named column to be written into a binary table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub data: ColumnData,
    /// `(TSCALn, TZEROn)`; stored values are written as given.
    pub scaling: Option<(f64, f64)>,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
            scaling: None,
        }
    }

    pub fn with_scaling(mut self, scale: f64, zero: f64) -> Self {
        self.scaling = Some((scale, zero));
        self
    }
}

/// Build the header and row-major data unit of a `BINTABLE` extension.
pub fn encode_bintable(name: &str, columns: &[TableColumn]) -> Result<(Header, Vec<u8>)> {
    let rows = columns.first().map_or(0, |c| c.data.len());
    if let Some(bad) = columns.iter().find(|c| c.data.len() != rows) {
        return Err(FitsError::Header(format!(
            "column '{}' has {} rows, expected {rows}",
            bad.name,
            bad.data.len()
        )));
    }
    let forms = columns.iter().map(|c| c.data.tform()).collect::<Vec<_>>();
    let row_len = forms
        .iter()
        .map(|f| f.width())
        .sum::<Result<usize>>()?;

    let mut h = Header::new();
    h.push_commented("XTENSION", Value::Text("BINTABLE".into()), "binary table extension")
        .push("BITPIX", Value::Integer(8))
        .push("NAXIS", Value::Integer(2))
        .push("NAXIS1", Value::Integer(row_len as i64))
        .push("NAXIS2", Value::Integer(rows as i64))
        .push("PCOUNT", Value::Integer(0))
        .push("GCOUNT", Value::Integer(1))
        .push("TFIELDS", Value::Integer(columns.len() as i64));
    for (i, (col, form)) in columns.iter().zip(&forms).enumerate() {
        let n = i + 1;
        h.push(format!("TTYPE{n}"), Value::Text(col.name.clone()))
            .push(format!("TFORM{n}"), Value::Text(format!("{}{}", form.repeat, form.code)));
        if let Some((scale, zero)) = col.scaling {
            h.push(format!("TSCAL{n}"), Value::Real(scale))
                .push(format!("TZERO{n}"), Value::Real(zero));
        }
    }
    h.push("EXTNAME", Value::Text(name.to_string()));

    let mut data = Vec::with_capacity(rows * row_len);
    for row in 0..rows {
        for col in columns {
            col.data.put(row, &mut data);
        }
    }
    Ok((h, data))
}

/// Write a complete light-curve style file: an empty primary HDU followed
/// by one binary table.
pub fn write_table_file(path: &Path, name: &str, columns: &[TableColumn]) -> Result<()> {
    let (header, data) = encode_bintable(name, columns)?;
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut writer = FitsWriter::new(BufWriter::new(file));
    writer.append_hdu(&image::primary_placeholder(), &[])?;
    writer.append_hdu(&header, &data)?;
    writer.finish()?;
    Ok(())
}
