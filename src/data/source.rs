use std::path::Path;

use log::debug;

use super::loader;
use super::model::{Cell, Element};
use crate::error::{CubeError, Result};
use crate::fits::{BinTable, FitsReader, Hdu, HduKind};

/// Position of the light-curve table in an input FITS file.
const TABLE_HDU: usize = 2;

// ---------------------------------------------------------------------------
// Input formats
// ---------------------------------------------------------------------------

/// How an input file is decoded. Anything not recognised is read as FITS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Fits,
    Parquet,
    Csv,
    Json,
}

impl InputFormat {
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "parquet" | "pq" => InputFormat::Parquet,
            "csv" => InputFormat::Csv,
            "json" => InputFormat::Json,
            _ => InputFormat::Fits,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Number of rows (observation epochs) in the file's table.
pub fn row_count(path: &Path) -> Result<usize> {
    match InputFormat::detect(path) {
        InputFormat::Fits => {
            let mut reader = open_fits(path)?;
            let (_, table) = locate_table(&mut reader, path)?;
            Ok(table.rows)
        }
        InputFormat::Parquet => loader::parquet_row_count(path),
        InputFormat::Csv => loader::csv_row_count(path),
        InputFormat::Json => loader::json_row_count(path),
    }
}

/// Read the whole of `field` (matched case-insensitively) as `T`.
///
/// The result holds exactly one value per table row.
pub fn read_column<T: Element>(path: &Path, field: &str) -> Result<Vec<T>> {
    let cells = match InputFormat::detect(path) {
        InputFormat::Fits => read_fits_cells(path, field)?,
        InputFormat::Parquet => loader::parquet_cells(path, field)?,
        InputFormat::Csv => loader::csv_cells(path, field)?,
        InputFormat::Json => loader::json_cells(path, field)?,
    };

    cells
        .into_iter()
        .enumerate()
        .map(|(row, cell)| {
            T::from_cell(cell).ok_or_else(|| CubeError::Conversion {
                path: path.to_path_buf(),
                field: field.to_string(),
                row,
                value: cell.to_string(),
                target: T::TYPE,
            })
        })
        .collect()
}

/// Resolve `field` among `names` ignoring ASCII case.
///
/// Returns `Ok(None)` when nothing matches; two or more matches make the
/// lookup ambiguous, which is a format error.
pub fn find_field<'a>(
    names: impl IntoIterator<Item = &'a str>,
    field: &str,
    path: &Path,
) -> Result<Option<usize>> {
    let matches: Vec<usize> = names
        .into_iter()
        .enumerate()
        .filter(|(_, name)| name.trim().eq_ignore_ascii_case(field))
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        many => Err(CubeError::format(
            path,
            format!("field '{field}' matches {} columns", many.len()),
        )),
    }
}

/// [`find_field`], failing with `FieldNotFound` when there is no match.
pub fn require_field<'a>(
    names: impl IntoIterator<Item = &'a str>,
    field: &str,
    path: &Path,
) -> Result<usize> {
    find_field(names, field, path)?.ok_or_else(|| CubeError::FieldNotFound {
        path: path.to_path_buf(),
        field: field.to_string(),
    })
}

// ---------------------------------------------------------------------------
// FITS input
// ---------------------------------------------------------------------------

fn open_fits(path: &Path) -> Result<FitsReader<std::io::BufReader<std::fs::File>>> {
    FitsReader::open(path).map_err(|e| CubeError::fits(path, e))
}

/// Move to the table HDU and check it is a binary table.
fn locate_table<R>(reader: &mut FitsReader<R>, path: &Path) -> Result<(Hdu, BinTable)>
where
    R: std::io::Read + std::io::Seek,
{
    let hdu = reader
        .hdu(TABLE_HDU)
        .map_err(|e| CubeError::fits(path, e))?;
    let kind = hdu.kind();
    if kind != HduKind::BinTable {
        return Err(CubeError::format(
            path,
            format!("HDU {TABLE_HDU} is {kind:?}, expected a binary table"),
        ));
    }
    let table = BinTable::from_header(&hdu.header).map_err(|e| CubeError::fits(path, e))?;
    Ok((hdu, table))
}

fn read_fits_cells(path: &Path, field: &str) -> Result<Vec<Cell>> {
    let mut reader = open_fits(path)?;
    let (hdu, table) = locate_table(&mut reader, path)?;

    let index = require_field(table.column_names(), field, path)?;
    debug!("{field} column number: {}", index + 1);

    let data = reader
        .read_data(&hdu)
        .map_err(|e| CubeError::fits(path, e))?;
    table
        .decode_column(index, &data)
        .map_err(|e| CubeError::fits(path, e))
}
