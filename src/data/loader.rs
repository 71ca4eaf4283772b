use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use serde_json::Value as JsonValue;

use super::model::Cell;
use super::source::require_field;
use crate::error::{CubeError, Result};

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn parquet_builder(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>> {
    let file = File::open(path).map_err(|e| CubeError::io(path, e))?;
    ParquetRecordBatchReaderBuilder::try_new(file).map_err(|source| CubeError::Parquet {
        path: path.to_path_buf(),
        source,
    })
}

/// Row count straight from the Parquet footer; no data pages are read.
pub fn parquet_row_count(path: &Path) -> Result<usize> {
    let builder = parquet_builder(path)?;
    let rows = builder.metadata().file_metadata().num_rows();
    usize::try_from(rows).map_err(|_| CubeError::format(path, format!("negative row count {rows}")))
}

/// Read one top-level column, projecting away every other column.
pub fn parquet_cells(path: &Path, field: &str) -> Result<Vec<Cell>> {
    let builder = parquet_builder(path)?;
    let schema = builder.schema().clone();
    let index = require_field(schema.fields().iter().map(|f| f.name().as_str()), field, path)?;
    debug!("{field} column number: {}", index + 1);

    let mask = ProjectionMask::roots(builder.parquet_schema(), [index]);
    let reader = builder
        .with_projection(mask)
        .build()
        .map_err(|source| CubeError::Parquet {
            path: path.to_path_buf(),
            source,
        })?;

    let mut cells = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|source| CubeError::Arrow {
            path: path.to_path_buf(),
            source,
        })?;
        extend_from_arrow(batch.column(0), &mut cells)
            .map_err(|message| CubeError::format(path, format!("field '{field}': {message}")))?;
    }
    Ok(cells)
}

/// Append the values of a primitive Arrow array; nulls become [`Cell::Null`].
fn extend_from_arrow(col: &ArrayRef, out: &mut Vec<Cell>) -> std::result::Result<(), String> {
    macro_rules! ints {
        ($t:ty) => {
            out.extend(col.as_primitive::<$t>().iter().map(|v| match v {
                Some(v) => Cell::Int(v as i64),
                None => Cell::Null,
            }))
        };
    }

    match col.data_type() {
        DataType::Boolean => out.extend(col.as_boolean().iter().map(|v| match v {
            Some(b) => Cell::Int(b as i64),
            None => Cell::Null,
        })),
        DataType::Int8 => ints!(Int8Type),
        DataType::Int16 => ints!(Int16Type),
        DataType::Int32 => ints!(Int32Type),
        DataType::Int64 => ints!(Int64Type),
        DataType::UInt8 => ints!(UInt8Type),
        DataType::UInt16 => ints!(UInt16Type),
        DataType::UInt32 => ints!(UInt32Type),
        DataType::UInt64 => out.extend(col.as_primitive::<UInt64Type>().iter().map(|v| match v {
            Some(v) => i64::try_from(v).map_or(Cell::Float(v as f64), Cell::Int),
            None => Cell::Null,
        })),
        DataType::Float32 => out.extend(col.as_primitive::<Float32Type>().iter().map(|v| match v {
            Some(v) => Cell::Float(v as f64),
            None => Cell::Null,
        })),
        DataType::Float64 => out.extend(col.as_primitive::<Float64Type>().iter().map(|v| match v {
            Some(v) => Cell::Float(v),
            None => Cell::Null,
        })),
        other => return Err(format!("unsupported column type {other:?}")),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: one header row naming the fields, then one record per epoch.
fn csv_reader(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| CubeError::io(path, e))?;
    Ok(csv::Reader::from_reader(file))
}

fn csv_error(path: &Path, source: csv::Error) -> CubeError {
    CubeError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

pub fn csv_row_count(path: &Path) -> Result<usize> {
    let mut reader = csv_reader(path)?;
    let mut rows = 0;
    for record in reader.records() {
        record.map_err(|e| csv_error(path, e))?;
        rows += 1;
    }
    Ok(rows)
}

pub fn csv_cells(path: &Path, field: &str) -> Result<Vec<Cell>> {
    let mut reader = csv_reader(path)?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let index = require_field(headers.iter(), field, path)?;
    debug!("{field} column number: {}", index + 1);

    let mut cells = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let raw = record.get(index).unwrap_or("");
        let cell = parse_csv_cell(raw).ok_or_else(|| {
            CubeError::format(path, format!("row {row}, field '{field}': '{raw}' is not a number"))
        })?;
        cells.push(cell);
    }
    Ok(cells)
}

fn parse_csv_cell(raw: &str) -> Option<Cell> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(Cell::Null);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Cell::Int(i));
    }
    raw.parse::<f64>().ok().map(Cell::Float)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON layout (records-oriented, one object per epoch):
///
/// ```json
/// [
///   { "TIME": 2456789.01, "DETFLUX": 1021.5, "QUALITY": 0, ... },
///   ...
/// ]
/// ```
fn json_records(path: &Path) -> Result<Vec<serde_json::Map<String, JsonValue>>> {
    let text = std::fs::read_to_string(path).map_err(|e| CubeError::io(path, e))?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|source| CubeError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let JsonValue::Array(records) = root else {
        return Err(CubeError::format(path, "expected a top-level JSON array"));
    };
    records
        .into_iter()
        .enumerate()
        .map(|(i, rec)| match rec {
            JsonValue::Object(obj) => Ok(obj),
            _ => Err(CubeError::format(path, format!("row {i} is not a JSON object"))),
        })
        .collect()
}

pub fn json_row_count(path: &Path) -> Result<usize> {
    Ok(json_records(path)?.len())
}

/// Field names come from the first record; a later record lacking the key
/// contributes a null.
pub fn json_cells(path: &Path, field: &str) -> Result<Vec<Cell>> {
    let records = json_records(path)?;
    let key = match records.first() {
        Some(first) => {
            let index = require_field(first.keys().map(String::as_str), field, path)?;
            first.keys().nth(index).cloned().unwrap_or_default()
        }
        None => {
            return Err(CubeError::FieldNotFound {
                path: path.to_path_buf(),
                field: field.to_string(),
            })
        }
    };

    records
        .iter()
        .enumerate()
        .map(|(row, rec)| match rec.get(&key) {
            None | Some(JsonValue::Null) => Ok(Cell::Null),
            Some(JsonValue::Bool(b)) => Ok(Cell::Int(*b as i64)),
            Some(JsonValue::Number(n)) => Ok(match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => Cell::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Some(other) => Err(CubeError::format(
                path,
                format!("row {row}, field '{field}': {other} is not a number"),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int32Array};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    #[test]
    fn csv_columns_with_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc.csv");
        std::fs::write(&path, "time,detflux,quality\n1.0,10.5,0\n2.0,,1\n3.0,11.5,\n").unwrap();

        assert_eq!(csv_row_count(&path).unwrap(), 3);
        assert_eq!(
            csv_cells(&path, "DETFLUX").unwrap(),
            vec![Cell::Float(10.5), Cell::Null, Cell::Float(11.5)]
        );
        assert_eq!(
            csv_cells(&path, "QUALITY").unwrap(),
            vec![Cell::Int(0), Cell::Int(1), Cell::Null]
        );
        assert!(matches!(
            csv_cells(&path, "CENT_ROW"),
            Err(CubeError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn csv_rejects_text_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc.csv");
        std::fs::write(&path, "TIME\n1.0\nabc\n").unwrap();
        assert!(matches!(csv_cells(&path, "TIME"), Err(CubeError::Format { .. })));
    }

    #[test]
    fn json_records_with_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc.json");
        std::fs::write(
            &path,
            r#"[{"TIME": 1.5, "Quality": 3}, {"TIME": 2, "Quality": null}, {"TIME": 3.5}]"#,
        )
        .unwrap();

        assert_eq!(json_row_count(&path).unwrap(), 3);
        assert_eq!(
            json_cells(&path, "time").unwrap(),
            vec![Cell::Float(1.5), Cell::Int(2), Cell::Float(3.5)]
        );
        assert_eq!(
            json_cells(&path, "QUALITY").unwrap(),
            vec![Cell::Int(3), Cell::Null, Cell::Null]
        );
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc.json");
        std::fs::write(&path, r#"{"TIME": [1, 2]}"#).unwrap();
        assert!(matches!(json_row_count(&path), Err(CubeError::Format { .. })));
    }

    #[test]
    fn parquet_projection_reads_one_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("TIME", DataType::Float64, false),
            Field::new("QUALITY", DataType::Int32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0])),
                Arc::new(Int32Array::from(vec![Some(0), None, Some(8), Some(0)])),
            ],
        )
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        assert_eq!(parquet_row_count(&path).unwrap(), 4);
        assert_eq!(
            parquet_cells(&path, "quality").unwrap(),
            vec![Cell::Int(0), Cell::Null, Cell::Int(8), Cell::Int(0)]
        );
        assert_eq!(parquet_cells(&path, "time").unwrap().len(), 4);
        assert!(matches!(
            parquet_cells(&path, "DETFLUX"),
            Err(CubeError::FieldNotFound { .. })
        ));
    }
}
