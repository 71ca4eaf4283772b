#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lightcurve_cube::fits::table::write_table_file;
use lightcurve_cube::fits::{ColumnData, FitsReader, Image, TableColumn};

/// Write a light curve with all six fields; values encode (object, row) so
/// columns can be told apart after combining.
pub fn write_lightcurve(dir: &Path, name: &str, object: usize, rows: usize) -> PathBuf {
    let path = dir.join(name);
    let base = object as f64 * 1000.0;
    let time: Vec<f64> = (0..rows).map(|i| 2_456_000.0 + base + i as f64).collect();
    let flux: Vec<f64> = (0..rows).map(|i| base + i as f64 + 0.5).collect();
    let err: Vec<f64> = (0..rows).map(|i| 0.01 * (i + 1) as f64).collect();
    let col: Vec<f32> = (0..rows).map(|i| 100.0 + i as f32).collect();
    let row: Vec<f32> = (0..rows).map(|i| 200.0 + i as f32).collect();
    let quality: Vec<i32> = (0..rows).map(|i| (object * 100 + i) as i32).collect();

    write_table_file(
        &path,
        "LIGHTCURVE",
        &[
            TableColumn::new("TIME", ColumnData::Double(time)),
            TableColumn::new("DETFLUX", ColumnData::Double(flux)),
            TableColumn::new("DETFLUX_ERR", ColumnData::Double(err)),
            TableColumn::new("CENT_COL", ColumnData::Float(col)),
            TableColumn::new("CENT_ROW", ColumnData::Float(row)),
            TableColumn::new("QUALITY", ColumnData::Int(quality)),
        ],
    )
    .unwrap();
    path
}

/// Every image extension of `path`, in HDU order.
pub fn read_cubes(path: &Path) -> Vec<Image> {
    let mut reader = FitsReader::open(path).unwrap();
    let hdus = reader.hdus().unwrap();
    hdus[1..]
        .iter()
        .map(|hdu| {
            let data = reader.read_data(hdu).unwrap();
            Image::decode(hdu, &data).unwrap()
        })
        .collect()
}
