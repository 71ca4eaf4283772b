mod common;

use std::fs;
use std::sync::Arc;

use arrow::array::{Float32Array, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use lightcurve_cube::fits::table::write_table_file;
use lightcurve_cube::fits::{ColumnData, FitsReader, HduKind, Pixels, TableColumn};
use lightcurve_cube::{combine, CubeError, DimensionPlan, RunConfig, QUANTITIES};

use common::{read_cubes, write_lightcurve};

fn doubles(pixels: &Pixels) -> &[f64] {
    match pixels {
        Pixels::Double(v) => v,
        other => panic!("expected float64 pixels, got {other:?}"),
    }
}

fn ints(pixels: &Pixels) -> &[i32] {
    match pixels {
        Pixels::Int(v) => v,
        other => panic!("expected int32 pixels, got {other:?}"),
    }
}

#[test]
fn six_cubes_share_one_shape() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_lightcurve(dir.path(), "a.fits", 0, 4),
        write_lightcurve(dir.path(), "b.fits", 1, 6),
        write_lightcurve(dir.path(), "c.fits", 2, 5),
    ];
    let output = dir.path().join("cube.fits");

    let summary = combine(&RunConfig::new(files, output.clone())).unwrap();
    assert_eq!(summary.plan, DimensionPlan { objects: 3, epochs: 6 });
    assert_eq!(summary.cubes, ["HJD", "FLUX", "FLUXERR", "CCDX", "CCDY", "QUALITY"]);

    let mut reader = FitsReader::open(&output).unwrap();
    let hdus = reader.hdus().unwrap();
    assert_eq!(hdus.len(), 7);
    assert_eq!(hdus[0].kind(), HduKind::Primary);
    assert_eq!(hdus[0].data_len, 0);

    let cubes = read_cubes(&output);
    for (cube, quantity) in cubes.iter().zip(QUANTITIES.iter()) {
        assert_eq!(cube.name.as_deref(), Some(quantity.name));
        assert_eq!(cube.axes, vec![6, 3]);
    }
    assert!(matches!(cubes[0].pixels, Pixels::Double(_)));
    assert!(matches!(cubes[5].pixels, Pixels::Int(_)));
    assert_eq!(cubes[5].blank, Some(i32::MIN as i64));
}

#[test]
fn short_series_are_right_padded_with_nan() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_lightcurve(dir.path(), "short.fits", 0, 3),
        write_lightcurve(dir.path(), "long.fits", 1, 5),
    ];
    let output = dir.path().join("cube.fits");
    combine(&RunConfig::new(files, output.clone())).unwrap();

    let cubes = read_cubes(&output);
    let flux = doubles(&cubes[1].pixels);
    assert_eq!(flux.len(), 10);

    // Object 0 occupies elements 0..5, object 1 elements 5..10.
    assert_eq!(&flux[..3], &[0.5, 1.5, 2.5]);
    assert!(flux[3].is_nan() && flux[4].is_nan());
    assert_eq!(&flux[5..], &[1000.5, 1001.5, 1002.5, 1003.5, 1004.5]);

    let hjd = doubles(&cubes[0].pixels);
    assert_eq!(hjd.iter().filter(|v| v.is_nan()).count(), 2);
    assert_eq!(hjd[5], 2_457_000.0);

    let ccdx = doubles(&cubes[3].pixels);
    assert_eq!(&ccdx[..3], &[100.0, 101.0, 102.0]);
}

#[test]
fn integer_cube_pads_with_blank() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_lightcurve(dir.path(), "a.fits", 1, 2),
        write_lightcurve(dir.path(), "b.fits", 2, 4),
    ];
    let output = dir.path().join("cube.fits");
    combine(&RunConfig::new(files, output.clone())).unwrap();

    let cubes = read_cubes(&output);
    let quality = ints(&cubes[5].pixels);
    assert_eq!(quality, &[100, 101, i32::MIN, i32::MIN, 200, 201, 202, 203]);
}

#[test]
fn missing_field_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_lightcurve(dir.path(), "good.fits", 0, 3);
    let bad = dir.path().join("bad.fits");
    write_table_file(
        &bad,
        "LIGHTCURVE",
        &[
            TableColumn::new("TIME", ColumnData::Double(vec![1.0, 2.0])),
            TableColumn::new("DETFLUX", ColumnData::Double(vec![1.0, 2.0])),
        ],
    )
    .unwrap();
    let output = dir.path().join("cube.fits");

    let err = combine(&RunConfig::new(vec![good, bad.clone()], output.clone())).unwrap_err();
    match err {
        CubeError::FieldNotFound { path, field } => {
            assert_eq!(path, bad);
            assert_eq!(field, "DETFLUX_ERR");
        }
        other => panic!("expected FieldNotFound, got {other:?}"),
    }

    // HJD and FLUX made it to disk before the failure; FLUXERR never completed.
    let mut reader = FitsReader::open(&output).unwrap();
    let names: Vec<_> = reader
        .hdus()
        .unwrap()
        .iter()
        .filter_map(|h| h.name().map(str::to_string))
        .collect();
    assert!(!names.contains(&"QUALITY".to_string()));
}

#[test]
fn empty_file_list_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cube.fits");
    let err = combine(&RunConfig::new(vec![], output.clone())).unwrap_err();
    assert!(matches!(err, CubeError::EmptyInput));
    assert!(!output.exists());
}

#[test]
fn existing_output_is_fully_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cube.fits");

    let first = vec![write_lightcurve(dir.path(), "a.fits", 0, 8)];
    combine(&RunConfig::new(first, output.clone())).unwrap();
    let before = fs::read(&output).unwrap();

    let second = vec![write_lightcurve(dir.path(), "b.fits", 3, 2)];
    combine(&RunConfig::new(second, output.clone())).unwrap();

    let cubes = read_cubes(&output);
    assert_eq!(cubes[0].axes, vec![2, 1]);
    assert_eq!(doubles(&cubes[1].pixels), &[3000.5, 3001.5]);
    assert_ne!(fs::read(&output).unwrap(), before);
}

#[test]
fn reruns_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_lightcurve(dir.path(), "a.fits", 0, 7),
        write_lightcurve(dir.path(), "b.fits", 1, 3),
    ];
    let output = dir.path().join("cube.fits");

    combine(&RunConfig::new(files.clone(), output.clone())).unwrap();
    let first = fs::read(&output).unwrap();
    combine(&RunConfig::new(files, output.clone())).unwrap();
    assert_eq!(fs::read(&output).unwrap(), first);
    assert_eq!(first.len() % 2880, 0);
}

#[test]
fn second_hdu_must_be_a_binary_table() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_lightcurve(dir.path(), "a.fits", 0, 3);
    let cube = dir.path().join("cube.fits");
    combine(&RunConfig::new(vec![good.clone()], cube.clone())).unwrap();

    // A combined cube is not a light curve: its HDU 2 is an image.
    let output = dir.path().join("again.fits");
    let err = combine(&RunConfig::new(vec![good, cube], output.clone())).unwrap_err();
    assert!(matches!(err, CubeError::Format { .. }));
    assert!(!output.exists());
}

#[test]
fn parquet_and_fits_inputs_mix() {
    let dir = tempfile::tempdir().unwrap();
    let fits = write_lightcurve(dir.path(), "a.fits", 0, 2);

    let parquet = dir.path().join("b.parquet");
    let schema = Arc::new(Schema::new(vec![
        Field::new("time", DataType::Float64, false),
        Field::new("detflux", DataType::Float64, true),
        Field::new("detflux_err", DataType::Float64, false),
        Field::new("cent_col", DataType::Float32, false),
        Field::new("cent_row", DataType::Float32, false),
        Field::new("quality", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(vec![10.0, 11.0, 12.0])),
            Arc::new(Float64Array::from(vec![Some(5.0), None, Some(7.0)])),
            Arc::new(Float64Array::from(vec![0.1, 0.1, 0.1])),
            Arc::new(Float32Array::from(vec![1.0, 2.0, 3.0])),
            Arc::new(Float32Array::from(vec![4.0, 5.0, 6.0])),
            Arc::new(Int64Array::from(vec![0, 16, 0])),
        ],
    )
    .unwrap();
    let file = fs::File::create(&parquet).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let output = dir.path().join("cube.fits");
    let summary = combine(&RunConfig::new(vec![fits, parquet], output.clone())).unwrap();
    assert_eq!(summary.plan, DimensionPlan { objects: 2, epochs: 3 });

    let cubes = read_cubes(&output);
    let flux = doubles(&cubes[1].pixels);
    assert_eq!(&flux[..2], &[0.5, 1.5]);
    assert!(flux[2].is_nan());
    assert_eq!(flux[3], 5.0);
    assert!(flux[4].is_nan(), "null source cell becomes NaN");
    assert_eq!(flux[5], 7.0);
    assert_eq!(ints(&cubes[5].pixels), &[0, 1, i32::MIN, 0, 16, 0]);
}
