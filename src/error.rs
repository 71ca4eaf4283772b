use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::data::model::ElementType;
use crate::fits::FitsError;

/// Errors raised while combining light curves into cubes.
#[derive(Error, Debug)]
pub enum CubeError {
    /// Open/create/read/write/close failures.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not laid out as expected (wrong HDU kind, bad header,
    /// unsupported column, ambiguous field name).
    #[error("format error in {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("field '{field}' not found in {}", path.display())]
    FieldNotFound { path: PathBuf, field: String },

    #[error("{}: field '{field}' row {row}: value {value} does not fit in {target}", path.display())]
    Conversion {
        path: PathBuf,
        field: String,
        row: usize,
        value: String,
        target: ElementType,
    },

    /// The cube cannot be created or written at the planned shape.
    #[error("invalid cube shape: {0}")]
    Shape(String),

    #[error("no input files given")]
    EmptyInput,

    #[error("Parquet error in {}: {source}", path.display())]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },

    #[error("Arrow error in {}: {source}", path.display())]
    Arrow {
        path: PathBuf,
        #[source]
        source: arrow::error::ArrowError,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CubeError>;

impl CubeError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        CubeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn format<S: Into<String>>(path: &Path, message: S) -> Self {
        CubeError::Format {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Attach `path` to a codec error. I/O failures stay I/O failures;
    /// everything else is a format problem.
    pub fn fits(path: &Path, err: FitsError) -> Self {
        match err {
            FitsError::Io(source) => CubeError::io(path, source),
            other => CubeError::format(path, other.to_string()),
        }
    }

    /// Process exit status for this error: the OS error code for I/O
    /// failures where one exists, `2` otherwise.
    pub fn exit_code(&self) -> u8 {
        const GENERIC: u8 = 2;
        match self {
            CubeError::Io { source, .. } => source
                .raw_os_error()
                .and_then(|code| u8::try_from(code).ok())
                .filter(|code| *code != 0)
                .unwrap_or(GENERIC),
            _ => GENERIC,
        }
    }
}
