//! Combine per-object light curves into a multi-object FITS data cube.
//!
//! Each input file holds one object's time series as a table. The output
//! file gets one two-dimensional image per measured quantity, with epochs
//! along the first axis and objects along the second; shorter series are
//! padded with a missing-value marker.

pub mod data;
pub mod error;
pub mod fits;

pub use data::model::{DimensionPlan, Element, ElementType, Quantity, QUANTITIES};
pub use data::pipeline::{combine, combine_with_stage, RunConfig, RunSummary, Stage};
pub use error::{CubeError, Result};
