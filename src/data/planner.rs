use std::path::PathBuf;

use log::{debug, info};

use super::model::{DimensionPlan, Element};
use super::source;
use crate::error::{CubeError, Result};

/// Work out the cube shape for `files`: one object per file, and as many
/// epochs as the longest table has rows.
///
/// The first file that cannot be sized aborts the whole plan.
pub fn plan_dimensions(files: &[PathBuf]) -> Result<DimensionPlan> {
    if files.is_empty() {
        return Err(CubeError::EmptyInput);
    }

    let mut epochs = 0;
    for path in files {
        let rows = source::row_count(path)?;
        debug!("{}: {rows} rows", path.display());
        epochs = epochs.max(rows);
    }

    let plan = DimensionPlan::new(files.len(), epochs)?;
    info!("Image dimensions: {plan}");
    Ok(plan)
}

/// Right-pad `column` with the missing marker up to `epochs` values.
///
/// A column longer than `epochs` is a shape error; it is never truncated.
pub fn pad_column<T: Element>(mut column: Vec<T>, epochs: usize) -> Result<Vec<T>> {
    if column.len() > epochs {
        return Err(CubeError::Shape(format!(
            "column has {} values but the cube holds {epochs} epochs",
            column.len()
        )));
    }
    column.resize(epochs, T::MISSING);
    Ok(column)
}
