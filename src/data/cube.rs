use std::path::PathBuf;

use log::info;

use super::model::{DimensionPlan, Element, ElementType, Quantity};
use super::output::OutputContainer;
use super::planner::pad_column;
use super::source;
use crate::error::Result;

/// Add the cube for `quantity` to `container` and fill it, one object
/// column per input file, in file order.
pub fn write_cube(
    container: &mut OutputContainer,
    quantity: &Quantity,
    plan: &DimensionPlan,
    files: &[PathBuf],
) -> Result<()> {
    match quantity.element {
        ElementType::Float64 => write_typed::<f64>(container, quantity, plan, files),
        ElementType::Int32 => write_typed::<i32>(container, quantity, plan, files),
    }
}

fn write_typed<T: Element>(
    container: &mut OutputContainer,
    quantity: &Quantity,
    plan: &DimensionPlan,
    files: &[PathBuf],
) -> Result<()> {
    info!("Creating {} hdu, from column {}", quantity.name, quantity.field);
    let mut cube = container.add_cube(quantity.name, T::TYPE, plan)?;

    for (index, path) in files.iter().enumerate() {
        info!("Updating from file {}", path.display());
        let column = source::read_column::<T>(path, quantity.field)?;
        let column = pad_column(column, plan.epochs)?;
        cube.write_object(index, &column)?;
    }
    Ok(())
}
