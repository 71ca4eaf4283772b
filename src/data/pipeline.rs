use std::fmt;
use std::path::PathBuf;

use log::info;

use super::cube::write_cube;
use super::model::{DimensionPlan, Quantity, QUANTITIES};
use super::output::OutputContainer;
use super::planner::plan_dimensions;
use crate::error::Result;

/// Inputs of one combine run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Light-curve files; file `i` becomes object column `i`.
    pub files: Vec<PathBuf>,
    pub output: PathBuf,
}

impl RunConfig {
    pub fn new(files: Vec<PathBuf>, output: PathBuf) -> Self {
        Self { files, output }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub plan: DimensionPlan,
    pub output: PathBuf,
    /// Cube names in HDU order (HDU 2 onwards).
    pub cubes: Vec<String>,
}

/// Where a run is, or where it was when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Creating,
    Writing(Quantity),
    Finalizing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Planning => write!(f, "planning dimensions"),
            Stage::Creating => write!(f, "creating output"),
            Stage::Writing(q) => write!(f, "writing {}", q.name),
            Stage::Finalizing => write!(f, "finalizing output"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// Combine every input into one cube per quantity in `config.output`.
///
/// Any failure stops the run where it is. Cubes already written are left
/// in place, so a failed run can leave a partial output file behind.
pub fn combine(config: &RunConfig) -> Result<RunSummary> {
    let mut stage = Stage::Planning;
    combine_with_stage(config, &mut stage)
}

/// [`combine`], recording progress in `stage`; on failure it is left at
/// the stage that failed.
pub fn combine_with_stage(config: &RunConfig, stage: &mut Stage) -> Result<RunSummary> {
    run(config, &QUANTITIES, stage)
}

fn run(config: &RunConfig, quantities: &[Quantity], stage: &mut Stage) -> Result<RunSummary> {
    *stage = Stage::Planning;
    let plan = plan_dimensions(&config.files)?;

    *stage = Stage::Creating;
    let mut container = OutputContainer::create_fresh(&config.output)?;

    for quantity in quantities {
        *stage = Stage::Writing(*quantity);
        write_cube(&mut container, quantity, &plan, &config.files)?;
    }

    *stage = Stage::Finalizing;
    let cubes = container.cube_names().to_vec();
    let output = container.finalize()?;

    *stage = Stage::Done;
    info!("Wrote {} cubes to {}", cubes.len(), output.display());
    Ok(RunSummary {
        plan,
        output,
        cubes,
    })
}
