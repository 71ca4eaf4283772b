use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::{info, LevelFilter};

use lightcurve_cube::{combine_with_stage, CubeError, RunConfig, Stage};

/// Combine per-object light curves into one FITS data cube.
#[derive(Parser, Debug)]
#[command(name = "lightcurve-cube", version)]
struct Cli {
    /// Files to combine
    #[arg(value_name = "FILENAME", required = true)]
    files: Vec<PathBuf>,

    /// Output filename
    #[arg(short, long, value_name = "FILENAME")]
    output: PathBuf,

    /// Log verbosity; RUST_LOG takes precedence when set
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .parse_default_env()
        .init();

    let config = RunConfig::new(cli.files, cli.output);
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err
                .downcast_ref::<CubeError>()
                .map_or(2, CubeError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(config: &RunConfig) -> anyhow::Result<()> {
    let mut stage = Stage::Planning;
    let summary = combine_with_stage(config, &mut stage).with_context(|| {
        format!(
            "failed while {stage}, combining {} files into {}",
            config.files.len(),
            config.output.display()
        )
    })?;
    info!(
        "Done: {} cubes of {} in {}",
        summary.cubes.len(),
        summary.plan,
        summary.output.display()
    );
    Ok(())
}
