use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use lightcurve_cube::fits::table::write_table_file;
use lightcurve_cube::fits::{ColumnData, TableColumn};

/// Write synthetic light-curve FITS files for trying out the combiner.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Number of objects (files) to write
    #[arg(long, default_value_t = 5)]
    count: usize,

    /// Fewest epochs in any file
    #[arg(long, default_value_t = 200, value_parser = rows_in_range)]
    min_rows: usize,

    /// Most epochs in any file
    #[arg(long, default_value_t = 250, value_parser = rows_in_range)]
    max_rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value = "sample_data")]
    out_dir: PathBuf,
}

/// Largest epoch count the generator will write per file.
const MAX_ROWS: usize = 10_000_000;

fn rows_in_range(s: &str) -> std::result::Result<usize, String> {
    let rows: usize = s.parse().map_err(|e| format!("{e}"))?;
    if rows > MAX_ROWS {
        return Err(format!("at most {MAX_ROWS} rows per file"));
    }
    Ok(rows)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `lo..=hi`.
    fn range(&mut self, lo: usize, hi: usize) -> usize {
        match ((hi - lo) as u64).checked_add(1) {
            Some(span) => lo + (self.next_u64() % span) as usize,
            None => lo + self.next_u64() as usize,
        }
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One object's light curve: a flat star with a box-shaped transit.
fn light_curve(rng: &mut SimpleRng, rows: usize) -> Vec<TableColumn> {
    // Heliocentric Julian dates, one sample every 10 minutes.
    let start = 2_456_658.5 + rng.next_f64();
    let cadence = 10.0 / (24.0 * 60.0);

    let base_flux = 1_000.0 + 9_000.0 * rng.next_f64();
    let depth = 0.01 * rng.next_f64();
    let period = 0.5 + 2.0 * rng.next_f64();
    let noise = 0.002 * base_flux;
    let (col0, row0) = (2048.0 * rng.next_f64(), 2048.0 * rng.next_f64());

    let mut time = Vec::with_capacity(rows);
    let mut flux = Vec::with_capacity(rows);
    let mut flux_err = Vec::with_capacity(rows);
    let mut cent_col = Vec::with_capacity(rows);
    let mut cent_row = Vec::with_capacity(rows);
    let mut quality = Vec::with_capacity(rows);

    for i in 0..rows {
        let t = start + i as f64 * cadence;
        let phase = ((t - start) / period).fract();
        let in_transit = phase < 0.05;
        let model = if in_transit { base_flux * (1.0 - depth) } else { base_flux };

        time.push(t);
        flux.push(rng.gauss(model, noise));
        flux_err.push(noise);
        cent_col.push(rng.gauss(col0, 0.05) as f32);
        cent_row.push(rng.gauss(row0, 0.05) as f32);
        // Flag roughly one sample in fifty.
        quality.push(if rng.next_f64() < 0.02 { 1 << rng.range(0, 7) } else { 0 });
    }

    vec![
        TableColumn::new("TIME", ColumnData::Double(time)),
        TableColumn::new("DETFLUX", ColumnData::Double(flux)),
        TableColumn::new("DETFLUX_ERR", ColumnData::Double(flux_err)),
        TableColumn::new("CENT_COL", ColumnData::Float(cent_col)),
        TableColumn::new("CENT_ROW", ColumnData::Float(cent_row)),
        TableColumn::new("QUALITY", ColumnData::Int(quality)),
    ]
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.min_rows > args.max_rows {
        bail!("--min-rows ({}) exceeds --max-rows ({})", args.min_rows, args.max_rows);
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let mut rng = SimpleRng::new(args.seed);
    for object in 0..args.count {
        let rows = rng.range(args.min_rows, args.max_rows);
        let path = args.out_dir.join(format!("object_{object:04}.fits"));
        write_table_file(&path, "LIGHTCURVE", &light_curve(&mut rng, rows))
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {rows} epochs to {}", path.display());
    }

    Ok(())
}
