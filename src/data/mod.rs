/// Data layer: turning per-object light curves into cubes.
///
/// Architecture:
/// ```text
///  .fits / .parquet / .csv / .json   (one object per file)
///        │
///        ▼
///   ┌──────────┐
///   │  source   │  row counts, one named column → Vec<T>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ planner   │  DimensionPlan = (objects, max rows); right-padding
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐     ┌──────────┐
///   │   cube    │ ──▶ │  output   │  placeholder HDU + one IMAGE per quantity
///   └──────────┘     └──────────┘
///        ▲
///   ┌──────────┐
///   │ pipeline  │  plan → create → write ×6 → finalize
///   └──────────┘
/// ```

pub mod cube;
pub mod loader;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod planner;
pub mod source;
