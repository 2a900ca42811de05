#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod error;
pub mod schema;

pub mod util {
    pub mod numeric;
}

pub mod load;

pub mod artifacts;
pub mod assemble;
pub mod join;
pub mod metrics;

pub mod emit;
pub mod pipeline;

// Re-exports: stable API surface
pub use artifacts::{RenameOutcome, rename_images};
pub use assemble::{AggregatedRecord, ResultTable, assemble};
pub use config::ExperimentConfig;
pub use emit::delimited::DelimitedWorkbookEmitter;
pub use emit::{Emitter, WorkbookLayout, output_stem};
pub use join::{JoinOutcome, join_compounds};
pub use metrics::{max_theoretical_displacement, top_concentration_displacement};
pub use pipeline::{CompoundSource, RunOptions, RunReport, run_pipeline};
