//! One aggregation run, start to finish. Stages run in sequence and any error
//! ends the run. Everything that can be checked is checked before the first
//! image is renamed, and a failed write puts the image names back, so a failed
//! run can always be repeated.

use crate::artifacts::{RenameOutcome, RenamePlan, plan_renames, random_disambiguator};
use crate::assemble::{AssemblyInputs, ResultTable, assemble};
use crate::config::ExperimentConfig;
use crate::domain::{CompoundRecord, ImageKind, ReportPointRow};
use crate::emit::{Emitter, WorkbookLayout};
use crate::error::{Result, SprError};
use crate::load::compound_set::load_compound_set;
use crate::load::kinetics::load_kinetics;
use crate::load::report_point::load_report_points;
use crate::metrics::{
    MaxDisplacement, TopDisplacementOutcome, max_theoretical_displacement,
    top_concentration_displacement,
};
use std::path::PathBuf;

#[derive(Clone, Debug, Default)]
pub enum CompoundSource {
    /// `paths.master_table` from the configuration.
    #[default]
    Configured,
    /// Already parsed, e.g. pasted on stdin.
    Table(Vec<CompoundRecord>),
}

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub compounds: CompoundSource,
    /// Fixed image-name disambiguator; drawn at random when `None`.
    pub disambiguator: Option<u8>,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub output: PathBuf,
    pub table: ResultTable,
    pub unmatched_compounds: Vec<String>,
    pub ss_images: RenameOutcome,
    pub senso_images: RenameOutcome,
}

#[derive(Clone, Debug)]
pub struct Metrics {
    pub max_displacement: MaxDisplacement,
    pub top: TopDisplacementOutcome,
}

pub fn load_compounds(
    cfg: &ExperimentConfig,
    source: &CompoundSource,
) -> Result<Vec<CompoundRecord>> {
    match source {
        CompoundSource::Table(rows) => Ok(rows.clone()),
        CompoundSource::Configured => {
            let path = cfg.paths.master_table.as_ref().ok_or_else(|| {
                SprError::Config("paths.master_table is not set and no table was supplied".into())
            })?;
            load_compound_set(path)
        }
    }
}

pub fn load_report(cfg: &ExperimentConfig) -> Result<Vec<ReportPointRow>> {
    load_report_points(&cfg.paths.report_point, cfg.paths.report_point_skip_rows)
}

pub fn compute_metrics(
    cfg: &ExperimentConfig,
    compounds: &[CompoundRecord],
    report: &[ReportPointRow],
) -> Result<Metrics> {
    let max_displacement = max_theoretical_displacement(report, &cfg.immobilized);
    let top = top_concentration_displacement(
        report,
        compounds,
        &cfg.meta.instrument,
        &cfg.immobilized,
    )?;
    Ok(Metrics {
        max_displacement,
        top,
    })
}

pub fn run_pipeline(
    cfg: &ExperimentConfig,
    opts: &RunOptions,
    emitter: &dyn Emitter,
) -> Result<RunReport> {
    tracing::info!(
        instrument = %cfg.meta.instrument.name,
        channels = cfg.immobilized.len(),
        "run started"
    );

    emitter.check()?;

    let compounds = load_compounds(cfg, &opts.compounds)?;
    let report = load_report(cfg)?;
    let kinetics = load_kinetics(&cfg.paths.kinetics)?;
    tracing::info!(
        compounds = compounds.len(),
        report_points = report.len(),
        kinetics = kinetics.len(),
        "inputs loaded"
    );

    let metrics = compute_metrics(cfg, &compounds, &report)?;

    let raw = &cfg.meta.raw_data_filename;
    let ss_plan = plan_renames(
        &cfg.paths.ss_img,
        ImageKind::SteadyState,
        &kinetics,
        raw,
        next_disambiguator(opts)?,
    )?;
    let senso_plan = plan_renames(
        &cfg.paths.senso_img,
        ImageKind::Sensorgram,
        &kinetics,
        raw,
        next_disambiguator(opts)?,
    )?;

    // Assembled against the planned names; the images are still untouched.
    let table = assemble(&AssemblyInputs {
        config: cfg,
        compounds: &compounds,
        max_displacement: &metrics.max_displacement,
        top: &metrics.top,
        kinetics: &kinetics,
        ss_images: ss_plan.outcome(),
        senso_images: senso_plan.outcome(),
    })?;
    let layout = WorkbookLayout::for_table(&table, &cfg.paths.ss_img, &cfg.paths.senso_img);

    let output = write_with_renames(&[&ss_plan, &senso_plan], || {
        emitter.emit(&table, &layout)
    })?;

    let unmatched_compounds = metrics
        .top
        .join
        .unmatched_compounds
        .iter()
        .map(|&i| compounds[i].broad_id.clone())
        .collect();
    tracing::info!(output = %output.display(), "run finished");
    Ok(RunReport {
        output,
        table,
        unmatched_compounds,
        ss_images: ss_plan.into_outcome(),
        senso_images: senso_plan.into_outcome(),
    })
}

/// Applies the renames, then writes. If any step fails, the renames already
/// applied are reverted.
fn write_with_renames<F>(plans: &[&RenamePlan], write: F) -> Result<PathBuf>
where
    F: FnOnce() -> Result<PathBuf>,
{
    for (i, plan) in plans.iter().enumerate() {
        if let Err(e) = plan.apply() {
            plans[..i].iter().rev().for_each(|p| p.revert());
            return Err(e);
        }
    }
    write().inspect_err(|e| {
        tracing::warn!(error = %e, "write failed; restoring image names");
        plans.iter().rev().for_each(|p| p.revert());
    })
}

fn next_disambiguator(opts: &RunOptions) -> Result<u8> {
    match opts.disambiguator {
        Some(n) => Ok(n),
        None => random_disambiguator(),
    }
}
