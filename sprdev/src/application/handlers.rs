use std::env;
use std::path::{Path, PathBuf};

use spr_core::artifacts::{random_disambiguator, rename_images};
use spr_core::domain::ImageKind;
use spr_core::error::Result;
use spr_core::load::compound_set::read_compound_set;
use spr_core::load::kinetics::load_kinetics;
use spr_core::pipeline::{compute_metrics, load_compounds, load_report};
use spr_core::{
    CompoundSource, DelimitedWorkbookEmitter, ExperimentConfig, RunOptions, output_stem,
    run_pipeline,
};

fn default_out_dir() -> Result<PathBuf> {
    if let Some(home) = env::var_os("HOME") {
        let desktop = Path::new(&home).join("Desktop");
        if desktop.is_dir() {
            return Ok(desktop);
        }
    }
    Ok(env::current_dir()?)
}

pub fn handle_run(
    config: PathBuf,
    save_name: String,
    out_dir: Option<PathBuf>,
    stdin_compounds: bool,
    disambiguator: Option<u8>,
) -> Result<()> {
    let cfg = ExperimentConfig::from_file(&config)?;
    let compounds = if stdin_compounds {
        let stdin = std::io::stdin().lock();
        CompoundSource::Table(read_compound_set(stdin, b'\t', Path::new("<stdin>"))?)
    } else {
        CompoundSource::Configured
    };
    let out_dir = match out_dir {
        Some(d) => d,
        None => default_out_dir()?,
    };
    let stem = output_stem(&save_name, env!("CARGO_PKG_VERSION"));
    tracing::debug!(out_dir = %out_dir.display(), %stem, "output target");
    let emitter = DelimitedWorkbookEmitter::new(out_dir, stem);

    let opts = RunOptions {
        compounds,
        disambiguator,
    };
    let report = run_pipeline(&cfg, &opts, &emitter)?;

    for id in &report.unmatched_compounds {
        eprintln!("unmatched compound: {id}");
    }
    println!("{}", report.output.display());
    Ok(())
}

pub fn handle_check(config: PathBuf) -> Result<()> {
    let cfg = ExperimentConfig::from_file(&config)?;
    let channels: Vec<String> = cfg.immobilized.iter().map(|c| c.to_string()).collect();
    println!(
        "ok: {} ({:?}), channels {}",
        cfg.meta.instrument.name,
        cfg.meta.instrument.topology,
        channels.join(",")
    );
    Ok(())
}

pub fn handle_metrics(config: PathBuf) -> Result<()> {
    let cfg = ExperimentConfig::from_file(&config)?;
    let compounds = load_compounds(&cfg, &CompoundSource::Configured)?;
    let report = load_report(&cfg)?;
    let metrics = compute_metrics(&cfg, &compounds, &report)?;

    println!("channel\tmax_theoretical_disp_ru");
    for &ch in &cfg.immobilized {
        let values: Vec<String> = metrics
            .max_displacement
            .values(ch)
            .iter()
            .map(|v| v.to_string())
            .collect();
        println!("{ch}\t{}", values.join(","));
    }
    let all: Vec<String> = metrics
        .max_displacement
        .flattened()
        .iter()
        .map(|v| v.to_string())
        .collect();
    println!("all\t{}", all.join(","));

    println!();
    println!("channel\tflanking_solution\tconcentration_um\tdisplacement_ru");
    for t in &metrics.top.rows {
        println!(
            "{}\t{}\t{}\t{}",
            t.record.channel,
            t.record.flanking_solution,
            t.record.concentration_um,
            t.displacement_ru
        );
    }
    for &i in &metrics.top.join.unmatched_compounds {
        eprintln!("unmatched compound: {}", compounds[i].broad_id);
    }
    Ok(())
}

pub fn handle_rename(
    dir: PathBuf,
    kinetics: PathBuf,
    raw_data_file: String,
    kind: String,
    disambiguator: Option<u8>,
) -> Result<()> {
    let kind: ImageKind = kind.parse()?;
    let rows = load_kinetics(&kinetics)?;
    let nn = match disambiguator {
        Some(n) => n,
        None => random_disambiguator()?,
    };
    let outcome = rename_images(&dir, kind, &rows, &raw_data_file, nn)?;
    tracing::info!(%kind, renamed = outcome.renamed.len(), disambiguator = nn, "images renamed");
    for (ch, name) in &outcome.renamed {
        println!("{ch}\t{name}");
    }
    for f in &outcome.unmatched_files {
        eprintln!("left unchanged: {f}");
    }
    Ok(())
}
