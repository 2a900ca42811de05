use spr_core::error::SprError;
use spr_core::schema::OUTPUT_COLUMNS;
use spr_core::{DelimitedWorkbookEmitter, ExperimentConfig, RunOptions, run_pipeline};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

const COMPOUNDS: &str = "Broad ID,Plate,Test [Cpd] uM,MW
BRD-K12345678-001-01-1,P1,50,312.4
BRD-K00004321-001-01-1,P1,25,288
BRD-K00009999-001-01-1,P1,10,200
";

const REPORT_HEADER: &str = "Cycle\tChannel\tFlow cell\tSensorgram type\tName\tStep purpose\t\
    Relative response (RU)\tA-B-A 1 Concentration (µM)\tA-B-A 1 Flanking solution";

const KINETICS: &str = "Channel\tA-B-A 1 Solution\tKD (M)\tka (1/Ms)\tkd (1/s)\tKD (M)
1\tBRD-5678_s\t2.5e-6\t1000\t0.01\t1e-5
2\tBRD-4321_c\t4e-6\t2000\t0.02\t3e-6
";

fn report_line(
    cycle: u32,
    ch: u8,
    kind: &str,
    purpose: &str,
    ru: f64,
    conc: f64,
    flank: &str,
) -> String {
    format!("{cycle}\t{ch}\t2-1\t{kind}\tA-B-A binding late_1\t{purpose}\t{ru}\t{conc}\t{flank}\n")
}

fn report_text() -> String {
    let mut text = String::from("Report point table\nexported 2019-09-16\n");
    text.push_str(REPORT_HEADER);
    text.push('\n');
    for (cycle, ch, ru) in [(1, 1, -100.0), (2, 1, -100.0), (1, 2, -80.0), (2, 2, -80.0)] {
        text.push_str(&report_line(cycle, ch, "Corrected", "Blank", ru, 0.0, ""));
    }
    text.push_str(&report_line(3, 1, "Raw", "Analysis", -999.0, 50.0, "BRD-5678_s"));
    text.push_str(&report_line(3, 1, "Corrected", "Analysis", -30.0, 25.0, "BRD-5678_s"));
    text.push_str(&report_line(4, 1, "Corrected", "Analysis", -55.0, 50.0, "BRD-5678_s"));
    text.push_str(&report_line(4, 2, "Corrected", "Analysis", -20.0, 25.000001, "BRD-4321_c"));
    text
}

struct Fixture {
    _root: TempDir,
    mount: PathBuf,
    ss: PathBuf,
    senso: PathBuf,
    out: PathBuf,
    config: PathBuf,
}

fn fixture(instrument: &str, num_fc_used: usize) -> Fixture {
    let root = tempdir().unwrap();
    let mount = root.path().join("mnt");
    let data = mount.join("spr");
    let ss = data.join("ss");
    let senso = data.join("senso");
    let out = root.path().join("out");
    for d in [&ss, &senso, &out] {
        fs::create_dir_all(d).unwrap();
    }
    for (dir, name) in [
        (&ss, "1-steady.png"),
        (&ss, "2-steady.png"),
        (&senso, "1-kinetic.png"),
        (&senso, "2-kinetic.png"),
    ] {
        fs::write(dir.join(name), b"png").unwrap();
    }
    fs::write(data.join("cmpd.csv"), COMPOUNDS).unwrap();
    fs::write(data.join("rpt.txt"), report_text()).unwrap();
    fs::write(data.join("kin.txt"), KINETICS).unwrap();

    let config = root.path().join("experiment.toml");
    let toml = format!(
        r#"
[paths]
master_table = "{data}/cmpd.csv"
ss_img = "{ss}"
senso_img = "{senso}"
kinetics = "{data}/kin.txt"
report_point = "{data}/rpt.txt"
mount_prefix = "{mount}"
unc_prefix = "//flynn"

[meta]
num_fc_used = {num_fc_used}
immobilized_fc = "1, 2"
experiment_date = "190916"
project_code = "PRJ1"
operator = "jdoe"
instrument = "{instrument}"
protocol = "SPR-DOSE-01"
chip_lot = "CL-9"
nucleotide = "GDP"
raw_data_filename = "190916_run"
directory_folder = "spr/2019"
protein_floated_id = "BIP-9000"
protein_floated_conc_um = 0.5
protein_floated_mw = 21000.0

[[channel]]
channel = 1
protein_id = "BIP-0001"
protein_ru = 1500.0
protein_mw = 42000.0

[[channel]]
channel = 2
protein_id = "BIP-0002"
protein_ru = 1600.0
protein_mw = 43000.0
"#,
        data = data.display(),
        ss = ss.display(),
        senso = senso.display(),
        mount = mount.display(),
    );
    fs::write(&config, toml).unwrap();

    Fixture {
        _root: root,
        mount,
        ss,
        senso,
        out,
        config,
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn close(a: Option<f64>, b: f64) -> bool {
    a.is_some_and(|a| (a - b).abs() < 1e-9)
}

#[test]
fn full_run_produces_one_row_per_compound() {
    let fx = fixture("Biacore8k", 2);
    let cfg = ExperimentConfig::from_file(&fx.config).unwrap();
    let emitter = DelimitedWorkbookEmitter::new(&fx.out, "exp_APPVersion_0_1_0");
    let opts = RunOptions {
        disambiguator: Some(42),
        ..RunOptions::default()
    };

    let report = run_pipeline(&cfg, &opts, &emitter).unwrap();
    let rows = &report.table.rows;
    assert_eq!(rows.len(), 3);
    assert_eq!(report.unmatched_compounds, vec!["BRD-K00009999-001-01-1"]);

    let first = &rows[0];
    assert_eq!(first.broad_id, "BRD-K12345678-001-01-1");
    assert_eq!(first.max_theoretical_disp_ru, Some(100.0));
    assert_eq!(first.ru_top_cmpd, Some(45.0));
    assert_eq!(first.disp_top_cmpd, Some(45.0));
    assert!(close(first.ic50_um, 2.5));
    assert!(close(first.kd_1_1_binding_um, 10.0));
    assert_eq!(first.protein_id.as_deref(), Some("BIP-0001"));
    assert_eq!(first.fc, "2-1");
    assert_eq!(first.ss_img_file.as_deref(), Some("BRD-5678_s_190916_run_42_1.png"));
    assert_eq!(
        first.ss_img_id.as_deref(),
        Some("//flynn/spr/ss/BRD-5678_s_190916_run_42_1.png")
    );
    assert_eq!(first.unique_id.as_deref(), Some("BRD-5678_s_2-1_PRJ1_190916_1"));

    let second = &rows[1];
    assert_eq!(second.broad_id, "BRD-K00004321-001-01-1");
    assert_eq!(second.max_theoretical_disp_ru, Some(80.0));
    assert_eq!(second.disp_top_cmpd, Some(75.0));
    assert_eq!(second.protein_ru, Some(1600.0));
    assert_eq!(
        second.senso_img_file.as_deref(),
        Some("BRD-4321_c_190916_run_42_2.png")
    );

    let unmatched = &rows[2];
    assert_eq!(unmatched.channel, None);
    assert_eq!(unmatched.max_theoretical_disp_ru, None);
    assert_eq!(unmatched.project_code, "PRJ1");
    assert_eq!(unmatched.instrument, "Biacore8k");

    assert_eq!(
        file_names(&fx.ss),
        vec!["BRD-4321_c_190916_run_42_2.png", "BRD-5678_s_190916_run_42_1.png"]
    );
    assert_eq!(
        file_names(&fx.senso),
        vec!["BRD-4321_c_190916_run_42_2.png", "BRD-5678_s_190916_run_42_1.png"]
    );
    assert!(fx.mount.is_dir());

    assert_eq!(report.output, fx.out.join("exp_APPVersion_0_1_0"));
    let mut rdr = csv::Reader::from_path(report.output.join("Sheet1.csv")).unwrap();
    let header: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, OUTPUT_COLUMNS);
    assert_eq!(rdr.records().count(), 3);
}

#[test]
fn channel_count_mismatch_is_rejected_before_any_export_is_read() {
    let fx = fixture("Biacore8k", 3);
    fs::remove_dir_all(&fx.ss).unwrap();
    let err = ExperimentConfig::from_file(&fx.config).unwrap_err();
    assert!(matches!(err, SprError::Config(_)));
    assert!(err.to_string().contains("not equal"));
}

#[test]
fn serial_read_instrument_is_refused_and_images_stay_put() {
    let fx = fixture("BiacoreS200", 2);
    let cfg = ExperimentConfig::from_file(&fx.config).unwrap();
    let emitter = DelimitedWorkbookEmitter::new(&fx.out, "exp");
    let err = run_pipeline(&cfg, &RunOptions::default(), &emitter).unwrap_err();
    assert!(matches!(err, SprError::Instrument(_)));
    assert_eq!(file_names(&fx.ss), vec!["1-steady.png", "2-steady.png"]);
    assert_eq!(file_names(&fx.senso), vec!["1-kinetic.png", "2-kinetic.png"]);
    assert!(file_names(&fx.out).is_empty());
}

#[test]
fn taken_output_fails_before_any_rename_and_the_run_can_be_repeated() {
    let fx = fixture("Biacore8k", 2);
    fs::create_dir_all(fx.out.join("exp")).unwrap();
    let cfg = ExperimentConfig::from_file(&fx.config).unwrap();
    let opts = RunOptions {
        disambiguator: Some(10),
        ..RunOptions::default()
    };

    let taken = DelimitedWorkbookEmitter::new(&fx.out, "exp");
    let err = run_pipeline(&cfg, &opts, &taken).unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert_eq!(file_names(&fx.ss), vec!["1-steady.png", "2-steady.png"]);
    assert_eq!(file_names(&fx.senso), vec!["1-kinetic.png", "2-kinetic.png"]);

    let fresh = DelimitedWorkbookEmitter::new(&fx.out, "exp2");
    let report = run_pipeline(&cfg, &opts, &fresh).unwrap();
    assert_eq!(report.table.rows.len(), 3);
    assert_eq!(
        file_names(&fx.ss),
        vec!["BRD-4321_c_190916_run_10_2.png", "BRD-5678_s_190916_run_10_1.png"]
    );
}

#[test]
fn unusable_image_name_fails_with_images_and_output_untouched() {
    let fx = fixture("Biacore8k", 2);
    let text = fs::read_to_string(&fx.config)
        .unwrap()
        .replace("raw_data_filename = \"190916_run\"", "raw_data_filename = \"run1\"");
    fs::write(&fx.config, text).unwrap();
    let cfg = ExperimentConfig::from_file(&fx.config).unwrap();
    let emitter = DelimitedWorkbookEmitter::new(&fx.out, "exp");
    let opts = RunOptions {
        disambiguator: Some(10),
        ..RunOptions::default()
    };

    let err = run_pipeline(&cfg, &opts, &emitter).unwrap_err();
    assert!(matches!(err, SprError::Assembly(_)), "{err}");
    assert_eq!(file_names(&fx.ss), vec!["1-steady.png", "2-steady.png"]);
    assert_eq!(file_names(&fx.senso), vec!["1-kinetic.png", "2-kinetic.png"]);
    assert!(file_names(&fx.out).is_empty());
}
