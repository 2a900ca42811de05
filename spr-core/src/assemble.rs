//! Builds the ingestion table: one row per compound of the compound set,
//! with every channel-scoped value looked up by the channel the compound was
//! measured on.

use crate::artifacts::RenameOutcome;
use crate::config::ExperimentConfig;
use crate::domain::{Channel, CompoundRecord, KineticsRow};
use crate::error::{Result, SprError};
use crate::metrics::{MaxDisplacement, TopDisplacement, TopDisplacementOutcome};
use crate::join::MergeKey;
use crate::schema::{FLOW_CELL_LABEL, OUTPUT_COLUMNS};
use crate::util::numeric::percent_of;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const M_TO_UM: f64 = 1_000_000.0;

/// Zero-based field of the renamed steady-state image that goes into `UNIQUE_ID`.
const UNIQUE_TOKEN_FIELD: usize = 5;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregatedRecord {
    /// Channel the compound was measured on, if it matched a report point.
    pub channel: Option<Channel>,
    pub broad_id: String,
    pub project_code: String,
    pub top_compound_um: f64,
    pub max_theoretical_disp_ru: Option<f64>,
    pub ru_top_cmpd: Option<f64>,
    pub disp_top_cmpd: Option<f64>,
    pub ic50_um: Option<f64>,
    pub ka_1_1_binding: Option<f64>,
    pub kd_little_1_1_binding: Option<f64>,
    pub kd_1_1_binding_um: Option<f64>,
    pub fc: String,
    pub protein_ru: Option<f64>,
    pub protein_mw: Option<f64>,
    pub protein_id: Option<String>,
    pub protein_floated_id: String,
    pub protein_floated_conc_um: f64,
    pub protein_floated_mw: f64,
    pub mw: f64,
    pub instrument: String,
    pub exp_date: String,
    pub nucleotide: String,
    pub chip_lot: String,
    pub operator: String,
    pub protocol_id: String,
    pub raw_data_file: String,
    pub dir_folder: String,
    pub unique_id: Option<String>,
    pub ss_img_id: Option<String>,
    pub senso_img_id: Option<String>,
    /// Renamed image file names, for anchoring pictures next to the row.
    pub ss_img_file: Option<String>,
    pub senso_img_file: Option<String>,
}

fn num(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn text(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

impl AggregatedRecord {
    /// Cell values in template column order.
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.broad_id.clone(),
            self.project_code.clone(),
            String::new(), // CURVE_VALID
            String::new(), // STEADY_STATE_IMG
            String::new(), // 1to1_IMG
            self.top_compound_um.to_string(),
            num(self.max_theoretical_disp_ru),
            num(self.ru_top_cmpd),
            num(self.disp_top_cmpd),
            num(self.ic50_um),
            num(self.ka_1_1_binding),
            num(self.kd_little_1_1_binding),
            num(self.kd_1_1_binding_um),
            String::new(), // COMMENTS
            self.fc.clone(),
            num(self.protein_ru),
            num(self.protein_mw),
            text(&self.protein_id),
            self.protein_floated_id.clone(),
            self.protein_floated_conc_um.to_string(),
            self.protein_floated_mw.to_string(),
            self.mw.to_string(),
            self.instrument.clone(),
            self.exp_date.clone(),
            self.nucleotide.clone(),
            self.chip_lot.clone(),
            self.operator.clone(),
            self.protocol_id.clone(),
            self.raw_data_file.clone(),
            self.dir_folder.clone(),
            text(&self.unique_id),
            text(&self.ss_img_id),
            text(&self.senso_img_id),
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultTable {
    pub rows: Vec<AggregatedRecord>,
}

impl ResultTable {
    pub fn header(&self) -> &'static [&'static str] {
        &OUTPUT_COLUMNS
    }

    pub fn cell_rows(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(AggregatedRecord::cells).collect()
    }
}

pub struct AssemblyInputs<'a> {
    pub config: &'a ExperimentConfig,
    pub compounds: &'a [CompoundRecord],
    pub max_displacement: &'a MaxDisplacement,
    pub top: &'a TopDisplacementOutcome,
    pub kinetics: &'a [KineticsRow],
    pub ss_images: &'a RenameOutcome,
    pub senso_images: &'a RenameOutcome,
}

/// `dir` with its mount prefix swapped for the UNC prefix, joined to `file`.
pub fn network_path(dir: &Path, file: &str, mount_prefix: &str, unc_prefix: &str) -> String {
    let dir = dir.to_string_lossy();
    let dir = match dir.strip_prefix(mount_prefix) {
        Some(rest) if !mount_prefix.is_empty() => format!("{unc_prefix}{rest}"),
        _ => dir.into_owned(),
    };
    format!("{}/{file}", dir.trim_end_matches('/'))
}

/// Sixth `_`-separated field of an image name, extension removed.
pub fn unique_token(image_file: &str) -> Option<&str> {
    let stem = image_file
        .strip_suffix(".png")
        .or_else(|| image_file.strip_suffix(".PNG"))
        .unwrap_or(image_file);
    stem.split('_').nth(UNIQUE_TOKEN_FIELD)
}

/// Picks the measurement for each compound: the lowest channel carrying its
/// join key that no earlier compound took. A compound listed twice falls back
/// to sharing the first channel.
fn assign_measurements<'t>(
    compounds: &[CompoundRecord],
    top: &'t [TopDisplacement],
) -> Vec<Option<&'t TopDisplacement>> {
    let mut used: HashSet<Channel> = HashSet::new();
    compounds
        .iter()
        .map(|c| {
            let key = MergeKey::for_compound(c)?;
            let mut candidates = top.iter().filter(|t| t.record.key == key);
            let first = candidates.clone().next()?;
            match candidates.find(|t| !used.contains(&t.record.channel)) {
                Some(t) => {
                    used.insert(t.record.channel);
                    Some(t)
                }
                None => {
                    tracing::warn!(
                        broad_id = %c.broad_id,
                        channel = %first.record.channel,
                        "compound shares its measurement with an earlier row"
                    );
                    Some(first)
                }
            }
        })
        .collect()
}

pub fn assemble(inputs: &AssemblyInputs<'_>) -> Result<ResultTable> {
    let cfg = inputs.config;
    let meta = &cfg.meta;
    let kinetics: BTreeMap<Channel, &KineticsRow> =
        inputs.kinetics.iter().map(|k| (k.channel, k)).collect();
    let measurements = assign_measurements(inputs.compounds, &inputs.top.rows);

    let mut rows = Vec::with_capacity(inputs.compounds.len());
    for (compound, measured) in inputs.compounds.iter().zip(measurements) {
        let mut rec = AggregatedRecord {
            broad_id: compound.broad_id.clone(),
            project_code: meta.project_code.clone(),
            top_compound_um: compound.test_conc_um,
            fc: FLOW_CELL_LABEL.to_string(),
            protein_floated_id: meta.protein_floated_id.clone(),
            protein_floated_conc_um: meta.protein_floated_conc_um,
            protein_floated_mw: meta.protein_floated_mw,
            mw: compound.mw,
            instrument: meta.instrument.name.clone(),
            exp_date: meta.experiment_date.clone(),
            nucleotide: meta.nucleotide.clone(),
            chip_lot: meta.chip_lot.clone(),
            operator: meta.operator.clone(),
            protocol_id: meta.protocol.clone(),
            raw_data_file: meta.raw_data_filename.clone(),
            dir_folder: meta.directory_folder.clone(),
            ..AggregatedRecord::default()
        };

        if let Some(m) = measured {
            let ch = m.record.channel;
            rec.channel = Some(ch);
            fill_channel_values(&mut rec, ch, m.displacement_ru, inputs, &kinetics)?;
        }
        rows.push(rec);
    }

    // Channel ascending; unmatched compounds keep their set order at the end.
    rows.sort_by_key(|r| (r.channel.is_none(), r.channel));
    tracing::info!(rows = rows.len(), "result table assembled");
    Ok(ResultTable { rows })
}

fn fill_channel_values(
    rec: &mut AggregatedRecord,
    ch: Channel,
    top_disp: f64,
    inputs: &AssemblyInputs<'_>,
    kinetics: &BTreeMap<Channel, &KineticsRow>,
) -> Result<()> {
    let cfg = inputs.config;

    rec.max_theoretical_disp_ru = inputs.max_displacement.for_channel(ch);
    if let Some(max) = rec.max_theoretical_disp_ru {
        let ru_top = max - top_disp;
        rec.ru_top_cmpd = Some(ru_top);
        rec.disp_top_cmpd = percent_of(ru_top, max);
        if rec.disp_top_cmpd.is_none() {
            tracing::warn!(
                broad_id = %rec.broad_id,
                channel = %ch,
                max_theoretical_disp_ru = max,
                "max theoretical displacement cannot divide; DISP_TOP_CMPD left empty"
            );
        }
    }

    if let Some(p) = cfg.channels.get(&ch) {
        rec.protein_ru = Some(p.protein_ru);
        rec.protein_mw = Some(p.protein_mw);
        rec.protein_id = Some(p.protein_id.clone());
    }

    let Some(k) = kinetics.get(&ch) else {
        tracing::warn!(channel = %ch, broad_id = %rec.broad_id, "no kinetics row for channel");
        return Ok(());
    };
    rec.ic50_um = k.kd_m.map(|v| v * M_TO_UM);
    rec.ka_1_1_binding = k.ka;
    rec.kd_little_1_1_binding = k.kd_little;
    rec.kd_1_1_binding_um = k.kd_kinetic_m.map(|v| v * M_TO_UM);

    let paths = &cfg.paths;
    rec.ss_img_file = inputs.ss_images.renamed.get(&ch).cloned();
    rec.senso_img_file = inputs.senso_images.renamed.get(&ch).cloned();
    rec.ss_img_id = rec
        .ss_img_file
        .as_deref()
        .map(|f| network_path(&paths.ss_img, f, &paths.mount_prefix, &paths.unc_prefix));
    rec.senso_img_id = rec
        .senso_img_file
        .as_deref()
        .map(|f| network_path(&paths.senso_img, f, &paths.mount_prefix, &paths.unc_prefix));

    match rec.ss_img_file.as_deref() {
        Some(file) => {
            let token = unique_token(file).ok_or_else(|| {
                SprError::Assembly(format!(
                    "steady-state image '{file}' has no field {} to build UNIQUE_ID from",
                    UNIQUE_TOKEN_FIELD + 1
                ))
            })?;
            rec.unique_id = Some(format!(
                "{}_{}_{}_{}_{}",
                k.solution, rec.fc, rec.project_code, rec.exp_date, token
            ));
        }
        None => {
            tracing::warn!(channel = %ch, "no steady-state image; UNIQUE_ID left empty");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_prefix_is_rewritten() {
        assert_eq!(
            network_path(Path::new("/Volumes/spr/ss"), "a.png", "/Volumes", "//flynn"),
            "//flynn/spr/ss/a.png"
        );
        assert_eq!(
            network_path(Path::new("/data/ss/"), "a.png", "/Volumes", "//flynn"),
            "/data/ss/a.png"
        );
    }

    #[test]
    fn unique_token_is_the_sixth_field() {
        assert_eq!(unique_token("BRD-5678_s_190916_run_42_1.png"), Some("1"));
        assert_eq!(unique_token("S_raw_42_1.png"), None);
    }

    #[test]
    fn header_has_the_fixed_width() {
        let table = ResultTable::default();
        assert_eq!(table.header().len(), 33);
        assert_eq!(AggregatedRecord::default().cells().len(), table.header().len());
    }
}
