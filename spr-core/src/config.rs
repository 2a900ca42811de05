//! Experiment configuration: input paths, run metadata and the per-channel
//! immobilization table.
//!
//! ```toml
//! [paths]
//! master_table = "/Volumes/spr/cmpd_set.csv"
//! ss_img = "/Volumes/spr/ss_images"
//! senso_img = "/Volumes/spr/senso_images"
//! kinetics = "/Volumes/spr/ss_and_kinetics.txt"
//! report_point = "/Volumes/spr/report_point.txt"
//!
//! [meta]
//! num_fc_used = 2
//! immobilized_fc = "1, 2"
//! instrument = "Biacore8k"
//! # ...
//!
//! [[channel]]
//! channel = 1
//! protein_id = "BIP-0001"
//! protein_ru = 1520.0
//! protein_mw = 42000.0
//! ```

use crate::domain::{Channel, FlowChannelConfig, Instrument};
use crate::error::{Result, SprError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_MOUNT_PREFIX: &str = "/Volumes";
pub const DEFAULT_UNC_PREFIX: &str = "//flynn";

fn default_mount_prefix() -> String {
    DEFAULT_MOUNT_PREFIX.to_string()
}

fn default_unc_prefix() -> String {
    DEFAULT_UNC_PREFIX.to_string()
}

fn default_skip_rows() -> usize {
    crate::schema::report_point::SKIP_ROWS
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    /// Compound-set table; may be omitted when the table arrives on stdin.
    #[serde(default)]
    pub master_table: Option<PathBuf>,
    pub ss_img: PathBuf,
    pub senso_img: PathBuf,
    pub kinetics: PathBuf,
    pub report_point: PathBuf,
    #[serde(default = "default_skip_rows")]
    pub report_point_skip_rows: usize,
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,
    #[serde(default = "default_unc_prefix")]
    pub unc_prefix: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum ChannelList {
    Text(String),
    List(Vec<i64>),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMeta {
    num_fc_used: usize,
    immobilized_fc: ChannelList,
    experiment_date: String,
    project_code: String,
    operator: String,
    instrument: String,
    protocol: String,
    chip_lot: String,
    nucleotide: String,
    raw_data_filename: String,
    directory_folder: String,
    protein_floated_id: String,
    protein_floated_conc_um: f64,
    protein_floated_mw: f64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChannel {
    channel: i64,
    protein_id: String,
    protein_ru: f64,
    protein_mw: f64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    paths: PathsSection,
    meta: RawMeta,
    #[serde(default, rename = "channel")]
    channels: Vec<RawChannel>,
}

/// Run metadata copied verbatim into every output row.
#[derive(Clone, Debug, PartialEq)]
pub struct RunMeta {
    pub experiment_date: String,
    pub project_code: String,
    pub operator: String,
    pub instrument: Instrument,
    pub protocol: String,
    pub chip_lot: String,
    pub nucleotide: String,
    pub raw_data_filename: String,
    pub directory_folder: String,
    pub protein_floated_id: String,
    pub protein_floated_conc_um: f64,
    pub protein_floated_mw: f64,
}

#[derive(Clone, Debug)]
pub struct ExperimentConfig {
    pub paths: PathsSection,
    pub meta: RunMeta,
    /// Immobilized channels in the order they were declared.
    pub immobilized: Vec<Channel>,
    /// Only channels that appear in `immobilized`.
    pub channels: BTreeMap<Channel, FlowChannelConfig>,
}

impl ExperimentConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SprError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self> {
        let immobilized = parse_channel_list(&raw.meta.immobilized_fc)?;
        if raw.meta.num_fc_used != immobilized.len() {
            return Err(SprError::Config(format!(
                "the number of flow channels used ({}) is not equal to the number of immobilized flow channels ({})",
                raw.meta.num_fc_used,
                immobilized.len()
            )));
        }

        let mut declared = BTreeMap::new();
        for c in raw.channels {
            let ch = Channel::new(c.channel)?;
            let cfg = FlowChannelConfig {
                protein_id: c.protein_id,
                protein_ru: c.protein_ru,
                protein_mw: c.protein_mw,
            };
            if declared.insert(ch, cfg).is_some() {
                return Err(SprError::Config(format!(
                    "channel {ch} is described more than once"
                )));
            }
        }

        let mut channels = BTreeMap::new();
        for ch in &immobilized {
            let cfg = declared.remove(ch).ok_or_else(|| {
                SprError::Config(format!("immobilized channel {ch} has no [[channel]] entry"))
            })?;
            channels.insert(*ch, cfg);
        }
        if !declared.is_empty() {
            tracing::debug!(
                unused = ?declared.keys().collect::<Vec<_>>(),
                "ignoring channel entries that were not immobilized"
            );
        }

        let m = raw.meta;
        let meta = RunMeta {
            experiment_date: m.experiment_date,
            project_code: m.project_code,
            operator: m.operator,
            instrument: Instrument::parse(&m.instrument),
            protocol: m.protocol,
            chip_lot: m.chip_lot,
            nucleotide: m.nucleotide,
            raw_data_filename: m.raw_data_filename,
            directory_folder: m.directory_folder,
            protein_floated_id: m.protein_floated_id,
            protein_floated_conc_um: m.protein_floated_conc_um,
            protein_floated_mw: m.protein_floated_mw,
        };

        Ok(Self {
            paths: raw.paths,
            meta,
            immobilized,
            channels,
        })
    }
}

fn parse_channel_list(list: &ChannelList) -> Result<Vec<Channel>> {
    let numbers: Vec<i64> = match list {
        ChannelList::List(v) => v.clone(),
        ChannelList::Text(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<i64>().map_err(|_| {
                    SprError::Config(format!("immobilized_fc entry '{t}' is not an integer"))
                })
            })
            .collect::<Result<_>>()?,
    };
    if numbers.is_empty() {
        return Err(SprError::Config("immobilized_fc is empty".into()));
    }
    let mut out: Vec<Channel> = Vec::with_capacity(numbers.len());
    for n in numbers {
        let ch = Channel::new(n)?;
        if out.contains(&ch) {
            return Err(SprError::Config(format!(
                "immobilized_fc lists channel {ch} twice"
            )));
        }
        out.push(ch);
    }
    Ok(out)
}
