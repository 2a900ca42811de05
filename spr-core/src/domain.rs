// spr_core/src/domain.rs
use crate::error::{Result, SprError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Instrument lane number. Channels run 1..=8 on the parallel-read instrument.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Channel(u8);

impl Channel {
    pub const MAX: u8 = 8;

    pub fn new(n: i64) -> Result<Self> {
        if (1..=Self::MAX as i64).contains(&n) {
            Ok(Channel(n as u8))
        } else {
            Err(SprError::Config(format!(
                "channel {n} outside supported range 1..={}",
                Self::MAX
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompoundRecord {
    pub broad_id: String,
    pub test_conc_um: f64,
    pub mw: f64,
}

impl CompoundRecord {
    /// Short id shared with the report-point flanking solution, e.g.
    /// `BRD-K12345678-001-01-1` -> `BRD-5678`.
    pub fn merge_key(&self) -> Option<String> {
        self.broad_id.get(9..13).map(|digits| format!("BRD-{digits}"))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportPointRow {
    pub cycle: u32,
    pub channel: Channel,
    pub flow_cell: String,
    pub sensorgram_type: String,
    pub name: String,
    pub step_purpose: String,
    pub relative_response_ru: f64,
    pub concentration_um: Option<f64>,
    pub flanking_solution: Option<String>,
}

impl ReportPointRow {
    /// Text before the first `_` of the flanking solution label.
    pub fn merge_key(&self) -> Option<&str> {
        self.flanking_solution
            .as_deref()
            .and_then(|s| s.split('_').next())
            .filter(|s| !s.is_empty())
    }
}

/// Steady-state and 1:1 kinetic fit results for one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct KineticsRow {
    pub channel: Channel,
    pub solution: String,
    pub kd_m: Option<f64>,
    pub ka: Option<f64>,
    pub kd_little: Option<f64>,
    pub kd_kinetic_m: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowChannelConfig {
    pub protein_id: String,
    pub protein_ru: f64,
    pub protein_mw: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    SteadyState,
    Sensorgram,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::SteadyState => f.write_str("ss"),
            ImageKind::Sensorgram => f.write_str("senso"),
        }
    }
}

impl FromStr for ImageKind {
    type Err = SprError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ss" | "steady-state" | "steady_state" => Ok(ImageKind::SteadyState),
            "senso" | "sensorgram" | "kinetic" => Ok(ImageKind::Sensorgram),
            other => Err(SprError::Config(format!("unknown image kind '{other}'"))),
        }
    }
}

/// How the instrument reads its flow cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelTopology {
    /// Eight independent channels read in parallel (Biacore 8K).
    ParallelRead,
    /// Several flow cells scanned by one detector (S200, T200, ...).
    SerialRead,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrument {
    pub name: String,
    pub topology: ChannelTopology,
}

impl Instrument {
    pub fn parse(name: &str) -> Self {
        let norm: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let topology = if norm.ends_with("8k") {
            ChannelTopology::ParallelRead
        } else {
            ChannelTopology::SerialRead
        };
        Instrument {
            name: name.trim().to_string(),
            topology,
        }
    }
}
