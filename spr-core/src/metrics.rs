//! Displacement metrics derived from the report-point table.
//!
//! The instrument reports binding as a negative response, so every value
//! here is negated before it leaves the module.

use crate::domain::{Channel, ChannelTopology, CompoundRecord, Instrument, ReportPointRow};
use crate::error::{Result, SprError};
use crate::join::{JoinOutcome, JoinedRecord, join_compounds};
use crate::schema::report_point::{ANALYSIS, CORRECTED, LATE_BINDING_STEP};
use crate::util::numeric::round2;
use std::collections::{BTreeMap, HashSet};

fn is_late_corrected(r: &ReportPointRow) -> bool {
    r.sensorgram_type == CORRECTED && r.name == LATE_BINDING_STEP
}

/// Averaged blank injections per channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaxDisplacement {
    order: Vec<Channel>,
    per_channel: BTreeMap<Channel, Vec<f64>>,
}

impl MaxDisplacement {
    /// Pair means for one channel, in injection order.
    pub fn values(&self, ch: Channel) -> &[f64] {
        self.per_channel.get(&ch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The value reported for a channel: its first blank pair.
    pub fn for_channel(&self, ch: Channel) -> Option<f64> {
        let v = self.values(ch);
        if v.len() > 1 {
            tracing::warn!(
                channel = %ch,
                pairs = v.len(),
                "channel has several blank pairs; reporting the first"
            );
        }
        v.first().copied()
    }

    /// All pair means, channel by channel in the order they were requested.
    pub fn flattened(&self) -> Vec<f64> {
        self.order
            .iter()
            .flat_map(|ch| self.values(*ch).iter().copied())
            .collect()
    }
}

/// Max theoretical displacement: corrected late-binding responses of the
/// zero-concentration injections, averaged over consecutive pairs and negated.
/// An unpaired trailing blank contributes half its value.
pub fn max_theoretical_displacement(
    rows: &[ReportPointRow],
    channels: &[Channel],
) -> MaxDisplacement {
    let mut out = MaxDisplacement::default();
    for &ch in channels {
        let blanks: Vec<f64> = rows
            .iter()
            .filter(|r| r.channel == ch && is_late_corrected(r) && r.concentration_um == Some(0.0))
            .map(|r| r.relative_response_ru)
            .collect();
        if blanks.len() % 2 != 0 {
            tracing::warn!(
                channel = %ch,
                blanks = blanks.len(),
                "odd number of blank injections; last blank is unpaired"
            );
        }
        if blanks.is_empty() {
            tracing::warn!(channel = %ch, "no blank injections found");
        }
        let means: Vec<f64> = blanks
            .chunks(2)
            .map(|pair| -(pair.iter().sum::<f64>() / 2.0))
            .collect();
        tracing::debug!(channel = %ch, ?means, "max theoretical displacement");
        out.order.push(ch);
        out.per_channel.insert(ch, means);
    }
    out
}

/// Response at the top tested concentration of one compound.
#[derive(Clone, Debug, PartialEq)]
pub struct TopDisplacement {
    pub record: JoinedRecord,
    /// Negated relative response, rounded to 0.01 RU.
    pub displacement_ru: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopDisplacementOutcome {
    /// Ascending by channel.
    pub rows: Vec<TopDisplacement>,
    pub join: JoinOutcome,
}

/// Top-concentration displacement for the parallel-read workflow. Rows on
/// channels outside `channels` are ignored.
pub fn top_concentration_displacement(
    rows: &[ReportPointRow],
    compounds: &[CompoundRecord],
    instrument: &Instrument,
    channels: &[Channel],
) -> Result<TopDisplacementOutcome> {
    if instrument.topology != ChannelTopology::ParallelRead {
        return Err(SprError::Instrument(format!(
            "top-concentration displacement needs a parallel-read instrument such as the Biacore 8K; got '{}'",
            instrument.name
        )));
    }

    let analysis = rows
        .iter()
        .filter(|r| channels.contains(&r.channel))
        .filter(|r| r.step_purpose == ANALYSIS && is_late_corrected(r));
    let join = join_compounds(analysis, compounds);

    let mut seen = HashSet::new();
    let mut kept: Vec<TopDisplacement> = join
        .matched
        .iter()
        .filter(|rec| seen.insert((rec.flanking_solution.clone(), rec.key.conc_hundredths)))
        .map(|rec| TopDisplacement {
            record: rec.clone(),
            displacement_ru: round2(-rec.relative_response_ru),
        })
        .collect();
    kept.sort_by_key(|t| t.record.channel);

    tracing::info!(rows = kept.len(), "top-concentration displacement computed");
    Ok(TopDisplacementOutcome { rows: kept, join })
}
