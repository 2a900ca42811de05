//! Inner join of report-point rows with the compound set on
//! (short compound id, concentration rounded to 0.01 µM).

use crate::domain::{Channel, CompoundRecord, ReportPointRow};
use crate::util::numeric::{conc_key, round2};
use std::collections::HashMap;

/// Composite join key: short compound id plus concentration in hundredths.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergeKey {
    pub short_id: String,
    pub conc_hundredths: i64,
}

impl MergeKey {
    pub fn for_compound(c: &CompoundRecord) -> Option<Self> {
        Some(MergeKey {
            short_id: c.merge_key()?,
            conc_hundredths: conc_key(c.test_conc_um),
        })
    }

    pub fn for_row(r: &ReportPointRow) -> Option<Self> {
        Some(MergeKey {
            short_id: r.merge_key()?.to_string(),
            conc_hundredths: conc_key(r.concentration_um?),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinedRecord {
    pub key: MergeKey,
    /// Index into the compound set of the compound this pair came from.
    pub compound: usize,
    pub channel: Channel,
    pub cycle: u32,
    pub flanking_solution: String,
    pub concentration_um: f64,
    pub relative_response_ru: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct JoinOutcome {
    /// One entry per matching (row, compound) pair, in row order.
    pub matched: Vec<JoinedRecord>,
    /// Compound-set indices with no report row at their test concentration.
    pub unmatched_compounds: Vec<usize>,
    /// Rows that no compound claimed (typically the lower doses of a series).
    pub unmatched_rows: Vec<ReportPointRow>,
}

pub fn join_compounds<'a, I>(rows: I, compounds: &[CompoundRecord]) -> JoinOutcome
where
    I: IntoIterator<Item = &'a ReportPointRow>,
{
    let mut by_key: HashMap<MergeKey, Vec<usize>> = HashMap::new();
    let mut unkeyed = Vec::new();
    for (i, c) in compounds.iter().enumerate() {
        match MergeKey::for_compound(c) {
            Some(k) => by_key.entry(k).or_default().push(i),
            None => {
                tracing::warn!(
                    broad_id = %c.broad_id,
                    "compound id too short to derive a join key"
                );
                unkeyed.push(i);
            }
        }
    }

    let mut outcome = JoinOutcome::default();
    let mut claimed = vec![false; compounds.len()];
    for row in rows {
        let hits = MergeKey::for_row(row).and_then(|k| by_key.get(&k).map(|v| (k, v)));
        let Some((key, idxs)) = hits else {
            outcome.unmatched_rows.push(row.clone());
            continue;
        };
        for &i in idxs {
            claimed[i] = true;
            outcome.matched.push(JoinedRecord {
                key: key.clone(),
                compound: i,
                channel: row.channel,
                cycle: row.cycle,
                flanking_solution: row.flanking_solution.clone().unwrap_or_default(),
                concentration_um: row.concentration_um.map(round2).unwrap_or_default(),
                relative_response_ru: row.relative_response_ru,
            });
        }
    }

    outcome.unmatched_compounds = claimed
        .iter()
        .enumerate()
        .filter(|(_, c)| !**c)
        .map(|(i, _)| i)
        .collect();
    for &i in &outcome.unmatched_compounds {
        if !unkeyed.contains(&i) {
            tracing::warn!(
                broad_id = %compounds[i].broad_id,
                test_conc_um = compounds[i].test_conc_um,
                "no report point matches compound at its test concentration"
            );
        }
    }
    tracing::debug!(
        matched = outcome.matched.len(),
        unmatched_rows = outcome.unmatched_rows.len(),
        "report points joined to compound set"
    );
    outcome
}
