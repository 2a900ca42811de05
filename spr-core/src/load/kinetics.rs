use super::{Header, cell, line_of, number, require_channel};
use crate::domain::KineticsRow;
use crate::error::{Result, SprError};
use crate::schema::kinetics as col;
use csv::ReaderBuilder;
use std::path::Path;

pub fn load_kinetics(path: &Path) -> Result<Vec<KineticsRow>> {
    let text = super::read_text(path)?;
    parse_kinetics(&text, path)
}

pub fn parse_kinetics(text: &str, origin: &Path) -> Result<Vec<KineticsRow>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(text.as_bytes());
    let header = Header::new(rdr.headers()?);

    let channel = header.require(col::CHANNEL, origin)?;
    let solution = header.require(col::SOLUTION, origin)?;
    let kd = header.require(col::KD, origin)?;
    let ka = header.require(col::KA, origin)?;
    let kd_little = header.require(col::KD_LITTLE, origin)?;
    let kd_kinetic = header
        .nth(col::KD, 1)
        .or_else(|| header.nth(col::KD_KINETIC_ALIAS, 0))
        .ok_or_else(|| {
            SprError::input(
                origin,
                format!("missing second '{}' column (kinetic fit)", col::KD),
            )
        })?;

    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let ch = require_channel(&rec, channel, col::CHANNEL, origin, line_of(&rec))?;
        if rows.iter().any(|r: &KineticsRow| r.channel == ch) {
            return Err(SprError::input(
                origin,
                format!("line {}: channel {ch} appears twice", line_of(&rec)),
            ));
        }
        rows.push(KineticsRow {
            channel: ch,
            solution: cell(&rec, solution).to_string(),
            kd_m: number(&rec, kd),
            ka: number(&rec, ka),
            kd_little: number(&rec, kd_little),
            kd_kinetic_m: number(&rec, kd_kinetic),
        });
    }
    tracing::debug!(rows = rows.len(), source = %origin.display(), "kinetics loaded");
    Ok(rows)
}
