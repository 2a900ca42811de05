//! Readers for the three tabular inputs. All of them are delimited text; the
//! instrument exports are tab-separated.

pub mod compound_set;
pub mod kinetics;
pub mod report_point;

use crate::domain::Channel;
use crate::error::{Result, SprError};
use csv::StringRecord;
use std::path::Path;

/// Header row of a delimited table, with positional lookup that tolerates
/// repeated column names.
pub(crate) struct Header {
    names: Vec<String>,
}

impl Header {
    pub(crate) fn new(rec: &StringRecord) -> Self {
        let names = rec
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        Self { names }
    }

    /// Position of the `n`th (zero-based) column called `name`.
    pub(crate) fn nth(&self, name: &str, n: usize) -> Option<usize> {
        self.names
            .iter()
            .enumerate()
            .filter(|(_, h)| h.as_str() == name)
            .map(|(i, _)| i)
            .nth(n)
    }

    pub(crate) fn require(&self, name: &str, path: &Path) -> Result<usize> {
        self.nth(name, 0)
            .ok_or_else(|| SprError::input(path, format!("missing column '{name}'")))
    }
}

pub(crate) fn cell(rec: &StringRecord, idx: usize) -> &str {
    rec.get(idx).map(str::trim).unwrap_or("")
}

/// Numeric cell; blanks and text such as `n.a.` read as missing.
pub(crate) fn number(rec: &StringRecord, idx: usize) -> Option<f64> {
    cell(rec, idx).parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn require_number(
    rec: &StringRecord,
    idx: usize,
    column: &str,
    path: &Path,
) -> Result<f64> {
    number(rec, idx).ok_or_else(|| {
        SprError::input(
            path,
            format!(
                "line {}: column '{column}' is not a number: '{}'",
                line_of(rec),
                cell(rec, idx)
            ),
        )
    })
}

/// Channel cell; must hold a whole number in the instrument's range.
pub(crate) fn require_channel(
    rec: &StringRecord,
    idx: usize,
    column: &str,
    path: &Path,
    line: u64,
) -> Result<Channel> {
    let raw = require_number(rec, idx, column, path)?;
    if raw.fract() != 0.0 {
        return Err(SprError::input(
            path,
            format!("line {line}: channel '{}' is not a whole number", cell(rec, idx)),
        ));
    }
    Channel::new(raw as i64).map_err(|e| SprError::input(path, format!("line {line}: {e}")))
}

pub(crate) fn line_of(rec: &StringRecord) -> u64 {
    rec.position().map(|p| p.line()).unwrap_or(0)
}

/// Tab for `.txt`/`.tsv`/`.xls` exports, comma otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("txt") | Some("tsv") | Some("tab") | Some("xls") => b'\t',
        _ => b',',
    }
}

pub(crate) fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| SprError::input(path, format!("the file could not be imported: {e}")))
}
