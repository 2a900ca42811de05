use super::{Header, cell, line_of, require_number};
use crate::domain::CompoundRecord;
use crate::error::{Result, SprError};
use crate::schema::compound_set as col;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

pub fn load_compound_set(path: &Path) -> Result<Vec<CompoundRecord>> {
    let text = super::read_text(path)?;
    read_compound_set(text.as_bytes(), super::delimiter_for(path), path)
}

/// Reads a compound-set table from any source; `origin` only labels errors.
pub fn read_compound_set<R: Read>(
    src: R,
    delimiter: u8,
    origin: &Path,
) -> Result<Vec<CompoundRecord>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(src);
    let header = Header::new(rdr.headers()?);
    let id_idx = header.require(col::BROAD_ID, origin)?;
    let conc_idx = header.require(col::TEST_CONC, origin)?;
    let mw_idx = header.require(col::MW, origin)?;

    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let broad_id = cell(&rec, id_idx);
        if broad_id.is_empty() {
            return Err(SprError::input(
                origin,
                format!("line {}: empty '{}'", line_of(&rec), col::BROAD_ID),
            ));
        }
        out.push(CompoundRecord {
            broad_id: broad_id.to_string(),
            test_conc_um: require_number(&rec, conc_idx, col::TEST_CONC, origin)?,
            mw: require_number(&rec, mw_idx, col::MW, origin)?,
        });
    }
    tracing::debug!(rows = out.len(), source = %origin.display(), "compound set loaded");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_comma_separated_table() {
        let text = "Broad ID,Plate,Test [Cpd] uM,MW\n\
                    BRD-K12345678-001-01-1,P1,50,312.4\n\
                    BRD-K00001111-001-01-1,P1,25.0,288\n";
        let rows = read_compound_set(text.as_bytes(), b',', Path::new("mem")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].test_conc_um, 50.0);
        assert_eq!(rows[1].mw, 288.0);
    }

    #[test]
    fn reads_pasted_tab_separated_table() {
        let text = "Broad ID\tTest [Cpd] uM\tMW\nBRD-K12345678-001-01-1\t50\t312.4\n";
        let rows = read_compound_set(text.as_bytes(), b'\t', Path::new("stdin")).unwrap();
        assert_eq!(rows[0].broad_id, "BRD-K12345678-001-01-1");
    }

    #[test]
    fn missing_column_is_an_input_error() {
        let text = "Broad ID,MW\nBRD-K12345678-001-01-1,312.4\n";
        let err = read_compound_set(text.as_bytes(), b',', Path::new("mem")).unwrap_err();
        assert!(err.to_string().contains("Test [Cpd] uM"), "{err}");
    }

    #[test]
    fn non_numeric_concentration_is_an_input_error() {
        let text = "Broad ID,Test [Cpd] uM,MW\nBRD-K12345678-001-01-1,high,312.4\n";
        assert!(read_compound_set(text.as_bytes(), b',', Path::new("mem")).is_err());
    }
}
