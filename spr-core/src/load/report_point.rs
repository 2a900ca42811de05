use super::{Header, cell, line_of, number, require_channel, require_number};
use crate::domain::ReportPointRow;
use crate::error::Result;
use crate::schema::report_point as col;
use csv::ReaderBuilder;
use std::path::Path;

/// Loads the report-point table. The export carries `skip_rows` title lines
/// above the header.
pub fn load_report_points(path: &Path, skip_rows: usize) -> Result<Vec<ReportPointRow>> {
    let text = super::read_text(path)?;
    parse_report_points(&text, skip_rows, path)
}

pub fn parse_report_points(
    text: &str,
    skip_rows: usize,
    origin: &Path,
) -> Result<Vec<ReportPointRow>> {
    let body = skip_lines(text, skip_rows);
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(body.as_bytes());
    let header = Header::new(rdr.headers()?);

    let cycle = header.require(col::CYCLE, origin)?;
    let channel = header.require(col::CHANNEL, origin)?;
    let flow_cell = header.require(col::FLOW_CELL, origin)?;
    let sensorgram = header.require(col::SENSORGRAM_TYPE, origin)?;
    let name = header.require(col::NAME, origin)?;
    let purpose = header.require(col::STEP_PURPOSE, origin)?;
    let response = header.require(col::RELATIVE_RESPONSE, origin)?;
    let conc = header.require(col::CONCENTRATION, origin)?;
    let flanking = header.require(col::FLANKING_SOLUTION, origin)?;

    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let line = line_of(&rec) + skip_rows as u64;
        let ch = require_channel(&rec, channel, col::CHANNEL, origin, line)?;
        let cycle_no = require_number(&rec, cycle, col::CYCLE, origin)?;
        let flank = cell(&rec, flanking);

        rows.push(ReportPointRow {
            cycle: cycle_no as u32,
            channel: ch,
            flow_cell: cell(&rec, flow_cell).to_string(),
            sensorgram_type: cell(&rec, sensorgram).to_string(),
            name: cell(&rec, name).to_string(),
            step_purpose: cell(&rec, purpose).to_string(),
            relative_response_ru: require_number(&rec, response, col::RELATIVE_RESPONSE, origin)?,
            concentration_um: number(&rec, conc),
            flanking_solution: (!flank.is_empty()).then(|| flank.to_string()),
        });
    }
    tracing::debug!(rows = rows.len(), source = %origin.display(), "report points loaded");
    Ok(rows)
}

fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text.trim_start_matches('\u{feff}');
    for _ in 0..n {
        match rest.find('\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return "",
        }
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SprError;

    const HEADER: &str = "Cycle\tChannel\tFlow cell\tSensorgram type\tName\tStep purpose\t\
        Relative response (RU)\tA-B-A 1 Concentration (µM)\tA-B-A 1 Flanking solution";

    #[test]
    fn skips_title_lines_and_reads_rows() {
        let text = format!(
            "Report point table\nexported 2019-09-16\n{HEADER}\n\
             4\t1\t2-1\tCorrected\tA-B-A binding late_1\tAnalysis\t-12.5\t50\tBRD-5678_a\n\
             5\t1\t2-1\tCorrected\tA-B-A binding late_1\tBlank\t-10\t\t\n"
        );
        let rows = parse_report_points(&text, 2, Path::new("rpt.txt")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cycle, 4);
        assert_eq!(rows[0].concentration_um, Some(50.0));
        assert_eq!(rows[0].merge_key(), Some("BRD-5678"));
        assert_eq!(rows[1].concentration_um, None);
        assert_eq!(rows[1].flanking_solution, None);
    }

    #[test]
    fn missing_column_is_reported() {
        let text = "a\nb\nCycle\tChannel\n1\t1\n";
        let err = parse_report_points(text, 2, Path::new("rpt.txt")).unwrap_err();
        assert!(err.to_string().contains("Flow cell"), "{err}");
    }

    #[test]
    fn out_of_range_channel_is_an_input_error() {
        let text = format!(
            "t\nt\n{HEADER}\n1\t12\t2-1\tCorrected\tA-B-A binding late_1\tAnalysis\t-1\t0\t\n"
        );
        let err = parse_report_points(&text, 2, Path::new("rpt.txt")).unwrap_err();
        assert!(matches!(err, SprError::Input { .. }), "{err}");
    }

    #[test]
    fn fractional_channel_is_not_truncated() {
        let text = format!(
            "t\nt\n{HEADER}\n1\t1.5\t2-1\tCorrected\tA-B-A binding late_1\tAnalysis\t-1\t0\t\n"
        );
        let err = parse_report_points(&text, 2, Path::new("rpt.txt")).unwrap_err();
        assert!(err.to_string().contains("not a whole number"), "{err}");
    }
}
