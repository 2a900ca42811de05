//! Column names shared with the instrument exports and the ingestion template.

/// Report-point export.
pub mod report_point {
    pub const SKIP_ROWS: usize = 2;
    pub const CYCLE: &str = "Cycle";
    pub const CHANNEL: &str = "Channel";
    pub const FLOW_CELL: &str = "Flow cell";
    pub const SENSORGRAM_TYPE: &str = "Sensorgram type";
    pub const NAME: &str = "Name";
    pub const STEP_PURPOSE: &str = "Step purpose";
    pub const RELATIVE_RESPONSE: &str = "Relative response (RU)";
    pub const CONCENTRATION: &str = "A-B-A 1 Concentration (µM)";
    pub const FLANKING_SOLUTION: &str = "A-B-A 1 Flanking solution";

    pub const CORRECTED: &str = "Corrected";
    pub const ANALYSIS: &str = "Analysis";
    pub const LATE_BINDING_STEP: &str = "A-B-A binding late_1";
}

/// Steady-state / kinetics export. `KD (M)` appears twice; the first is the
/// steady-state fit, the second the 1:1 kinetic fit.
pub mod kinetics {
    pub const CHANNEL: &str = "Channel";
    pub const SOLUTION: &str = "A-B-A 1 Solution";
    pub const KD: &str = "KD (M)";
    pub const KD_KINETIC_ALIAS: &str = "KD (M).1";
    pub const KA: &str = "ka (1/Ms)";
    pub const KD_LITTLE: &str = "kd (1/s)";
}

/// Compound-set table.
pub mod compound_set {
    pub const BROAD_ID: &str = "Broad ID";
    pub const TEST_CONC: &str = "Test [Cpd] uM";
    pub const MW: &str = "MW";
}

/// Ingestion template, in order.
pub const OUTPUT_COLUMNS: [&str; 33] = [
    "BROAD_ID",
    "PROJECT_CODE",
    "CURVE_VALID",
    "STEADY_STATE_IMG",
    "1to1_IMG",
    "TOP_COMPOUND_UM",
    "MAX_THEORETICAL_DISP_RU",
    "RU_TOP_CMPD",
    "DISP_TOP_CMPD",
    "IC50_UM",
    "KA_1_1_BINDING",
    "KD_LITTLE_1_1_BINDING",
    "KD_1_1_BINDING_UM",
    "COMMENTS",
    "FC",
    "PROTEIN_RU",
    "PROTEIN_MW",
    "PROTEIN_ID",
    "PROTEIN_FLOATED_ID",
    "PROTEIN_FLOATED_CONC_UM",
    "PROTEIN_FLOATED_MW",
    "MW",
    "INSTRUMENT",
    "EXP_DATE",
    "NUCLEOTIDE",
    "CHIP_LOT",
    "OPERATOR",
    "PROTOCOL_ID",
    "RAW_DATA_FILE",
    "DIR_FOLDER",
    "UNIQUE_ID",
    "SS_IMG_ID",
    "SENSO_IMG_ID",
];

pub const FLOW_CELL_LABEL: &str = "2-1";

pub const COMMENT_HEADER: &str = "Comments";

pub const COMMENT_VOCABULARY: [&str; 7] = [
    "No displacement.",
    "Normal curve.",
    "Normal curve. Below 50% Displacement.",
    "Below 50% Displacement.",
    "Issues with compound.",
    "Poor fit. IC50 not reported.",
    "Issues at top concentration",
];

/// Zero-based position of a template column.
pub fn column_index(name: &str) -> Option<usize> {
    OUTPUT_COLUMNS.iter().position(|c| *c == name)
}

/// Spreadsheet column letters for a zero-based index (0 -> A, 26 -> AA).
pub fn column_letter(mut idx: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(13), "N");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(32), "AG");
    }

    #[test]
    fn comments_and_images_sit_where_the_template_expects() {
        assert_eq!(column_index("COMMENTS").map(column_letter).as_deref(), Some("N"));
        assert_eq!(column_index("STEADY_STATE_IMG").map(column_letter).as_deref(), Some("D"));
        assert_eq!(column_index("1to1_IMG").map(column_letter).as_deref(), Some("E"));
    }
}
