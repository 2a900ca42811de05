//! What the ingestion workbook must contain besides the cell values: the
//! comment vocabulary sheet, the dropdown wired to it, and where each curve
//! image is anchored.

use crate::assemble::ResultTable;
use crate::schema::{
    COMMENT_HEADER, COMMENT_VOCABULARY, OUTPUT_COLUMNS, column_index, column_letter,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const RESULT_SHEET: &str = "Sheet1";
pub const COMMENT_SHEET: &str = "Sheet2";
pub const COLUMN_WIDTH: f64 = 28.0;
pub const IMAGE_ROW_HEIGHT: f64 = 145.0;
pub const IMAGE_COLUMN_WIDTH: f64 = 24.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataValidation {
    /// Target cells, e.g. `N2:N9`.
    pub range: String,
    /// List source, e.g. `=Sheet2!$A$2:$A$8`.
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageAnchor {
    pub cell: String,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkbookLayout {
    pub result_sheet: String,
    pub comment_sheet: String,
    pub comment_header: String,
    pub comments: Vec<String>,
    pub comment_validation: Option<DataValidation>,
    pub freeze_rows: u32,
    /// Centered columns and their width, e.g. `A:AG`.
    pub columns: String,
    pub column_width: f64,
    pub image_columns: String,
    pub image_column_width: f64,
    pub image_row_height: f64,
    pub images: Vec<ImageAnchor>,
}

impl WorkbookLayout {
    pub fn for_table(table: &ResultTable, ss_dir: &Path, senso_dir: &Path) -> Self {
        let letter = |name: &str| column_index(name).map(column_letter).unwrap_or_default();
        let comments_col = letter("COMMENTS");
        let ss_col = letter("STEADY_STATE_IMG");
        let senso_col = letter("1to1_IMG");
        let n = table.rows.len();

        let comment_validation = (n > 0).then(|| DataValidation {
            range: format!("{comments_col}2:{comments_col}{}", n + 1),
            source: format!(
                "={COMMENT_SHEET}!$A$2:$A${}",
                COMMENT_VOCABULARY.len() + 1
            ),
        });

        let mut images = Vec::new();
        for (i, row) in table.rows.iter().enumerate() {
            let excel_row = i + 2;
            if let Some(f) = &row.ss_img_file {
                images.push(ImageAnchor {
                    cell: format!("{ss_col}{excel_row}"),
                    path: ss_dir.join(f).to_string_lossy().into_owned(),
                });
            }
            if let Some(f) = &row.senso_img_file {
                images.push(ImageAnchor {
                    cell: format!("{senso_col}{excel_row}"),
                    path: senso_dir.join(f).to_string_lossy().into_owned(),
                });
            }
        }

        WorkbookLayout {
            result_sheet: RESULT_SHEET.to_string(),
            comment_sheet: COMMENT_SHEET.to_string(),
            comment_header: COMMENT_HEADER.to_string(),
            comments: COMMENT_VOCABULARY.iter().map(|s| s.to_string()).collect(),
            comment_validation,
            freeze_rows: 1,
            columns: format!("A:{}", column_letter(OUTPUT_COLUMNS.len() - 1)),
            column_width: COLUMN_WIDTH,
            image_columns: format!("{ss_col}:{senso_col}"),
            image_column_width: IMAGE_COLUMN_WIDTH,
            image_row_height: IMAGE_ROW_HEIGHT,
            images,
        }
    }
}
