use super::{Emitter, WorkbookLayout};
use crate::assemble::ResultTable;
use crate::error::{Result, SprError};
use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};

pub const RESULT_FILE: &str = "Sheet1.csv";
pub const COMMENT_FILE: &str = "Sheet2.csv";
pub const LAYOUT_FILE: &str = "layout.json";

/// Writes the workbook as a directory: one CSV per sheet plus the layout the
/// spreadsheet writer applies on top.
#[derive(Clone, Debug)]
pub struct DelimitedWorkbookEmitter {
    pub out_dir: PathBuf,
    pub stem: String,
}

impl DelimitedWorkbookEmitter {
    pub fn new(out_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            stem: stem.into(),
        }
    }

    fn target(&self) -> PathBuf {
        self.out_dir.join(&self.stem)
    }

    fn write_sheet<I, R>(path: &Path, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator,
        R::Item: AsRef<[u8]>,
    {
        let mut w = WriterBuilder::new().from_path(path)?;
        for row in rows {
            w.write_record(row)?;
        }
        w.flush()?;
        Ok(())
    }
}

impl Emitter for DelimitedWorkbookEmitter {
    fn check(&self) -> Result<()> {
        let target = self.target();
        if target.exists() {
            return Err(SprError::input(&target, "output already exists"));
        }
        Ok(())
    }

    fn emit(&self, table: &ResultTable, layout: &WorkbookLayout) -> Result<PathBuf> {
        self.check()?;
        let target = self.target();
        fs::create_dir_all(&target)?;

        let header = table.header().iter().map(|h| h.to_string()).collect::<Vec<_>>();
        let body = table.cell_rows();
        Self::write_sheet(
            &target.join(RESULT_FILE),
            std::iter::once(header).chain(body),
        )?;

        let comments = std::iter::once(&layout.comment_header)
            .chain(layout.comments.iter())
            .map(|c| vec![c.as_str()]);
        Self::write_sheet(&target.join(COMMENT_FILE), comments)?;

        let json = serde_json::to_string_pretty(layout)?;
        fs::write(target.join(LAYOUT_FILE), json)?;

        tracing::info!(path = %target.display(), rows = table.rows.len(), "workbook written");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::AggregatedRecord;
    use crate::schema::OUTPUT_COLUMNS;
    use tempfile::tempdir;

    #[test]
    fn writes_both_sheets_and_layout() {
        let dir = tempdir().unwrap();
        let table = ResultTable {
            rows: vec![AggregatedRecord {
                broad_id: "BRD-K12345678-001-01-1".into(),
                ..AggregatedRecord::default()
            }],
        };
        let layout = WorkbookLayout::for_table(&table, dir.path(), dir.path());
        let out = DelimitedWorkbookEmitter::new(dir.path(), "run_APPVersion_0_1_0")
            .emit(&table, &layout)
            .unwrap();

        let mut rdr = csv::Reader::from_path(out.join(RESULT_FILE)).unwrap();
        let header: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, OUTPUT_COLUMNS.to_vec());
        assert_eq!(rdr.records().count(), 1);

        let comments = fs::read_to_string(out.join(COMMENT_FILE)).unwrap();
        assert_eq!(comments.lines().count(), 8);
        assert_eq!(comments.lines().next(), Some("Comments"));

        let parsed: WorkbookLayout =
            serde_json::from_str(&fs::read_to_string(out.join(LAYOUT_FILE)).unwrap()).unwrap();
        assert_eq!(parsed, layout);
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("taken")).unwrap();
        let table = ResultTable::default();
        let layout = WorkbookLayout::for_table(&table, dir.path(), dir.path());
        let emitter = DelimitedWorkbookEmitter::new(dir.path(), "taken");
        assert!(emitter.check().is_err());
        assert!(emitter.emit(&table, &layout).is_err());
        assert!(DelimitedWorkbookEmitter::new(dir.path(), "free").check().is_ok());
    }
}
