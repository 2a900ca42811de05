use crate::assemble::ResultTable;
use crate::error::Result;
use std::path::PathBuf;

pub mod delimited;
pub mod layout;

pub use layout::WorkbookLayout;

/// Receives the finished table. The styled spreadsheet writer used for
/// ingestion implements this outside the crate; `delimited` ships in-tree.
pub trait Emitter {
    /// Fails if `emit` is certain to fail, e.g. the target is taken. Called
    /// before a run changes anything on disk.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Writes the workbook and returns where it went.
    fn emit(&self, table: &ResultTable, layout: &WorkbookLayout) -> Result<PathBuf>;
}

/// `<save name>_APPVersion_<version>` with dots turned into underscores, so
/// every output can be traced to the release that produced it.
pub fn output_stem(save_name: &str, version: &str) -> String {
    let base = save_name
        .strip_suffix(".xlsx")
        .or_else(|| save_name.strip_suffix(".csv"))
        .unwrap_or(save_name);
    format!("{base}_APPVersion_{version}").replace('.', "_")
}
