//! Spreadsheet export and import
//!
//! A spreadsheet export is a pair of files written side by side:
//! - `Medialog-Spreadsheet-<stamp>.xlsx`: one `Category-<Name>` summary sheet
//!   per category, plus optional per-record detail sheets
//! - `Medialog-<stamp>.zip`: the companion archive with each exported
//!   record's `assets/` folder
//!
//! The importer finds the companion by dropping the `Spreadsheet` token from
//! the workbook name.

mod export;
mod import;
pub mod layout;

pub use export::{SpreadsheetExport, SpreadsheetExporter};
pub use import::{SheetStaging, SpreadsheetImporter};

use std::path::{Path, PathBuf};

const SPREADSHEET_TOKEN: &str = "Spreadsheet";

/// Folder inside the staging area that receives the companion archive
pub(crate) const COMPANION_DIR: &str = ".companion";

/// `Medialog-Spreadsheet-<stamp>.xlsx`
pub fn workbook_file_name(stamp: &str) -> String {
    format!("Medialog-{}-{}.xlsx", SPREADSHEET_TOKEN, stamp)
}

/// Companion archive path for a workbook: same folder, `Spreadsheet` token
/// removed, `.zip` extension
pub fn companion_archive_path(workbook: &Path) -> PathBuf {
    let stem = workbook
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let dashed = format!("-{}", SPREADSHEET_TOKEN);
    let stem = if stem.contains(&dashed) {
        stem.replacen(&dashed, "", 1)
    } else {
        stem.replacen(SPREADSHEET_TOKEN, "", 1)
    };

    workbook.with_file_name(format!("{}.zip", stem))
}
