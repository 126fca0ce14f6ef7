//! Workbook writing

use rust_xlsxwriter::{Format, Url, Workbook, Worksheet, XlsxError};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::layout::{
    detail_headers, detail_rows, render, summary_columns, summary_sheet_name, Cell, Column,
    DetailSheetKey, ID_HEADER,
};
use super::{companion_archive_path, workbook_file_name};
use crate::archive::{ArchiveExporter, ArchiveOptions};
use crate::error::{Error, Result};
use crate::record::{Category, Record};
use crate::store::{FolderId, RecordStore};
use crate::utils::file_stamp;

/// Files produced by a spreadsheet export
#[derive(Debug, Clone)]
pub struct SpreadsheetExport {
    pub workbook: PathBuf,
    pub companion: PathBuf,
    /// Records written to summary sheets
    pub records: usize,
    /// Detail sheets written
    pub detail_sheets: usize,
}

/// Writes records to an `.xlsx` workbook and its companion assets archive
pub struct SpreadsheetExporter<'a> {
    store: &'a RecordStore,
    detailed: bool,
    archive_options: ArchiveOptions,
}

impl<'a> SpreadsheetExporter<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self {
            store,
            detailed: false,
            archive_options: ArchiveOptions::default(),
        }
    }

    /// Also write a detail sheet for every anime, manga and show
    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    pub fn with_archive_options(mut self, options: ArchiveOptions) -> Self {
        self.archive_options = options;
        self
    }

    /// Export into `dest_dir` using time-stamped file names
    pub fn export(&self, ids: &[FolderId], dest_dir: &Path) -> Result<SpreadsheetExport> {
        std::fs::create_dir_all(dest_dir)?;
        let workbook = dest_dir.join(workbook_file_name(&file_stamp()));
        self.export_to(ids, &workbook)
    }

    /// Export to an explicit workbook path; the companion archive is written
    /// next to it
    pub fn export_to(&self, ids: &[FolderId], workbook_path: &Path) -> Result<SpreadsheetExport> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut by_category: BTreeMap<Category, Vec<(FolderId, Record)>> = BTreeMap::new();
        for id in &ids {
            let record = self.store.read(id)?;
            by_category
                .entry(record.category())
                .or_default()
                .push((id.clone(), record));
        }

        let header_format = Format::new().set_bold();
        let mut workbook = Workbook::new();
        let mut detail_sheets = Vec::new();
        let mut sheet_names = HashSet::new();

        for (category, records) in &by_category {
            let columns = summary_columns(*category);
            let mut summary = Worksheet::new();
            summary
                .set_name(summary_sheet_name(*category))
                .map_err(write_failed)?;
            let mut headers: Vec<&str> = columns.iter().map(Column::header).collect();
            headers.push(ID_HEADER);
            write_header(&mut summary, &headers, &header_format)?;
            let id_col = columns.len() as u16;

            for (index, (id, record)) in records.iter().enumerate() {
                let row = index as u32 + 1;

                let detail = if self.detailed && category.has_content() {
                    let key = DetailSheetKey::for_id(id);
                    let name = key.sheet_name();
                    if sheet_names.insert(name.to_lowercase()) {
                        detail_sheets.push(detail_sheet(&name, record, &header_format)?);
                        Some(key)
                    } else {
                        tracing::warn!(
                            "Detail sheet name {} already used, {} is exported without one",
                            name,
                            id
                        );
                        None
                    }
                } else {
                    None
                };

                for (col, column) in columns.iter().enumerate() {
                    let col = col as u16;
                    let cell = render(record, *column);
                    match (column, &detail, cell) {
                        (Column::Name, Some(key), Cell::Text(text)) => {
                            summary
                                .write_url_with_text(row, col, Url::new(key.link()), text)
                                .map_err(write_failed)?;
                        }
                        (_, _, cell) => write_cell(&mut summary, row, col, cell)?,
                    }
                }
                summary
                    .write_string(row, id_col, id.as_str())
                    .map_err(write_failed)?;
            }

            tracing::debug!("Summary sheet for {} has {} row(s)", category, records.len());
            workbook.push_worksheet(summary);
        }

        let detail_count = detail_sheets.len();
        for sheet in detail_sheets {
            workbook.push_worksheet(sheet);
        }

        if let Some(parent) = workbook_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        workbook.save(workbook_path).map_err(write_failed)?;

        let companion = companion_archive_path(workbook_path);
        ArchiveExporter::new(self.store)
            .with_options(self.archive_options)
            .export_assets(&ids, &companion)?;

        tracing::info!(
            "Exported {} record(s) to {} ({} detail sheet(s))",
            ids.len(),
            workbook_path.display(),
            detail_count
        );

        Ok(SpreadsheetExport {
            workbook: workbook_path.to_path_buf(),
            companion,
            records: ids.len(),
            detail_sheets: detail_count,
        })
    }
}

fn detail_sheet(name: &str, record: &Record, header_format: &Format) -> Result<Worksheet> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name).map_err(write_failed)?;
    write_header(&mut sheet, detail_headers(record.category()), header_format)?;

    for (index, cells) in detail_rows(record).into_iter().enumerate() {
        let row = index as u32 + 1;
        for (col, cell) in cells.into_iter().enumerate() {
            write_cell(&mut sheet, row, col as u16, cell)?;
        }
    }
    Ok(sheet)
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, format)
            .map_err(write_failed)?;
    }
    Ok(())
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: Cell) -> Result<()> {
    match cell {
        Cell::Text(text) => sheet.write_string(row, col, text),
        Cell::Number(value) => sheet.write_number(row, col, value),
    }
    .map_err(write_failed)?;
    Ok(())
}

fn write_failed(e: XlsxError) -> Error {
    Error::WorkbookWriteFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Season, SerialItem};
    use crate::store::{write_record, ASSETS_DIR};
    use std::fs;
    use tempfile::tempdir;

    fn seed(store: &RecordStore, id: &str, record: &Record) -> FolderId {
        let id: FolderId = id.parse().unwrap();
        let dir = store.record_dir(&id);
        fs::create_dir_all(dir.join(ASSETS_DIR)).unwrap();
        write_record(&dir, record).unwrap();
        id
    }

    #[test]
    fn test_export_writes_workbook_and_companion() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path().join("library")).unwrap();

        let mut show = Record::empty(Category::Show);
        show.set_name("Breaking Bad");
        if let Record::Show(s) = &mut show {
            s.content.push(SerialItem::Season(Season {
                name: "Season 1".to_string(),
                ..Default::default()
            }));
        }
        let mut film = Record::empty(Category::Film);
        film.set_name("Heat");

        let ids = vec![
            seed(&store, "Show-BreakingBad-0", &show),
            seed(&store, "Film-Heat-0", &film),
        ];

        let export = SpreadsheetExporter::new(&store)
            .detailed(true)
            .export(&ids, &temp.path().join("exports"))
            .unwrap();

        assert!(export.workbook.is_file());
        assert!(export.companion.is_file());
        assert_eq!(export.records, 2);
        assert_eq!(export.detail_sheets, 1);
        let name = export.workbook.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Medialog-Spreadsheet-"));
    }

    #[test]
    fn test_bracketed_and_quoted_names_export() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path().join("library")).unwrap();

        let mut anime = Record::empty(Category::Anime);
        anime.set_name("[Oshi no Ko]");
        let mut show = Record::empty(Category::Show);
        show.set_name("Rock'n'roll");

        let ids = vec![
            seed(&store, "Anime-[OshiNoKo]-0", &anime),
            seed(&store, "Show-Rock'n'roll-0", &show),
        ];
        let export = SpreadsheetExporter::new(&store)
            .detailed(true)
            .export_to(&ids, &temp.path().join("out.xlsx"))
            .unwrap();
        assert_eq!(export.detail_sheets, 2);
    }

    #[test]
    fn test_missing_record_fails_export() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();
        let ghost: FolderId = "Film-Ghost-0".parse().unwrap();
        let err = SpreadsheetExporter::new(&store)
            .export_to(&[ghost], &temp.path().join("out.xlsx"))
            .unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(_)));
    }
}
