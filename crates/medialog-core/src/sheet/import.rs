//! Workbook reading into the staging area

use calamine::{open_workbook, Data, Reader, Xlsx};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::layout::{
    apply, apply_detail_rows, apply_placeholder, decode_number, header_index, summary_category,
    Column, DetailSheetKey, SheetRow, SuffixQueue, ID_HEADER,
};
use super::{companion_archive_path, COMPANION_DIR};
use crate::archive::ArchiveImporter;
use crate::error::{Error, Result};
use crate::record::{normalize_isbn, Category, Record};
use crate::store::{
    slug, write_record, FolderId, FolderNameResolver, IdentityArena, ResolvedAssets, ASSETS_DIR,
};
use crate::utils::move_dir;

type Workbook = Xlsx<BufReader<File>>;

/// Records a workbook produced in the staging area
#[derive(Debug, Clone, Default)]
pub struct SheetStaging {
    /// Staged record folders, in sheet order
    pub staged: Vec<FolderId>,
    /// Rows that were left out, with the reason
    pub skipped: Vec<String>,
}

/// Rebuilds records from a workbook and its companion archive
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetImporter {
    detailed: bool,
}

impl SpreadsheetImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read detail sheets back into related content
    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    /// Stage every summary row of `workbook` as a record folder in `staging`.
    ///
    /// The companion archive is unpacked first so each record can take over
    /// its exported `assets/` folder.
    pub fn stage(&self, workbook: &Path, staging: &Path) -> Result<SheetStaging> {
        fs::create_dir_all(staging)?;
        let companion_dir = staging.join(COMPANION_DIR);
        let companion = companion_archive_path(workbook);

        if companion.is_file() {
            ArchiveImporter::new().unpack(&companion, &companion_dir)?;
        } else {
            tracing::warn!(
                "Companion archive {} not found, importing without images",
                companion.display()
            );
        }

        let result = self.stage_rows(workbook, staging, &companion_dir);
        if companion_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&companion_dir) {
                tracing::warn!("Failed to clean {}: {}", companion_dir.display(), e);
            }
        }
        result
    }

    fn stage_rows(&self, workbook: &Path, staging: &Path, companion_dir: &Path) -> Result<SheetStaging> {
        let read_failed = |reason: String| Error::WorkbookReadFailed {
            path: workbook.to_path_buf(),
            reason,
        };

        let mut book: Workbook =
            open_workbook(workbook).map_err(|e: calamine::XlsxError| read_failed(e.to_string()))?;
        let sheet_names = book.sheet_names();

        let detail_keys: Vec<DetailSheetKey> = sheet_names
            .iter()
            .filter_map(|name| DetailSheetKey::parse(name))
            .collect();
        let mut details = SuffixQueue::new(detail_keys, |k| (k.category, k.counter()));
        let mut asset_folders = SuffixQueue::new(companion_folders(companion_dir), |id| {
            (id.category(), id.counter().unwrap_or(u32::MAX))
        });

        let mut arena = IdentityArena::scan(staging)?;
        let mut outcome = SheetStaging::default();

        for sheet_name in &sheet_names {
            let Some(category) = summary_category(sheet_name) else {
                continue;
            };
            let rows = read_rows(&mut book, sheet_name).map_err(read_failed)?;
            let Some((header_row, data)) = rows.split_first() else {
                continue;
            };
            let headers = header_index(header_row);
            let columns: Vec<(usize, Column)> = header_row
                .iter()
                .enumerate()
                .filter_map(|(i, h)| Column::from_header(category, h).map(|c| (i, c)))
                .collect();

            for (index, cells) in data.iter().enumerate() {
                let row = SheetRow::new(&headers, cells);
                if row.is_blank() {
                    continue;
                }
                let location = format!("{} row {}", sheet_name, index + 2);

                let mut record = Record::empty(category);
                for (i, column) in &columns {
                    let value = cells.get(*i).map(String::as_str).unwrap_or_default();
                    apply(&mut record, *column, value);
                }

                if let Some(isbn) = record.isbn() {
                    if normalize_isbn(isbn).is_none() {
                        tracing::warn!("Skipping {}: no usable ISBN/ASIN", location);
                        outcome.skipped.push(format!("{}: no usable ISBN/ASIN", location));
                        continue;
                    }
                }
                if let Err(reason) = record.validate() {
                    tracing::warn!("Skipping {}: {}", location, reason);
                    outcome.skipped.push(format!("{}: {}", location, reason));
                    continue;
                }
                record.normalize();

                // Rows written by the exporter name their folder; hand-made
                // rows fall back to matching by slug in suffix order
                let exported: Option<FolderId> = row
                    .get(ID_HEADER)
                    .trim()
                    .parse()
                    .ok()
                    .filter(|id: &FolderId| id.category() == category);

                if category.has_content() {
                    apply_placeholder(
                        &mut record,
                        row.get(Column::ReleaseDate.header()),
                        decode_number(row.get(Column::Rating.header())),
                    );
                    if self.detailed {
                        let key = match &exported {
                            Some(exported) => {
                                let wanted = DetailSheetKey::for_id(exported);
                                details.take(|k| *k == wanted)
                            }
                            None => {
                                let record_slug = slug(record.display_name());
                                details.take(|k| k.matches(category, &record_slug))
                            }
                        };
                        match key {
                            Some(key) => {
                                let detail = read_rows(&mut book, &key.sheet_name())
                                    .map_err(read_failed)?;
                                if let Some((detail_header, detail_data)) = detail.split_first() {
                                    let detail_headers = header_index(detail_header);
                                    let detail_rows: Vec<SheetRow<'_>> = detail_data
                                        .iter()
                                        .map(|cells| SheetRow::new(&detail_headers, cells))
                                        .collect();
                                    apply_detail_rows(&mut record, &detail_rows);
                                }
                            }
                            None => tracing::debug!("No detail sheet for {}", location),
                        }
                    }
                }

                let id = FolderNameResolver::resolve(&record, &mut arena)?;
                let dir = staging.join(id.as_str());
                match fs::create_dir(&dir) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                        tracing::warn!("Skipping {}: {} is already staged", location, id);
                        outcome.skipped.push(format!("{}: duplicate of {}", location, id));
                        continue;
                    }
                    Err(source) => return Err(Error::WriteFailed { path: dir, source }),
                }

                let folder = match &exported {
                    Some(exported) => asset_folders.take(|folder| folder == exported),
                    None => {
                        let prefix = FolderNameResolver::prefix(&record);
                        asset_folders.take(|folder| {
                            folder.prefix() == prefix
                                && (category != Category::Book || folder.suffix() == id.suffix())
                        })
                    }
                };
                let source = folder.map(|folder| companion_dir.join(folder.as_str()).join(ASSETS_DIR));
                let images = attach_assets(record.images(), source, &dir)?;
                record.set_images(images);

                write_record(&dir, &record)?;
                tracing::debug!("Staged {} from {}", id, location);
                outcome.staged.push(id);
            }
        }

        tracing::info!(
            "Staged {} record(s) from {} ({} skipped)",
            outcome.staged.len(),
            workbook.display(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }
}

/// All cells of a sheet as display strings, header row first
fn read_rows(book: &mut Workbook, sheet_name: &str) -> std::result::Result<Vec<Vec<String>>, String> {
    let range = book
        .worksheet_range(sheet_name)
        .map_err(|e| format!("sheet {}: {}", sheet_name, e))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(Data::to_string).collect())
        .collect())
}

/// Record folders unpacked from the companion archive
fn companion_folders(companion_dir: &Path) -> Vec<FolderId> {
    let Ok(entries) = fs::read_dir(companion_dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().and_then(|n| n.parse().ok()))
        .collect()
}

/// Move exported images into the staged record and order them.
///
/// Paths listed in the sheet come first, in their listed order; any other
/// file found in the folder follows by name.
fn attach_assets(listed: &[String], source: Option<PathBuf>, record_dir: &Path) -> Result<Vec<String>> {
    let assets_dir = record_dir.join(ASSETS_DIR);
    match source.filter(|p| p.is_dir()) {
        Some(source) => move_dir(&source, &assets_dir)?,
        None => {
            fs::create_dir_all(&assets_dir)?;
            return Ok(ResolvedAssets::placeholder());
        }
    }

    let available: BTreeSet<String> = fs::read_dir(&assets_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| format!("{}/{}", ASSETS_DIR, e.file_name().to_string_lossy()))
        .collect();

    let mut images: Vec<String> = listed
        .iter()
        .filter(|path| available.contains(path.as_str()))
        .cloned()
        .collect();
    for path in available {
        if !images.contains(&path) {
            images.push(path);
        }
    }

    if images.is_empty() {
        images = ResolvedAssets::placeholder();
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_attach_assets_orders_listed_first() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("exported/assets");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.jpg"), b"a").unwrap();
        fs::write(source.join("cover.jpg"), b"c").unwrap();
        let record_dir = temp.path().join("Film-Heat-0");
        fs::create_dir_all(&record_dir).unwrap();

        let listed = vec!["assets/cover.jpg".to_string(), "assets/gone.jpg".to_string()];
        let images = attach_assets(&listed, Some(source.clone()), &record_dir).unwrap();

        assert_eq!(images, ["assets/cover.jpg", "assets/a.jpg"]);
        assert!(record_dir.join("assets/a.jpg").is_file());
        assert!(!source.exists());
    }

    #[test]
    fn test_attach_assets_without_source() {
        let temp = tempdir().unwrap();
        let images = attach_assets(&[], None, temp.path()).unwrap();
        assert_eq!(images, vec![String::new()]);
        assert!(temp.path().join(ASSETS_DIR).is_dir());
    }

    #[test]
    fn test_unreadable_workbook() {
        let temp = tempdir().unwrap();
        let workbook = temp.path().join("Medialog-Spreadsheet-x.xlsx");
        fs::write(&workbook, b"definitely not xlsx").unwrap();

        let err = SpreadsheetImporter::new()
            .stage(&workbook, &temp.path().join("staging"))
            .unwrap_err();
        assert!(matches!(err, Error::WorkbookReadFailed { .. }));
        assert!(!temp.path().join("staging").join(COMPANION_DIR).exists());
    }
}
