//! Archive writing and extraction

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{
    ArchiveOptions, Compression, PackScope, TransferPhase, TransferProgress,
    TransferProgressCallback,
};
use crate::error::{Error, Result};
use crate::store::{FolderId, RecordStore, ASSETS_DIR, DATA_FILE};

/// What an archive write or unpack touched
#[derive(Debug, Clone, Default)]
pub struct ArchiveSummary {
    /// Record folders written or found in the archive
    pub records: Vec<FolderId>,
    /// Number of files
    pub files: usize,
    /// Uncompressed bytes
    pub bytes: u64,
}

/// `Medialog-Library-<stamp>.zip`
pub fn library_archive_name(stamp: &str) -> String {
    format!("Medialog-Library-{}.zip", stamp)
}

/// Packs record folders from a store into a zip
pub struct ArchiveExporter<'a> {
    store: &'a RecordStore,
    options: ArchiveOptions,
    progress: Option<TransferProgressCallback>,
}

impl<'a> ArchiveExporter<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self {
            store,
            options: ArchiveOptions::default(),
            progress: None,
        }
    }

    pub fn with_options(mut self, options: ArchiveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: TransferProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Write the selected record folders, `data.json` and assets, to `dest`
    pub fn export(&self, ids: &[FolderId], dest: &Path) -> Result<ArchiveSummary> {
        let summary = self.pack(ids, dest, PackScope::Record)?;
        tracing::info!(
            "Exported {} record(s) to {}",
            summary.records.len(),
            dest.display()
        );
        Ok(summary)
    }

    /// Write only the `assets/` subtree of each selected record to `dest`.
    ///
    /// Every record gets an `<id>/assets/` entry, even without images, so the
    /// archive lists exactly the exported records.
    pub fn export_assets(&self, ids: &[FolderId], dest: &Path) -> Result<ArchiveSummary> {
        let summary = self.pack(ids, dest, PackScope::AssetsOnly)?;
        tracing::info!(
            "Exported assets of {} record(s) to {}",
            summary.records.len(),
            dest.display()
        );
        Ok(summary)
    }

    fn report(&self, progress: TransferProgress) {
        if let Some(ref cb) = self.progress {
            cb(progress);
        }
    }

    fn pack(&self, ids: &[FolderId], dest: &Path, scope: PackScope) -> Result<ArchiveSummary> {
        self.report(TransferProgress::at(TransferPhase::Scanning));

        let root = self.store.root();
        let mut dirs = BTreeSet::new();
        let mut files: Vec<(PathBuf, String)> = Vec::new();

        for id in ids {
            let record_dir = self.store.record_dir(id);
            if !record_dir.join(DATA_FILE).is_file() {
                return Err(Error::RecordNotFound(id.to_string()));
            }

            dirs.insert(format!("{}/", id));
            let base = match scope {
                PackScope::Record => record_dir.clone(),
                PackScope::AssetsOnly => {
                    dirs.insert(format!("{}/{}/", id, ASSETS_DIR));
                    record_dir.join(ASSETS_DIR)
                }
            };
            if !base.exists() {
                continue;
            }

            for entry in WalkDir::new(&base).sort_by_file_name() {
                let entry = entry.map_err(|e| Error::Other(e.to_string()))?;
                let relative_path = entry
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace('\\', "/"); // Normalize path separators

                if entry.file_type().is_file() {
                    files.push((entry.path().to_path_buf(), relative_path));
                } else if entry.file_type().is_dir() {
                    dirs.insert(relative_path + "/");
                }
            }
        }

        let total_files = files.len();
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(dest)?;
        let mut zip = ZipWriter::new(file);
        let zip_options = file_options(self.options.compression);

        self.report(TransferProgress {
            total_files: Some(total_files),
            ..TransferProgress::at(TransferPhase::Archiving)
        });

        for dir in &dirs {
            zip.add_directory(dir.as_str(), zip_options)?;
        }

        let mut summary = ArchiveSummary {
            records: ids.to_vec(),
            ..Default::default()
        };
        for (path, relative_path) in files {
            let file_size = add_file_to_zip(&mut zip, &path, &relative_path, zip_options)?;
            summary.files += 1;
            summary.bytes += file_size;

            self.report(TransferProgress {
                phase: TransferPhase::Archiving,
                files_processed: summary.files,
                total_files: Some(total_files),
                bytes_written: summary.bytes,
                current_file: Some(relative_path),
            });
        }

        self.report(TransferProgress {
            phase: TransferPhase::Finalizing,
            files_processed: summary.files,
            total_files: Some(total_files),
            bytes_written: summary.bytes,
            current_file: None,
        });

        zip.finish()?;

        self.report(TransferProgress {
            phase: TransferPhase::Complete,
            files_processed: summary.files,
            total_files: Some(total_files),
            bytes_written: summary.bytes,
            current_file: None,
        });

        Ok(summary)
    }
}

fn file_options(compression: Compression) -> SimpleFileOptions {
    match compression {
        Compression::Stored => {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        }
        Compression::Deflated(level) => SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level.min(9)))),
    }
}

/// Add a file to a zip archive
fn add_file_to_zip<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    file_path: &Path,
    archive_path: &str,
    options: SimpleFileOptions,
) -> Result<u64> {
    let mut file = File::open(file_path)?;
    let file_size = file.metadata()?.len();

    zip.start_file(archive_path, options)?;

    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        zip.write_all(&buffer[..bytes_read])?;
    }

    Ok(file_size)
}

/// Unpacks archives into a staging directory
#[derive(Default)]
pub struct ArchiveImporter {
    progress: Option<TransferProgressCallback>,
}

impl ArchiveImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: TransferProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Extract `archive_path` into `dest`.
    ///
    /// Entries whose path would leave `dest` are skipped. Any other failure
    /// is reported as `ArchiveUnpackFailed`.
    pub fn unpack(&self, archive_path: &Path, dest: &Path) -> Result<ArchiveSummary> {
        self.extract(archive_path, dest).map_err(|e| match e {
            Error::ArchiveUnpackFailed { .. } => e,
            other => Error::ArchiveUnpackFailed {
                path: archive_path.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }

    fn report(&self, progress: TransferProgress) {
        if let Some(ref cb) = self.progress {
            cb(progress);
        }
    }

    fn extract(&self, archive_path: &Path, dest: &Path) -> Result<ArchiveSummary> {
        let file = File::open(archive_path)?;
        let mut archive = ZipArchive::new(file)?;
        let total_files = archive.len();

        self.report(TransferProgress {
            total_files: Some(total_files),
            ..TransferProgress::at(TransferPhase::Scanning)
        });

        std::fs::create_dir_all(dest)?;

        let mut records = BTreeSet::new();
        let mut summary = ArchiveSummary::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let relative = match entry.enclosed_name() {
                Some(path) => path,
                None => {
                    tracing::warn!("Skipping unsafe archive entry {}", entry.name());
                    continue;
                }
            };
            let outpath = dest.join(&relative);
            let name = entry.name().to_string();

            self.report(TransferProgress {
                phase: TransferPhase::Extracting,
                files_processed: summary.files,
                total_files: Some(total_files),
                bytes_written: summary.bytes,
                current_file: Some(name),
            });

            if let Some(top) = relative.components().next() {
                let top = top.as_os_str().to_string_lossy();
                match top.parse::<FolderId>() {
                    Ok(id) => {
                        records.insert(id);
                    }
                    Err(_) => tracing::debug!("Archive entry outside a record folder: {}", top),
                }
            }

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)?;
            } else {
                if let Some(parent) = outpath.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut outfile = File::create(&outpath)?;
                summary.bytes += std::io::copy(&mut entry, &mut outfile)?;
                summary.files += 1;
            }
        }

        summary.records = records.into_iter().collect();

        self.report(TransferProgress {
            phase: TransferPhase::Complete,
            files_processed: summary.files,
            total_files: Some(total_files),
            bytes_written: summary.bytes,
            current_file: None,
        });

        tracing::info!(
            "Unpacked {} record folder(s) from {}",
            summary.records.len(),
            archive_path.display()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, Record};
    use crate::store::write_record;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn seed(store: &RecordStore, id: &str, name: &str, image: Option<&[u8]>) -> FolderId {
        let id: FolderId = id.parse().unwrap();
        let dir = store.record_dir(&id);
        fs::create_dir_all(&dir).unwrap();
        let mut record = Record::empty(id.category());
        record.set_name(name);
        match image {
            Some(bytes) => {
                fs::create_dir_all(dir.join(ASSETS_DIR)).unwrap();
                fs::write(dir.join("assets/cover.jpg"), bytes).unwrap();
                record.set_images(vec!["assets/cover.jpg".to_string()]);
            }
            None => record.set_images(vec![String::new()]),
        }
        write_record(&dir, &record).unwrap();
        id
    }

    #[test]
    fn test_export_and_unpack() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path().join("library")).unwrap();
        let heat = seed(&store, "Film-Heat-0", "Heat", Some(b"poster"));
        let ran = seed(&store, "Film-Ran-0", "Ran", None);

        let dest = temp.path().join("out/library.zip");
        let summary = ArchiveExporter::new(&store)
            .export(&[heat.clone(), ran.clone()], &dest)
            .unwrap();
        assert_eq!(summary.files, 3);

        let staging = temp.path().join("staging");
        let unpacked = ArchiveImporter::new().unpack(&dest, &staging).unwrap();
        assert_eq!(unpacked.records, vec![heat.clone(), ran.clone()]);

        let original = fs::read(store.record_dir(&heat).join(DATA_FILE)).unwrap();
        let restored = fs::read(staging.join("Film-Heat-0").join(DATA_FILE)).unwrap();
        assert_eq!(original, restored);
        assert_eq!(
            fs::read(staging.join("Film-Heat-0/assets/cover.jpg")).unwrap(),
            b"poster"
        );
    }

    #[test]
    fn test_assets_only_archive() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path().join("library")).unwrap();
        let heat = seed(&store, "Film-Heat-0", "Heat", Some(b"poster"));
        let ran = seed(&store, "Film-Ran-0", "Ran", None);

        let dest = temp.path().join("assets.zip");
        ArchiveExporter::new(&store)
            .with_options(ArchiveOptions {
                compression: Compression::Stored,
            })
            .export_assets(&[heat, ran], &dest)
            .unwrap();

        let staging = temp.path().join("staging");
        let unpacked = ArchiveImporter::new().unpack(&dest, &staging).unwrap();
        assert_eq!(unpacked.records.len(), 2);
        assert!(!staging.join("Film-Heat-0").join(DATA_FILE).exists());
        assert!(staging.join("Film-Heat-0/assets/cover.jpg").is_file());
        assert!(staging.join("Film-Ran-0/assets").is_dir());
    }

    #[test]
    fn test_progress_phases() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path().join("library")).unwrap();
        let heat = seed(&store, "Film-Heat-0", "Heat", None);

        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = phases.clone();
        ArchiveExporter::new(&store)
            .with_progress(Box::new(move |p: TransferProgress| {
                sink.lock().unwrap().push(p.phase)
            }))
            .export(&[heat], &temp.path().join("a.zip"))
            .unwrap();

        let phases = phases.lock().unwrap();
        assert_eq!(phases.first(), Some(&TransferPhase::Scanning));
        assert_eq!(phases.last(), Some(&TransferPhase::Complete));
        assert!(phases.contains(&TransferPhase::Finalizing));
    }

    #[test]
    fn test_missing_record_is_rejected() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();
        let ghost: FolderId = "Show-Ghost-0".parse().unwrap();
        let err = ArchiveExporter::new(&store)
            .export(&[ghost], &temp.path().join("a.zip"))
            .unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(_)));
    }

    #[test]
    fn test_unpack_garbage_fails() {
        let temp = tempdir().unwrap();
        let bogus = temp.path().join("bogus.zip");
        fs::write(&bogus, b"not a zip").unwrap();
        let err = ArchiveImporter::new()
            .unpack(&bogus, &temp.path().join("staging"))
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveUnpackFailed { .. }));
    }
}
