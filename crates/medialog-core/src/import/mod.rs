//! Import of archives and spreadsheets into the library
//!
//! Every import runs through the same stages:
//!
//! ```text
//! Staged -> AwaitingFetchConsent -> Enriching | CopyingDirect -> Merged -> Done
//!                                \-> Aborted -> Done
//! ```
//!
//! Incoming records are first staged into a scratch directory. After the
//! consent decision they are optionally enriched through a
//! [`MetadataProvider`], then moved into the live store. The staging
//! directory is emptied before and after every run.

mod merge;
mod provider;

pub use merge::merge_details;
pub use provider::{
    best_match, Candidate, FetchedDetails, MetadataProvider, NoProvider, ProviderError,
};

use futures::future::join_all;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveImporter;
use crate::error::{Error, Result};
use crate::sheet::SpreadsheetImporter;
use crate::store::{
    read_record, write_record, FolderId, FolderNameResolver, IdentityArena, LibraryChange,
    RecordStore, DATA_FILE,
};
use crate::utils::{move_dir, reset_dir};

/// Stage of an import run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Staged,
    AwaitingFetchConsent,
    Enriching,
    CopyingDirect,
    Merged,
    Aborted,
    Done,
}

/// Answer to "fetch missing metadata for the staged records?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportDecision {
    /// Look up missing data, then import
    Enrich,
    /// Import the staged records as they are
    MergeOnly,
    /// Discard the staged records
    Abort,
}

/// Asks the user (or a policy) whether to enrich staged records.
///
/// The future may stay pending for as long as the user takes to answer.
pub trait ImportConsent: Send + Sync {
    fn decide(&self, staged: &[FolderId]) -> impl Future<Output = ImportDecision> + Send;
}

/// Consent that always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedConsent(pub ImportDecision);

impl ImportConsent for FixedConsent {
    async fn decide(&self, _staged: &[FolderId]) -> ImportDecision {
        self.0
    }
}

/// A file to import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// A full record archive
    Archive(PathBuf),
    /// A workbook; its companion archive is found next to it
    Spreadsheet { workbook: PathBuf, detailed: bool },
}

impl ImportSource {
    pub fn path(&self) -> &Path {
        match self {
            ImportSource::Archive(path) => path,
            ImportSource::Spreadsheet { workbook, .. } => workbook,
        }
    }
}

/// Outcome of one import run
#[derive(Debug, Default)]
pub struct ImportReport {
    /// States the run went through, in order
    pub states: Vec<ImportState>,
    /// Records now in the library, under their final identity
    pub imported: Vec<FolderId>,
    /// Records that had to take a new suffix: (staged, final)
    pub renamed: Vec<(FolderId, FolderId)>,
    /// Records left out because their identity is taken
    pub conflicts: Vec<Error>,
    /// Per-record lookup, fetch and image failures during enrichment
    pub enrichment_failures: Vec<Error>,
    /// Per-record failures while moving into the library
    pub move_failures: Vec<Error>,
    /// Spreadsheet rows that could not be turned into records
    pub skipped_rows: Vec<String>,
}

impl ImportReport {
    pub fn aborted(&self) -> bool {
        self.states.contains(&ImportState::Aborted)
    }

    fn enter(&mut self, state: ImportState) {
        tracing::debug!("Import state: {:?}", state);
        self.states.push(state);
    }
}

/// Drives imports from staging into a [`RecordStore`]
pub struct ImportReconciler<'a, P, C> {
    store: &'a RecordStore,
    staging: PathBuf,
    provider: P,
    consent: C,
}

impl<'a, P: MetadataProvider, C: ImportConsent> ImportReconciler<'a, P, C> {
    pub fn new(store: &'a RecordStore, staging: impl Into<PathBuf>, provider: P, consent: C) -> Self {
        Self {
            store,
            staging: staging.into(),
            provider,
            consent,
        }
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// Import several files, one after another.
    ///
    /// A file that cannot be unpacked or read is reported and the next one
    /// is processed.
    pub async fn import_all(&self, sources: &[ImportSource]) -> Vec<(ImportSource, Result<ImportReport>)> {
        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            let result = self.import(source).await;
            if let Err(ref e) = result {
                tracing::warn!("Import of {} failed: {}", source.path().display(), e);
            }
            results.push((source.clone(), result));
        }
        results
    }

    /// Import one file
    pub async fn import(&self, source: &ImportSource) -> Result<ImportReport> {
        reset_dir(&self.staging)?;
        let result = self.run(source).await;
        if let Err(e) = reset_dir(&self.staging) {
            tracing::warn!("Failed to clear staging {}: {}", self.staging.display(), e);
        }
        result
    }

    async fn run(&self, source: &ImportSource) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        let staged = match source {
            ImportSource::Archive(path) => {
                let summary = ArchiveImporter::new().unpack(path, &self.staging)?;
                summary
                    .records
                    .into_iter()
                    .filter(|id| {
                        let usable = self.staging.join(id.as_str()).join(DATA_FILE).is_file();
                        if !usable {
                            tracing::warn!("Archive folder {} has no {}, skipping", id, DATA_FILE);
                        }
                        usable
                    })
                    .collect::<Vec<_>>()
            }
            ImportSource::Spreadsheet { workbook, detailed } => {
                let staging = SpreadsheetImporter::new()
                    .detailed(*detailed)
                    .stage(workbook, &self.staging)?;
                report.skipped_rows = staging.skipped;
                staging.staged
            }
        };
        report.enter(ImportState::Staged);
        tracing::info!("Staged {} record(s) from {}", staged.len(), source.path().display());

        report.enter(ImportState::AwaitingFetchConsent);
        match self.consent.decide(&staged).await {
            ImportDecision::Abort => {
                report.enter(ImportState::Aborted);
                report.enter(ImportState::Done);
                tracing::info!("Import of {} aborted", source.path().display());
                return Ok(report);
            }
            ImportDecision::Enrich => {
                report.enter(ImportState::Enriching);
                report.enrichment_failures = self.enrich(&staged).await;
            }
            ImportDecision::MergeOnly => report.enter(ImportState::CopyingDirect),
        }

        self.move_into_store(&staged, &mut report);
        report.enter(ImportState::Merged);

        if !report.imported.is_empty() {
            self.store
                .notify(LibraryChange::Imported(report.imported.clone()));
        }
        report.enter(ImportState::Done);

        tracing::info!(
            "Imported {} record(s), {} renamed, {} conflict(s)",
            report.imported.len(),
            report.renamed.len(),
            report.conflicts.len()
        );
        Ok(report)
    }

    /// Look up every staged record that is missing data. Lookups run
    /// concurrently; a failure leaves that record as it was staged.
    async fn enrich(&self, staged: &[FolderId]) -> Vec<Error> {
        let results = join_all(staged.iter().map(|id| self.enrich_one(id))).await;
        results.into_iter().flatten().collect()
    }

    async fn enrich_one(&self, id: &FolderId) -> Vec<Error> {
        let dir = self.staging.join(id.as_str());
        let mut record = match read_record(&dir) {
            Ok(record) => record,
            Err(e) => return vec![e],
        };
        if !record.needs_enrichment() {
            return Vec::new();
        }

        let name = record.display_name().to_string();
        let candidates = match self.provider.search_by_name(&name, record.category()).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("Lookup for {} failed: {}", id, e);
                return vec![Error::ProviderLookupFailed {
                    name,
                    reason: e.to_string(),
                }];
            }
        };
        let Some(candidate) = best_match(&name, &candidates) else {
            tracing::debug!("No metadata found for {}", id);
            return Vec::new();
        };

        let details = match self.provider.fetch_details(candidate).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Fetching {} for {} failed: {}", candidate.reference, id, e);
                return vec![Error::ProviderFetchFailed {
                    reference: candidate.reference.clone(),
                    reason: e.to_string(),
                }];
            }
        };

        merge_details(&mut record, &details);
        let resolved = self.store.asset_resolver().resolve(record.images(), &dir).await;
        record.set_images(resolved.paths);

        let mut failures = resolved.failures;
        match write_record(&dir, &record) {
            Ok(()) => tracing::debug!("Enriched {}", id),
            Err(e) => failures.push(e),
        }
        failures
    }

    /// Move staged folders into the library without overwriting anything.
    ///
    /// A taken identity gets a fresh suffix for counter categories; a book
    /// whose ISBN folder exists is reported and left out.
    fn move_into_store(&self, staged: &[FolderId], report: &mut ImportReport) {
        for id in staged {
            let from = self.staging.join(id.as_str());
            if !from.join(DATA_FILE).is_file() {
                continue;
            }

            let target = if self.store.record_dir(id).exists() {
                if !id.category().uses_counter() {
                    tracing::warn!("{} already exists in the library, not importing", id);
                    report.conflicts.push(Error::AlreadyExists(id.to_string()));
                    continue;
                }
                match self.next_identity(&from) {
                    Ok(next) => {
                        tracing::info!("{} is taken, importing as {}", id, next);
                        report.renamed.push((id.clone(), next.clone()));
                        next
                    }
                    Err(e) => {
                        report.move_failures.push(e);
                        continue;
                    }
                }
            } else {
                id.clone()
            };

            match move_dir(&from, &self.store.record_dir(&target)) {
                Ok(()) => report.imported.push(target),
                Err(e) => {
                    tracing::warn!("Failed to move {} into the library: {}", id, e);
                    report.move_failures.push(e);
                }
            }
        }
    }

    fn next_identity(&self, staged_dir: &Path) -> Result<FolderId> {
        let record = read_record(staged_dir)?;
        let mut arena = IdentityArena::scan(self.store.root())?;
        FolderNameResolver::resolve(&record, &mut arena)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveExporter;
    use crate::record::{Category, Record, TextField};
    use tempfile::tempdir;

    struct FakeProvider {
        fail_for: &'static str,
    }

    impl MetadataProvider for FakeProvider {
        async fn search_by_name(
            &self,
            name: &str,
            category: Category,
        ) -> std::result::Result<Vec<Candidate>, ProviderError> {
            if name == self.fail_for {
                return Err(ProviderError::Network("timed out".to_string()));
            }
            Ok(vec![Candidate {
                title: name.to_string(),
                reference: format!("test:{}", name),
                category,
            }])
        }

        async fn fetch_details(
            &self,
            candidate: &Candidate,
        ) -> std::result::Result<FetchedDetails, ProviderError> {
            Ok(FetchedDetails {
                fields: vec![(TextField::Synopsis, format!("About {}", candidate.title))],
                genres: vec!["Drama".to_string()],
                images: Vec::new(),
            })
        }
    }

    fn film(name: &str) -> Record {
        let mut record = Record::empty(Category::Film);
        record.set_name(name);
        record
    }

    async fn archive_of(names: &[&str], dir: &Path) -> PathBuf {
        let source = RecordStore::open(dir.join("source")).unwrap();
        let mut ids = Vec::new();
        for name in names {
            ids.push(source.save(film(name)).await.unwrap().id);
        }
        let dest = dir.join("films.zip");
        ArchiveExporter::new(&source).export(&ids, &dest).unwrap();
        dest
    }

    #[tokio::test]
    async fn test_merge_only_import() {
        let temp = tempdir().unwrap();
        let archive = archive_of(&["Heat", "Ran"], temp.path()).await;
        let store = RecordStore::open(temp.path().join("library")).unwrap();
        let staging = temp.path().join("staging");

        let reconciler = ImportReconciler::new(
            &store,
            &staging,
            NoProvider,
            FixedConsent(ImportDecision::MergeOnly),
        );
        let report = reconciler.import(&ImportSource::Archive(archive)).await.unwrap();

        assert_eq!(
            report.states,
            [
                ImportState::Staged,
                ImportState::AwaitingFetchConsent,
                ImportState::CopyingDirect,
                ImportState::Merged,
                ImportState::Done
            ]
        );
        assert_eq!(report.imported.len(), 2);
        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_abort_leaves_library_untouched() {
        let temp = tempdir().unwrap();
        let archive = archive_of(&["Heat"], temp.path()).await;
        let store = RecordStore::open(temp.path().join("library")).unwrap();
        let staging = temp.path().join("staging");

        let reconciler =
            ImportReconciler::new(&store, &staging, NoProvider, FixedConsent(ImportDecision::Abort));
        let report = reconciler.import(&ImportSource::Archive(archive)).await.unwrap();

        assert!(report.aborted());
        assert_eq!(report.states.last(), Some(&ImportState::Done));
        assert!(store.list().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_taken_identity_is_resuffixed() {
        let temp = tempdir().unwrap();
        let archive = archive_of(&["Heat"], temp.path()).await;
        let store = RecordStore::open(temp.path().join("library")).unwrap();
        store.save(film("Heat")).await.unwrap();

        let reconciler = ImportReconciler::new(
            &store,
            temp.path().join("staging"),
            NoProvider,
            FixedConsent(ImportDecision::MergeOnly),
        );
        let report = reconciler.import(&ImportSource::Archive(archive)).await.unwrap();

        assert_eq!(report.renamed.len(), 1);
        assert_eq!(report.renamed[0].1.as_str(), "Film-Heat-1");
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_isolated() {
        let temp = tempdir().unwrap();
        let archive = archive_of(&["Heat", "Ran"], temp.path()).await;
        let store = RecordStore::open(temp.path().join("library")).unwrap();
        let provider = FakeProvider { fail_for: "Ran" };

        let reconciler = ImportReconciler::new(
            &store,
            temp.path().join("staging"),
            provider,
            FixedConsent(ImportDecision::Enrich),
        );
        let report = reconciler.import(&ImportSource::Archive(archive)).await.unwrap();

        assert!(report.states.contains(&ImportState::Enriching));
        assert_eq!(report.enrichment_failures.len(), 1);
        assert!(matches!(
            report.enrichment_failures[0],
            Error::ProviderLookupFailed { .. }
        ));
        assert_eq!(report.imported.len(), 2);

        let heat = store.read(&"Film-Heat-0".parse().unwrap()).unwrap();
        assert_eq!(heat.text(TextField::Synopsis), Some("About Heat"));
        assert!(heat.genres().is_selected("Drama"));
        let ran = store.read(&"Film-Ran-0".parse().unwrap()).unwrap();
        assert_eq!(ran.text(TextField::Synopsis), Some(""));
    }

    #[tokio::test]
    async fn test_import_all_continues_after_bad_file() {
        let temp = tempdir().unwrap();
        let archive = archive_of(&["Heat"], temp.path()).await;
        let bogus = temp.path().join("bogus.zip");
        std::fs::write(&bogus, b"nope").unwrap();
        let store = RecordStore::open(temp.path().join("library")).unwrap();

        let reconciler = ImportReconciler::new(
            &store,
            temp.path().join("staging"),
            NoProvider,
            FixedConsent(ImportDecision::MergeOnly),
        );
        let results = reconciler
            .import_all(&[ImportSource::Archive(bogus), ImportSource::Archive(archive)])
            .await;

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0].1, Err(Error::ArchiveUnpackFailed { .. })));
        assert_eq!(results[1].1.as_ref().unwrap().imported.len(), 1);
    }
}
