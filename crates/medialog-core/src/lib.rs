//! # medialog-core
//!
//! Core library for a personal media catalog (anime, books, films, manga and
//! shows) kept as a directory of JSON documents.
//!
//! This crate provides the foundational functionality for:
//! - Storing records as `<library>/<Category>-<Slug>-<n>/data.json` with their images
//! - Assigning stable, collision-free folder identities
//! - Exporting and importing the library as zip archives
//! - Exporting and importing the library as `.xlsx` workbooks with detail sheets
//! - Staging imports and enriching them from an external metadata source
//!
//! ## Modules
//!
//! - [`archive`] - Zip export and unpack of record folders
//! - [`codec`] - Genre and date conversions for spreadsheets
//! - [`config`] - Library, staging and export locations
//! - [`error`] - Error types and Result alias
//! - [`import`] - Staging, enrichment and merge into the library
//! - [`record`] - Record data structures
//! - [`sheet`] - Workbook export and import
//! - [`store`] - On-disk record store, identities and image assets
//!
//! ## Example
//!
//! ```no_run
//! use medialog_core::{Category, Config, Record, RecordStore};
//!
//! # async fn demo() -> medialog_core::Result<()> {
//! let config = Config::load()?;
//! let store = RecordStore::open(&config.library_path)?;
//!
//! let mut record = Record::empty(Category::Film);
//! record.set_name("Heat");
//! let saved = store.save(record).await?;
//! println!("Saved as {}", saved.id);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod codec;
pub mod config;
pub mod error;
pub mod import;
pub mod record;
pub mod sheet;
pub mod store;
pub mod utils;

// Error types
pub use error::{Error, Result};

// Configuration
pub use config::Config;

// Records
pub use record::{Category, GenreSelection, Record, TextField};

// Store
pub use store::{
    AssetResolver, FolderId, FolderNameResolver, IdentityAllocator, IdentityArena, LibraryChange,
    RecordStore, SaveOutcome, StoreObserver,
};

// Portability
pub use archive::{
    ArchiveExporter, ArchiveImporter, ArchiveOptions, Compression, TransferPhase, TransferProgress,
};
pub use sheet::{SpreadsheetExport, SpreadsheetExporter, SpreadsheetImporter};

// Import
pub use import::{
    FixedConsent, ImportConsent, ImportDecision, ImportReconciler, ImportReport, ImportSource,
    ImportState, MetadataProvider, NoProvider,
};
