//! Error types for medialog-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for medialog operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize record data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read/write ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("A record already exists at {0}")]
    AlreadyExists(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Failed to rename {from} to {to}: {source}")]
    RenameFailed {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy asset {source_path}: {reason}")]
    AssetCopyFailed { source_path: String, reason: String },

    #[error("Failed to download asset {url}: {reason}")]
    AssetDownloadFailed { url: String, reason: String },

    #[error("Failed to remove {id}: {source}")]
    RemovalFailed {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read configuration {path}: {reason}")]
    ConfigReadFailed { path: PathBuf, reason: String },

    #[error("Failed to write configuration {path}: {reason}")]
    ConfigWriteFailed { path: PathBuf, reason: String },

    #[error("Metadata lookup failed for '{name}': {reason}")]
    ProviderLookupFailed { name: String, reason: String },

    #[error("Metadata fetch failed for '{reference}': {reason}")]
    ProviderFetchFailed { reference: String, reason: String },

    #[error("Failed to unpack archive {path}: {reason}")]
    ArchiveUnpackFailed { path: PathBuf, reason: String },

    #[error("Failed to read workbook {path}: {reason}")]
    WorkbookReadFailed { path: PathBuf, reason: String },

    #[error("Failed to write workbook: {0}")]
    WorkbookWriteFailed(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this failure only affects a single item of a batch.
    ///
    /// Soft failures are collected and reported; everything else aborts the
    /// operation that produced it.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Error::AssetCopyFailed { .. }
                | Error::AssetDownloadFailed { .. }
                | Error::RemovalFailed { .. }
                | Error::ProviderLookupFailed { .. }
                | Error::ProviderFetchFailed { .. }
        )
    }

    /// Short user-facing title, one per failure class
    pub fn notification(&self) -> &'static str {
        match self {
            Error::Io(_) => "File system error",
            Error::Json(_) => "Record data is malformed",
            Error::Zip(_) => "Archive error",
            Error::AlreadyExists(_) => "Record already exists",
            Error::RecordNotFound(_) => "Record not found",
            Error::InvalidRecord(_) => "Record is incomplete",
            Error::RenameFailed { .. } => "Could not rename record folder",
            Error::WriteFailed { .. } => "Could not save record",
            Error::AssetCopyFailed { .. } => "Could not copy image",
            Error::AssetDownloadFailed { .. } => "Could not download image",
            Error::RemovalFailed { .. } => "Could not delete record",
            Error::ConfigReadFailed { .. } => "Could not read configuration",
            Error::ConfigWriteFailed { .. } => "Could not write configuration",
            Error::ProviderLookupFailed { .. } => "Metadata search failed",
            Error::ProviderFetchFailed { .. } => "Metadata download failed",
            Error::ArchiveUnpackFailed { .. } => "Could not unpack archive",
            Error::WorkbookReadFailed { .. } => "Could not read spreadsheet",
            Error::WorkbookWriteFailed(_) => "Could not write spreadsheet",
            Error::Other(_) => "Unexpected error",
        }
    }
}

/// Result type alias for medialog operations
pub type Result<T> = std::result::Result<T, Error>;
