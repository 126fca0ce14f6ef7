//! Portable zip archives of record folders
//!
//! Two archive shapes are produced:
//! - a full archive: every selected `<id>/` folder verbatim (`data.json` and
//!   `assets/`)
//! - an assets-only companion archive: `<id>/assets/...` for each selected
//!   record, written next to a spreadsheet export
//!
//! Unpacking always targets a staging directory; moving records into the live
//! library is the job of the import reconciler.

mod pack;

pub use pack::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compression used for archive entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    /// No compression
    Stored,
    /// Deflate at the given level (0-9)
    Deflated(u8),
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Deflated(6)
    }
}

impl Compression {
    pub fn label(&self) -> String {
        match self {
            Compression::Stored => "Stored".to_string(),
            Compression::Deflated(level) => format!("Deflated (level {})", (*level).min(9)),
        }
    }
}

/// Options for writing archives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveOptions {
    pub compression: Compression,
}

/// Callback for archive progress updates
pub type TransferProgressCallback = Box<dyn Fn(TransferProgress) + Send>;

/// Progress of an archive write or unpack
#[derive(Debug, Clone)]
pub struct TransferProgress {
    pub phase: TransferPhase,
    /// Number of files processed so far
    pub files_processed: usize,
    /// Total files, once known
    pub total_files: Option<usize>,
    /// Uncompressed bytes handled so far
    pub bytes_written: u64,
    /// Entry currently being handled
    pub current_file: Option<String>,
}

impl TransferProgress {
    fn at(phase: TransferPhase) -> Self {
        Self {
            phase,
            files_processed: 0,
            total_files: None,
            bytes_written: 0,
            current_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Scanning,
    Archiving,
    Extracting,
    Finalizing,
    Complete,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferPhase::Scanning => write!(f, "Scanning records..."),
            TransferPhase::Archiving => write!(f, "Creating archive..."),
            TransferPhase::Extracting => write!(f, "Extracting archive..."),
            TransferPhase::Finalizing => write!(f, "Finalizing..."),
            TransferPhase::Complete => write!(f, "Complete"),
        }
    }
}

/// What gets written for each record folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PackScope {
    /// The whole folder
    Record,
    /// Only the `assets/` subtree
    AssetsOnly,
}
