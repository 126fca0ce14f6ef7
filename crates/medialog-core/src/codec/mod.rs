//! Cell-level codecs shared by the spreadsheet exporter and importer

pub mod date;
pub mod genre;

pub use date::ABSENT;
pub use genre::GenreToken;
