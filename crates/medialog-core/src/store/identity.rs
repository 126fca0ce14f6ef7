//! Folder identities for records
//!
//! A record lives in `<Category>-<Slug>-<n>` (anime, film, manga, show) or
//! `<Category>-<Slug>-<ISBN>` (books). The slug is the record name with
//! forbidden characters stripped and each word capitalized. The numeric
//! suffix tells apart records that share a slug; it is handed out by an
//! [`IdentityAllocator`] and never changes afterwards.
//!
//! Allocation reads the state of the library at call time. Two records with
//! the same slug created concurrently can be handed the same index; the store
//! creates folders with `create_dir`, so the loser of that race gets
//! `AlreadyExists` instead of silently sharing a folder.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::record::{normalize_isbn, Category, Record};
use crate::utils::strip_forbidden;

/// Name of a record folder inside the library
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderId(String);

impl FolderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Category encoded in the leading token
    pub fn category(&self) -> Category {
        let head = self.0.split('-').next().unwrap_or_default();
        // Construction guarantees a valid category prefix
        Category::from_name(head).unwrap_or(Category::Anime)
    }

    /// Everything before the last `-`: `<Category>-<Slug>`
    pub fn prefix(&self) -> &str {
        self.0.rsplit_once('-').map(|(p, _)| p).unwrap_or(&self.0)
    }

    /// The trailing token: the counter, or a book's ISBN
    pub fn suffix(&self) -> &str {
        self.0.rsplit_once('-').map(|(_, s)| s).unwrap_or_default()
    }

    /// The slug between the category and the suffix
    pub fn slug(&self) -> &str {
        let prefix = self.prefix();
        prefix.split_once('-').map(|(_, s)| s).unwrap_or_default()
    }

    /// Numeric suffix, for counter-suffixed categories
    pub fn counter(&self) -> Option<u32> {
        if self.category().uses_counter() {
            self.suffix().parse().ok()
        } else {
            None
        }
    }

    /// Ordering key: category, slug, then numeric suffix
    fn sort_key(&self) -> (Category, String, u64, &str) {
        (
            self.category(),
            self.prefix().to_lowercase(),
            self.counter().map(u64::from).unwrap_or(u64::MAX),
            &self.0,
        )
    }
}

impl FromStr for FolderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidRecord(format!("'{}' is not a record folder name", s));

        if s.is_empty() || s.contains(['/', '\\']) || s == "." || s == ".." {
            return Err(invalid());
        }
        let (head, rest) = s.split_once('-').ok_or_else(invalid)?;
        Category::from_name(head).ok_or_else(invalid)?;
        let (slug, suffix) = rest.rsplit_once('-').ok_or_else(invalid)?;
        if slug.is_empty() || suffix.is_empty() {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for FolderId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FolderId> for String {
    fn from(id: FolderId) -> Self {
        id.0
    }
}

impl AsRef<str> for FolderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialOrd for FolderId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FolderId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Folder-safe, word-capitalized form of a name.
///
/// `"cowboy bebop"` becomes `"CowboyBebop"`; only the first letter of each
/// word is changed.
pub fn slug(name: &str) -> String {
    strip_forbidden(name)
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `<Category>-<Slug>`, the part of an identity shared by same-named records
pub fn identity_prefix(category: Category, name: &str) -> String {
    format!("{}-{}", category.name(), slug(name))
}

/// Hands out the numeric suffix for counter-suffixed identities
pub trait IdentityAllocator {
    /// Reserve and return the next index for `prefix`
    fn allocate(&mut self, prefix: &str) -> u32;
}

/// In-memory index of taken identities, keyed by `<Category>-<Slug>`
#[derive(Debug, Clone, Default)]
pub struct IdentityArena {
    taken: BTreeMap<String, BTreeSet<u32>>,
}

impl IdentityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the arena from the folders currently in `dir`
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut arena = Self::new();
        if !dir.exists() {
            return Ok(arena);
        }
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                arena.insert_name(name);
            }
        }
        Ok(arena)
    }

    /// Build the arena from a list of folder names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut arena = Self::new();
        for name in names {
            arena.insert_name(name.as_ref());
        }
        arena
    }

    /// Record a folder name as taken; names without a numeric suffix are ignored
    pub fn insert_name(&mut self, name: &str) {
        if let Some((prefix, suffix)) = name.rsplit_once('-') {
            if let Ok(n) = suffix.parse::<u32>() {
                self.taken.entry(prefix.to_string()).or_default().insert(n);
            }
        }
    }

    /// Number of taken identities sharing `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.taken.get(prefix).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn is_taken(&self, prefix: &str, index: u32) -> bool {
        self.taken
            .get(prefix)
            .map(|set| set.contains(&index))
            .unwrap_or(false)
    }
}

impl IdentityAllocator for IdentityArena {
    /// The count of existing siblings, or the next free index above it when
    /// deletions have left that one taken.
    fn allocate(&mut self, prefix: &str) -> u32 {
        let mut index = self.count(prefix) as u32;
        while self.is_taken(prefix, index) {
            index += 1;
        }
        self.taken.entry(prefix.to_string()).or_default().insert(index);
        index
    }
}

/// Derives folder identities for records
pub struct FolderNameResolver;

impl FolderNameResolver {
    /// The `<Category>-<Slug>` prefix for a record
    pub fn prefix(record: &Record) -> String {
        identity_prefix(record.category(), record.display_name())
    }

    /// The `<Category>-<Slug>` prefix formed from the alternate name, for
    /// categories that have one and records that fill it in
    pub fn alternate_prefix(record: &Record) -> Option<String> {
        let alt = record.alt_name()?.trim();
        (!alt.is_empty()).then(|| identity_prefix(record.category(), alt))
    }

    /// Assign a new identity to `record`
    pub fn resolve(record: &Record, allocator: &mut dyn IdentityAllocator) -> Result<FolderId> {
        let prefix = Self::prefix(record);
        let suffix = match record.isbn() {
            Some(isbn) => normalize_isbn(isbn).ok_or_else(|| {
                Error::InvalidRecord(format!("'{}' is not a usable ISBN/ASIN", isbn))
            })?,
            None => allocator.allocate(&prefix).to_string(),
        };
        format!("{}-{}", prefix, suffix).parse()
    }

    /// Whether `record` no longer belongs in `prior` (its name or ISBN changed)
    pub fn needs_rename(prior: &FolderId, record: &Record) -> bool {
        if prior.category() != record.category() || prior.prefix() != Self::prefix(record) {
            return true;
        }
        match record.isbn() {
            Some(isbn) => normalize_isbn(isbn).as_deref() != Some(prior.suffix()),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(category: Category, name: &str) -> Record {
        let mut record = Record::empty(category);
        record.set_name(name);
        record
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("cowboy bebop"), "CowboyBebop");
        assert_eq!(slug("Re:Zero  kara Hajimeru"), "ReZeroKaraHajimeru");
        assert_eq!(slug("Spider-Man: No Way Home"), "Spider-ManNoWayHome");
        assert_eq!(slug("ÉCOLE des loisirs"), "ÉCOLEDesLoisirs");
        assert_eq!(slug("rock'n'roll [remastered]"), "Rock'n'roll[remastered]");
    }

    #[test]
    fn test_parse_folder_id() {
        let id: FolderId = "Anime-CowboyBebop-0".parse().unwrap();
        assert_eq!(id.category(), Category::Anime);
        assert_eq!(id.prefix(), "Anime-CowboyBebop");
        assert_eq!(id.slug(), "CowboyBebop");
        assert_eq!(id.counter(), Some(0));

        let book: FolderId = "Book-Dune-9780441172719".parse().unwrap();
        assert_eq!(book.counter(), None);
        assert_eq!(book.suffix(), "9780441172719");

        assert!("Podcast-Foo-0".parse::<FolderId>().is_err());
        assert!("Anime-0".parse::<FolderId>().is_err());
        assert!("../Anime-Foo-0".parse::<FolderId>().is_err());
    }

    #[test]
    fn test_ordering_uses_numeric_suffix() {
        let mut ids: Vec<FolderId> = ["Anime-Foo-10", "Anime-Foo-2", "Anime-Bar-0", "Book-A-1234567890"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        ids.sort();
        let names: Vec<&str> = ids.iter().map(FolderId::as_str).collect();
        assert_eq!(names, ["Anime-Bar-0", "Anime-Foo-2", "Anime-Foo-10", "Book-A-1234567890"]);
    }

    #[test]
    fn test_sequential_allocation() {
        let mut arena = IdentityArena::new();
        let record = named(Category::Film, "Heat");
        let ids: Vec<String> = (0..4)
            .map(|_| FolderNameResolver::resolve(&record, &mut arena).unwrap().to_string())
            .collect();
        assert_eq!(ids, ["Film-Heat-0", "Film-Heat-1", "Film-Heat-2", "Film-Heat-3"]);
    }

    #[test]
    fn test_allocation_skips_taken_index() {
        // Film-Heat-0 was deleted; counting alone would hand out 1 again
        let mut arena = IdentityArena::from_names(["Film-Heat-1", "Film-Other-0"]);
        assert_eq!(arena.allocate("Film-Heat"), 2);
        assert_eq!(arena.allocate("Film-Heat"), 3);
        assert_eq!(arena.allocate("Film-Other"), 1);
    }

    #[test]
    fn test_book_identity_uses_isbn() {
        let mut record = named(Category::Book, "dune");
        if let Record::Book(b) = &mut record {
            b.isbn = "978-0441172719".to_string();
        }
        let mut arena = IdentityArena::new();
        let id = FolderNameResolver::resolve(&record, &mut arena).unwrap();
        assert_eq!(id.as_str(), "Book-Dune-9780441172719");
        assert!(!FolderNameResolver::needs_rename(&id, &record));

        if let Record::Book(b) = &mut record {
            b.isbn = "0441172717".to_string();
        }
        assert!(FolderNameResolver::needs_rename(&id, &record));
    }

    #[test]
    fn test_alt_name_identity() {
        let mut record = Record::empty(Category::Manga);
        record.set_alt_name("shingeki no kyojin");
        let mut arena = IdentityArena::new();
        let id = FolderNameResolver::resolve(&record, &mut arena).unwrap();
        assert_eq!(id.as_str(), "Manga-ShingekiNoKyojin-0");

        record.set_name("Attack on Titan");
        assert!(FolderNameResolver::needs_rename(&id, &record));
    }
}
