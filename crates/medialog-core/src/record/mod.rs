//! Media record data structures
//!
//! A [`Record`] is one catalog entry. The five categories share a common core
//! (names, review, synopsis, images, genres, bookmark) and differ in their
//! contributor fields and in whether they carry nested related content.

mod content;
mod genre;

pub use content::*;
pub use genre::GenreSelection;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Anime,
    Book,
    Film,
    Manga,
    Show,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Anime,
        Category::Book,
        Category::Film,
        Category::Manga,
        Category::Show,
    ];

    /// Name used in folder identities and sheet names
    pub fn name(&self) -> &'static str {
        match self {
            Category::Anime => "Anime",
            Category::Book => "Book",
            Category::Film => "Film",
            Category::Manga => "Manga",
            Category::Show => "Show",
        }
    }

    /// Parse from the name used in folder identities
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Whether records carry nested related content
    pub fn has_content(&self) -> bool {
        matches!(self, Category::Anime | Category::Manga | Category::Show)
    }

    /// Whether records have an alternate-language name
    pub fn has_alt_name(&self) -> bool {
        matches!(self, Category::Anime | Category::Manga)
    }

    /// Whether duplicate titles are told apart by a numeric folder suffix.
    /// Books use their ISBN instead.
    pub fn uses_counter(&self) -> bool {
        !matches!(self, Category::Book)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Free-text scalar fields addressable by name.
///
/// Used wherever a field is handled generically: spreadsheet columns and the
/// merge of externally fetched metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Review,
    Synopsis,
    Studio,
    Directors,
    Producers,
    Writers,
    Cast,
    Music,
    License,
    Network,
    Illustrators,
    Publisher,
    AltPublisher,
    Demographic,
    Authors,
    Distributors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anime {
    pub name: String,
    #[serde(default)]
    pub alt_name: String,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub genres: GenreSelection,
    #[serde(default)]
    pub bookmark: bool,
    #[serde(default)]
    pub studio: String,
    #[serde(default)]
    pub directors: String,
    #[serde(default)]
    pub producers: String,
    #[serde(default)]
    pub writers: String,
    #[serde(default)]
    pub music: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub content: Vec<SerialItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub name: String,
    pub isbn: String,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub genres: GenreSelection,
    #[serde(default)]
    pub bookmark: bool,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub last_read: String,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub name: String,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub genres: GenreSelection,
    #[serde(default)]
    pub bookmark: bool,
    #[serde(default)]
    pub directors: String,
    #[serde(default)]
    pub writers: String,
    #[serde(default)]
    pub cast: String,
    #[serde(default)]
    pub producers: String,
    #[serde(default)]
    pub music: String,
    #[serde(default)]
    pub distributors: String,
    #[serde(default)]
    pub studio: String,
    /// Minutes
    #[serde(default)]
    pub run_time: Option<u32>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub last_watched: String,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manga {
    pub name: String,
    #[serde(default)]
    pub alt_name: String,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub genres: GenreSelection,
    #[serde(default)]
    pub bookmark: bool,
    #[serde(default)]
    pub writers: String,
    #[serde(default)]
    pub illustrators: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub alt_publisher: String,
    #[serde(default)]
    pub demographic: String,
    #[serde(default)]
    pub content: Vec<MangaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub name: String,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub genres: GenreSelection,
    #[serde(default)]
    pub bookmark: bool,
    #[serde(default)]
    pub directors: String,
    #[serde(default)]
    pub producers: String,
    #[serde(default)]
    pub writers: String,
    #[serde(default)]
    pub cast: String,
    #[serde(default)]
    pub music: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub content: Vec<SerialItem>,
}

/// One catalog entry, as stored in a record folder's `data.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum Record {
    Anime(Anime),
    Book(Book),
    Film(Film),
    Manga(Manga),
    Show(Show),
}

/// Apply the same expression to whichever variant `record` holds
macro_rules! each {
    ($record:expr, $inner:ident => $body:expr) => {
        match $record {
            Record::Anime($inner) => $body,
            Record::Book($inner) => $body,
            Record::Film($inner) => $body,
            Record::Manga($inner) => $body,
            Record::Show($inner) => $body,
        }
    };
}

impl Record {
    /// An empty record of the given category
    pub fn empty(category: Category) -> Self {
        let genres = GenreSelection::new(category);
        match category {
            Category::Anime => Record::Anime(Anime {
                name: String::new(),
                alt_name: String::new(),
                review: String::new(),
                synopsis: String::new(),
                images: Vec::new(),
                genres,
                bookmark: false,
                studio: String::new(),
                directors: String::new(),
                producers: String::new(),
                writers: String::new(),
                music: String::new(),
                license: String::new(),
                content: Vec::new(),
            }),
            Category::Book => Record::Book(Book {
                name: String::new(),
                isbn: String::new(),
                review: String::new(),
                synopsis: String::new(),
                images: Vec::new(),
                genres,
                bookmark: false,
                authors: String::new(),
                publisher: String::new(),
                page_count: None,
                release_date: String::new(),
                last_read: String::new(),
                rating: None,
            }),
            Category::Film => Record::Film(Film {
                name: String::new(),
                review: String::new(),
                synopsis: String::new(),
                images: Vec::new(),
                genres,
                bookmark: false,
                directors: String::new(),
                writers: String::new(),
                cast: String::new(),
                producers: String::new(),
                music: String::new(),
                distributors: String::new(),
                studio: String::new(),
                run_time: None,
                release_date: String::new(),
                last_watched: String::new(),
                rating: None,
            }),
            Category::Manga => Record::Manga(Manga {
                name: String::new(),
                alt_name: String::new(),
                review: String::new(),
                synopsis: String::new(),
                images: Vec::new(),
                genres,
                bookmark: false,
                writers: String::new(),
                illustrators: String::new(),
                publisher: String::new(),
                alt_publisher: String::new(),
                demographic: String::new(),
                content: Vec::new(),
            }),
            Category::Show => Record::Show(Show {
                name: String::new(),
                review: String::new(),
                synopsis: String::new(),
                images: Vec::new(),
                genres,
                bookmark: false,
                directors: String::new(),
                producers: String::new(),
                writers: String::new(),
                cast: String::new(),
                music: String::new(),
                network: String::new(),
                content: Vec::new(),
            }),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Record::Anime(_) => Category::Anime,
            Record::Book(_) => Category::Book,
            Record::Film(_) => Category::Film,
            Record::Manga(_) => Category::Manga,
            Record::Show(_) => Category::Show,
        }
    }

    pub fn name(&self) -> &str {
        each!(self, r => &r.name)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        each!(self, r => r.name = name.into())
    }

    /// Alternate-language name, for categories that have one
    pub fn alt_name(&self) -> Option<&str> {
        match self {
            Record::Anime(a) => Some(&a.alt_name),
            Record::Manga(m) => Some(&m.alt_name),
            _ => None,
        }
    }

    pub fn set_alt_name(&mut self, alt: impl Into<String>) {
        match self {
            Record::Anime(a) => a.alt_name = alt.into(),
            Record::Manga(m) => m.alt_name = alt.into(),
            _ => {}
        }
    }

    /// The name shown to users: primary name, or the alternate one if the
    /// primary is empty
    pub fn display_name(&self) -> &str {
        let name = self.name().trim();
        if name.is_empty() {
            self.alt_name().map(str::trim).unwrap_or_default()
        } else {
            name
        }
    }

    /// ISBN/ASIN of a book
    pub fn isbn(&self) -> Option<&str> {
        match self {
            Record::Book(b) => Some(&b.isbn),
            _ => None,
        }
    }

    pub fn images(&self) -> &[String] {
        each!(self, r => &r.images)
    }

    pub fn set_images(&mut self, images: Vec<String>) {
        each!(self, r => r.images = images)
    }

    /// Images other than the "no image" placeholder
    pub fn real_images(&self) -> impl Iterator<Item = &String> {
        self.images().iter().filter(|i| !i.is_empty())
    }

    pub fn genres(&self) -> &GenreSelection {
        each!(self, r => &r.genres)
    }

    pub fn genres_mut(&mut self) -> &mut GenreSelection {
        each!(self, r => &mut r.genres)
    }

    pub fn bookmark(&self) -> bool {
        each!(self, r => r.bookmark)
    }

    pub fn set_bookmark(&mut self, on: bool) {
        each!(self, r => r.bookmark = on)
    }

    /// Read a free-text field; `None` if this category does not have it
    pub fn text(&self, field: TextField) -> Option<&str> {
        use TextField::*;
        let value: &String = match (self, field) {
            (_, Review) => each!(self, r => &r.review),
            (_, Synopsis) => each!(self, r => &r.synopsis),
            (Record::Anime(a), Studio) => &a.studio,
            (Record::Anime(a), Directors) => &a.directors,
            (Record::Anime(a), Producers) => &a.producers,
            (Record::Anime(a), Writers) => &a.writers,
            (Record::Anime(a), Music) => &a.music,
            (Record::Anime(a), License) => &a.license,
            (Record::Book(b), Authors) => &b.authors,
            (Record::Book(b), Publisher) => &b.publisher,
            (Record::Film(f), Directors) => &f.directors,
            (Record::Film(f), Writers) => &f.writers,
            (Record::Film(f), Cast) => &f.cast,
            (Record::Film(f), Producers) => &f.producers,
            (Record::Film(f), Music) => &f.music,
            (Record::Film(f), Distributors) => &f.distributors,
            (Record::Film(f), Studio) => &f.studio,
            (Record::Manga(m), Writers) => &m.writers,
            (Record::Manga(m), Illustrators) => &m.illustrators,
            (Record::Manga(m), Publisher) => &m.publisher,
            (Record::Manga(m), AltPublisher) => &m.alt_publisher,
            (Record::Manga(m), Demographic) => &m.demographic,
            (Record::Show(s), Directors) => &s.directors,
            (Record::Show(s), Producers) => &s.producers,
            (Record::Show(s), Writers) => &s.writers,
            (Record::Show(s), Cast) => &s.cast,
            (Record::Show(s), Music) => &s.music,
            (Record::Show(s), Network) => &s.network,
            _ => return None,
        };
        Some(value)
    }

    /// Mutable access to a free-text field; `None` if this category does not have it
    pub fn text_mut(&mut self, field: TextField) -> Option<&mut String> {
        use TextField::*;
        let value: &mut String = match (self, field) {
            (Record::Anime(a), Review) => &mut a.review,
            (Record::Book(b), Review) => &mut b.review,
            (Record::Film(f), Review) => &mut f.review,
            (Record::Manga(m), Review) => &mut m.review,
            (Record::Show(s), Review) => &mut s.review,
            (Record::Anime(a), Synopsis) => &mut a.synopsis,
            (Record::Book(b), Synopsis) => &mut b.synopsis,
            (Record::Film(f), Synopsis) => &mut f.synopsis,
            (Record::Manga(m), Synopsis) => &mut m.synopsis,
            (Record::Show(s), Synopsis) => &mut s.synopsis,
            (Record::Anime(a), Studio) => &mut a.studio,
            (Record::Anime(a), Directors) => &mut a.directors,
            (Record::Anime(a), Producers) => &mut a.producers,
            (Record::Anime(a), Writers) => &mut a.writers,
            (Record::Anime(a), Music) => &mut a.music,
            (Record::Anime(a), License) => &mut a.license,
            (Record::Book(b), Authors) => &mut b.authors,
            (Record::Book(b), Publisher) => &mut b.publisher,
            (Record::Film(f), Directors) => &mut f.directors,
            (Record::Film(f), Writers) => &mut f.writers,
            (Record::Film(f), Cast) => &mut f.cast,
            (Record::Film(f), Producers) => &mut f.producers,
            (Record::Film(f), Music) => &mut f.music,
            (Record::Film(f), Distributors) => &mut f.distributors,
            (Record::Film(f), Studio) => &mut f.studio,
            (Record::Manga(m), Writers) => &mut m.writers,
            (Record::Manga(m), Illustrators) => &mut m.illustrators,
            (Record::Manga(m), Publisher) => &mut m.publisher,
            (Record::Manga(m), AltPublisher) => &mut m.alt_publisher,
            (Record::Manga(m), Demographic) => &mut m.demographic,
            (Record::Show(s), Directors) => &mut s.directors,
            (Record::Show(s), Producers) => &mut s.producers,
            (Record::Show(s), Writers) => &mut s.writers,
            (Record::Show(s), Cast) => &mut s.cast,
            (Record::Show(s), Music) => &mut s.music,
            (Record::Show(s), Network) => &mut s.network,
            _ => return None,
        };
        Some(value)
    }

    /// Computed overall rating.
    ///
    /// Serial categories derive it from their content; books and films use
    /// their own rating.
    pub fn global_rating(&self) -> Option<f64> {
        match self {
            Record::Anime(a) => serial_rating(&a.content),
            Record::Show(s) => serial_rating(&s.content),
            Record::Manga(m) => manga_rating(&m.content),
            Record::Book(b) => b.rating,
            Record::Film(f) => f.rating,
        }
    }

    /// Earliest known release date, `None` if no date is present
    pub fn earliest_release_date(&self) -> Option<String> {
        match self {
            Record::Anime(a) => earliest_date(a.content.iter().map(SerialItem::date)),
            Record::Show(s) => earliest_date(s.content.iter().map(SerialItem::date)),
            Record::Manga(m) => earliest_date(m.content.iter().map(MangaItem::release)),
            Record::Book(b) => earliest_date([b.release_date.as_str()]),
            Record::Film(f) => earliest_date([f.release_date.as_str()]),
        }
    }

    /// Whether the record is missing data an external lookup could fill in
    pub fn needs_enrichment(&self) -> bool {
        let missing_text = match self {
            Record::Book(b) => b.authors.trim().is_empty() || b.publisher.trim().is_empty(),
            _ => false,
        };
        self.text(TextField::Synopsis).unwrap_or_default().trim().is_empty()
            || self.genres().is_empty()
            || self.real_images().next().is_none()
            || missing_text
    }

    /// Check the invariants required before a record can be stored
    pub fn validate(&self) -> Result<(), String> {
        if self.display_name().is_empty() {
            return Err(match self.category() {
                Category::Anime | Category::Manga => {
                    "a name or an alternate name is required".to_string()
                }
                _ => "a name is required".to_string(),
            });
        }
        if let Some(isbn) = self.isbn() {
            if normalize_isbn(isbn).is_none() {
                return Err(format!("'{}' is not a 10 or 13 character ISBN/ASIN", isbn));
            }
        }
        Ok(())
    }

    /// Bring derived structure up to date with the current vocabulary
    pub fn normalize(&mut self) {
        let category = self.category();
        self.genres_mut().realign(category);
    }
}

/// Strip separators from an ISBN/ASIN and check it has a usable length.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .collect();
    let usable = matches!(cleaned.chars().count(), 10 | 13)
        && cleaned.chars().all(|c| c.is_ascii_alphanumeric());
    usable.then_some(cleaned)
}
