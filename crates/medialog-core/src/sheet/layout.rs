//! Worksheet layout shared by the spreadsheet exporter and importer
//!
//! Everything that decides where a value lands in the workbook lives here, so
//! that writing and reading stay inverse to each other: sheet names, column
//! schemas, cell rendering and cell decoding.

use std::collections::HashMap;

use crate::codec::{date, genre, ABSENT};
use crate::record::{
    Category, Chapter, Episode, MangaItem, Record, Season, SerialItem,
    SingleRelease, TextField, Volume,
};
use crate::store::FolderId;

/// Summary sheets are named `Category-<Name>`
pub const SUMMARY_PREFIX: &str = "Category-";

/// Maximum length of the `<Name>-<suffix>` part of a detail sheet name
pub const DETAIL_KEY_BUDGET: usize = 25;

/// Header of the summary column holding each row's exported folder identity
pub const ID_HEADER: &str = "Id";

/// Name of the content item that carries summary data for records imported
/// without their detail sheet
pub const PLACEHOLDER_NAME: &str = "Imported Data";

/// A value to write into one cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    /// Text cell, `N/A` when blank
    pub fn text(value: &str) -> Self {
        if value.trim().is_empty() {
            Cell::Text(ABSENT.to_string())
        } else {
            Cell::Text(value.to_string())
        }
    }

    /// Number cell, `N/A` when absent
    pub fn number(value: Option<f64>) -> Self {
        match value {
            Some(v) => Cell::Number(v),
            None => Cell::Text(ABSENT.to_string()),
        }
    }

    /// Computed rating rounded to the two decimals it is displayed with
    pub fn rating(value: Option<f64>) -> Self {
        Self::number(value.map(|r| (r * 100.0).round() / 100.0))
    }

    pub fn date(value: &str) -> Self {
        Cell::Text(date::to_display(value))
    }
}

pub fn summary_sheet_name(category: Category) -> String {
    format!("{}{}", SUMMARY_PREFIX, category.name())
}

/// Category of a summary sheet, `None` for any other sheet
pub fn summary_category(sheet_name: &str) -> Option<Category> {
    sheet_name
        .strip_prefix(SUMMARY_PREFIX)
        .and_then(Category::from_name)
}

/// Name of a per-record detail sheet: `<Category>-<TruncatedName>-<suffix>`.
///
/// The `<TruncatedName>-<suffix>` part is at most [`DETAIL_KEY_BUDGET`]
/// characters; only the name is ever shortened.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailSheetKey {
    pub category: Category,
    pub name: String,
    pub suffix: String,
}

impl DetailSheetKey {
    pub fn for_id(id: &FolderId) -> Self {
        let suffix = id.suffix().to_string();
        Self {
            category: id.category(),
            name: truncate(&sheet_safe(id.slug()), name_budget(&suffix)),
            suffix,
        }
    }

    pub fn sheet_name(&self) -> String {
        format!("{}-{}-{}", self.category.name(), self.name, self.suffix)
    }

    /// Inverse of [`sheet_name`](Self::sheet_name)
    pub fn parse(sheet_name: &str) -> Option<Self> {
        let (head, rest) = sheet_name.split_once('-')?;
        let category = Category::from_name(head)?;
        let (name, suffix) = rest.rsplit_once('-')?;
        if suffix.is_empty() {
            return None;
        }
        Some(Self {
            category,
            name: name.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Whether a record with this category and slug could have produced the key
    pub fn matches(&self, category: Category, slug: &str) -> bool {
        self.category == category
            && truncate(&sheet_safe(slug), name_budget(&self.suffix)) == self.name
    }

    /// Hyperlink target of the sheet's first data row
    pub fn link(&self) -> String {
        format!("internal:'{}'!A2", self.sheet_name().replace('\'', "''"))
    }

    /// Numeric suffix for ordering; non-numeric suffixes sort last
    pub fn counter(&self) -> u64 {
        self.suffix.parse().unwrap_or(u64::MAX)
    }
}

fn name_budget(suffix: &str) -> usize {
    DETAIL_KEY_BUDGET.saturating_sub(suffix.chars().count() + 1)
}

/// Worksheet names cannot hold `[` or `]`; slugs already lack the other
/// characters spreadsheet applications reject
fn sheet_safe(slug: &str) -> String {
    slug.chars().filter(|c| !matches!(c, '[' | ']')).collect()
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Items waiting to be matched to summary rows, in suffix order.
///
/// The k-th row asking for a given key receives the k-th pending item that
/// matches it, which reproduces the order rows were exported in.
#[derive(Debug)]
pub struct SuffixQueue<T> {
    pending: Vec<T>,
}

impl<T> SuffixQueue<T> {
    pub fn new<K: Ord>(mut items: Vec<T>, order: impl Fn(&T) -> K) -> Self {
        items.sort_by_key(|item| order(item));
        Self { pending: items }
    }

    /// Remove and return the first pending item accepted by `matches`
    pub fn take(&mut self, matches: impl Fn(&T) -> bool) -> Option<T> {
        let position = self.pending.iter().position(matches)?;
        Some(self.pending.remove(position))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// One column of a summary sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    AltName,
    Isbn,
    Rating,
    Text(TextField),
    PageCount,
    RunTime,
    ReleaseDate,
    LastRead,
    LastWatched,
    Genres,
    Bookmark,
    Images,
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::AltName => "Alt Name",
            Column::Isbn => "ISBN",
            Column::Rating => "Rating",
            Column::Text(field) => text_header(*field),
            Column::PageCount => "Pages",
            Column::RunTime => "Run Time",
            Column::ReleaseDate => "Release Date",
            Column::LastRead => "Last Read",
            Column::LastWatched => "Last Watched",
            Column::Genres => "Genres",
            Column::Bookmark => "Bookmark",
            Column::Images => "Images",
        }
    }

    /// Column of `category` with the given header
    pub fn from_header(category: Category, header: &str) -> Option<Self> {
        let header = header.trim();
        summary_columns(category)
            .into_iter()
            .find(|c| c.header().eq_ignore_ascii_case(header))
    }
}

fn text_header(field: TextField) -> &'static str {
    match field {
        TextField::Review => "Review",
        TextField::Synopsis => "Synopsis",
        TextField::Studio => "Studio",
        TextField::Directors => "Directors",
        TextField::Producers => "Producers",
        TextField::Writers => "Writers",
        TextField::Cast => "Cast",
        TextField::Music => "Music",
        TextField::License => "License",
        TextField::Network => "Network",
        TextField::Illustrators => "Illustrators",
        TextField::Publisher => "Publisher",
        TextField::AltPublisher => "Alt Publisher",
        TextField::Demographic => "Demographic",
        TextField::Authors => "Authors",
        TextField::Distributors => "Distributors",
    }
}

/// Fixed column schema of a category's summary sheet
pub fn summary_columns(category: Category) -> Vec<Column> {
    use TextField::*;

    let mut columns = vec![Column::Name];
    if category.has_alt_name() {
        columns.push(Column::AltName);
    }
    if category == Category::Book {
        columns.push(Column::Isbn);
    }
    columns.extend([
        Column::Rating,
        Column::Text(Review),
        Column::Text(Synopsis),
    ]);

    let contributors: &[TextField] = match category {
        Category::Anime => &[Studio, Directors, Producers, Writers, Music, License],
        Category::Book => &[Authors, Publisher],
        Category::Film => &[Directors, Writers, Cast, Producers, Music, Distributors, Studio],
        Category::Manga => &[Writers, Illustrators, Publisher, AltPublisher, Demographic],
        Category::Show => &[Directors, Producers, Writers, Cast, Music, Network],
    };
    columns.extend(contributors.iter().copied().map(Column::Text));

    match category {
        Category::Book => columns.push(Column::PageCount),
        Category::Film => columns.push(Column::RunTime),
        _ => {}
    }
    columns.push(Column::ReleaseDate);
    match category {
        Category::Book => columns.push(Column::LastRead),
        Category::Film => columns.push(Column::LastWatched),
        _ => {}
    }
    columns.extend([Column::Genres, Column::Bookmark, Column::Images]);
    columns
}

/// Value of `column` for `record`
pub fn render(record: &Record, column: Column) -> Cell {
    match column {
        Column::Name => Cell::text(record.name()),
        Column::AltName => Cell::text(record.alt_name().unwrap_or_default()),
        Column::Isbn => Cell::text(record.isbn().unwrap_or_default()),
        Column::Rating => Cell::rating(record.global_rating()),
        Column::Text(field) => Cell::text(record.text(field).unwrap_or_default()),
        Column::PageCount => match record {
            Record::Book(b) => Cell::number(b.page_count.map(f64::from)),
            _ => Cell::number(None),
        },
        Column::RunTime => match record {
            Record::Film(f) => Cell::number(f.run_time.map(f64::from)),
            _ => Cell::number(None),
        },
        Column::ReleaseDate => Cell::date(&record.earliest_release_date().unwrap_or_default()),
        Column::LastRead => match record {
            Record::Book(b) => Cell::date(&b.last_read),
            _ => Cell::date(""),
        },
        Column::LastWatched => match record {
            Record::Film(f) => Cell::date(&f.last_watched),
            _ => Cell::date(""),
        },
        Column::Genres => Cell::Text(genre::format_cell(record.genres())),
        Column::Bookmark => Cell::Text(if record.bookmark() { "Yes" } else { "No" }.to_string()),
        Column::Images => {
            let images: Vec<&str> = record.real_images().map(String::as_str).collect();
            Cell::text(&images.join("\n"))
        }
    }
}

/// Decode a summary cell into `record`.
///
/// Rating and release date only land on books and films; serial categories
/// derive both from their content.
pub fn apply(record: &mut Record, column: Column, value: &str) {
    match column {
        Column::Name => record.set_name(decode_text(value)),
        Column::AltName => record.set_alt_name(decode_text(value)),
        Column::Isbn => {
            if let Record::Book(b) = record {
                b.isbn = decode_text(value);
            }
        }
        Column::Rating => match record {
            Record::Book(b) => b.rating = decode_number(value),
            Record::Film(f) => f.rating = decode_number(value),
            _ => {}
        },
        Column::Text(field) => {
            if let Some(slot) = record.text_mut(field) {
                *slot = decode_text(value);
            }
        }
        Column::PageCount => {
            if let Record::Book(b) = record {
                b.page_count = decode_count(value);
            }
        }
        Column::RunTime => {
            if let Record::Film(f) = record {
                f.run_time = decode_count(value);
            }
        }
        Column::ReleaseDate => match record {
            Record::Book(b) => b.release_date = date::to_internal(value),
            Record::Film(f) => f.release_date = date::to_internal(value),
            _ => {}
        },
        Column::LastRead => {
            if let Record::Book(b) = record {
                b.last_read = date::to_internal(value);
            }
        }
        Column::LastWatched => {
            if let Record::Film(f) = record {
                f.last_watched = date::to_internal(value);
            }
        }
        Column::Genres => {
            let category = record.category();
            *record.genres_mut() = genre::parse_cell(category, value);
        }
        Column::Bookmark => record.set_bookmark(decode_flag(value)),
        Column::Images => {
            let images: Vec<String> = decode_text(value)
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            record.set_images(images);
        }
    }
}

/// `N/A` and blank cells become the empty string
pub fn decode_text(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case(ABSENT) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

pub fn decode_number(value: &str) -> Option<f64> {
    let value = decode_text(value);
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn decode_count(value: &str) -> Option<u32> {
    decode_number(value)
        .filter(|v| *v >= 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v.round() as u32)
}

fn decode_flag(value: &str) -> bool {
    matches!(
        decode_text(value).to_lowercase().as_str(),
        "yes" | "true" | "1" | "x"
    )
}

/// One data row with cells addressable by header
pub struct SheetRow<'a> {
    headers: &'a HashMap<String, usize>,
    cells: &'a [String],
}

impl<'a> SheetRow<'a> {
    pub fn new(headers: &'a HashMap<String, usize>, cells: &'a [String]) -> Self {
        Self { headers, cells }
    }

    /// Raw cell under `header`; empty when the column is missing
    pub fn get(&self, header: &str) -> &str {
        self.headers
            .get(&header.to_lowercase())
            .and_then(|&i| self.cells.get(i))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// Lowercased header -> column index
pub fn header_index(header_row: &[String]) -> HashMap<String, usize> {
    header_row
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect()
}

const SERIAL_DETAIL: &[&str] = &[
    "Kind", "Name", "Season", "Type", "Release", "Watched", "Start", "End", "Status", "Rating",
    "Review",
];

const MANGA_DETAIL: &[&str] = &[
    "Kind", "Name", "Release", "Read", "Rating", "Review", "ISBN", "Synopsis",
];

/// Header row of a detail sheet
pub fn detail_headers(category: Category) -> &'static [&'static str] {
    match category {
        Category::Manga => MANGA_DETAIL,
        _ => SERIAL_DETAIL,
    }
}

/// One row per content leaf. A season without episodes still gets a row so
/// that it survives a round-trip.
pub fn detail_rows(record: &Record) -> Vec<Vec<Cell>> {
    match record {
        Record::Anime(a) => serial_rows(&a.content),
        Record::Show(s) => serial_rows(&s.content),
        Record::Manga(m) => m.content.iter().map(manga_row).collect(),
        Record::Book(_) | Record::Film(_) => Vec::new(),
    }
}

fn serial_rows(items: &[SerialItem]) -> Vec<Vec<Cell>> {
    let none = || Cell::text("");
    let mut rows = Vec::new();
    for item in items {
        match item {
            SerialItem::Single(s) => rows.push(vec![
                Cell::text("Single"),
                Cell::text(&s.name),
                none(),
                Cell::text(&s.release_type),
                Cell::date(&s.release),
                Cell::date(&s.watched),
                none(),
                none(),
                none(),
                Cell::number(s.rating),
                Cell::text(&s.review),
            ]),
            SerialItem::Season(season) if season.episodes.is_empty() => rows.push(vec![
                Cell::text("Season"),
                none(),
                Cell::text(&season.name),
                none(),
                none(),
                none(),
                Cell::date(&season.start),
                Cell::date(&season.end),
                Cell::text(&season.status),
                none(),
                none(),
            ]),
            SerialItem::Season(season) => {
                for episode in &season.episodes {
                    rows.push(vec![
                        Cell::text("Episode"),
                        Cell::text(&episode.name),
                        Cell::text(&season.name),
                        none(),
                        none(),
                        Cell::date(&episode.watched),
                        Cell::date(&season.start),
                        Cell::date(&season.end),
                        Cell::text(&season.status),
                        Cell::number(episode.rating),
                        Cell::text(&episode.review),
                    ]);
                }
            }
        }
    }
    rows
}

fn manga_row(item: &MangaItem) -> Vec<Cell> {
    match item {
        MangaItem::Chapter(c) => vec![
            Cell::text("Chapter"),
            Cell::text(&c.name),
            Cell::date(&c.release),
            Cell::date(&c.read),
            Cell::number(c.rating),
            Cell::text(&c.review),
            Cell::text(""),
            Cell::text(""),
        ],
        MangaItem::Volume(v) => vec![
            Cell::text("Volume"),
            Cell::text(&v.name),
            Cell::date(&v.release),
            Cell::date(&v.read),
            Cell::number(v.rating),
            Cell::text(&v.review),
            Cell::text(&v.isbn),
            Cell::text(&v.synopsis),
        ],
    }
}

/// Rebuild a record's content from its detail rows, replacing what it had.
///
/// Consecutive episode rows sharing a season name form one season.
pub fn apply_detail_rows(record: &mut Record, rows: &[SheetRow<'_>]) {
    match record {
        Record::Anime(a) => a.content = parse_serial(rows),
        Record::Show(s) => s.content = parse_serial(rows),
        Record::Manga(m) => m.content = parse_manga(rows),
        Record::Book(_) | Record::Film(_) => {}
    }
}

fn parse_serial(rows: &[SheetRow<'_>]) -> Vec<SerialItem> {
    let mut items: Vec<SerialItem> = Vec::new();
    for row in rows.iter().filter(|r| !r.is_blank()) {
        let kind = decode_text(row.get("Kind")).to_lowercase();
        match kind.as_str() {
            "single" => items.push(SerialItem::Single(SingleRelease {
                name: decode_text(row.get("Name")),
                release_type: decode_text(row.get("Type")),
                release: date::to_internal(row.get("Release")),
                watched: date::to_internal(row.get("Watched")),
                rating: decode_number(row.get("Rating")),
                review: decode_text(row.get("Review")),
            })),
            "season" | "episode" => {
                let season_name = decode_text(row.get("Season"));
                let continues = matches!(
                    items.last(),
                    Some(SerialItem::Season(s)) if s.name == season_name
                );
                if !continues {
                    items.push(SerialItem::Season(Season {
                        name: season_name,
                        start: date::to_internal(row.get("Start")),
                        end: date::to_internal(row.get("End")),
                        status: decode_text(row.get("Status")),
                        episodes: Vec::new(),
                    }));
                }
                if kind == "episode" {
                    if let Some(SerialItem::Season(season)) = items.last_mut() {
                        season.episodes.push(Episode {
                            name: decode_text(row.get("Name")),
                            watched: date::to_internal(row.get("Watched")),
                            rating: decode_number(row.get("Rating")),
                            review: decode_text(row.get("Review")),
                        });
                    }
                }
            }
            other => tracing::warn!("Skipping detail row of unknown kind '{}'", other),
        }
    }
    items
}

fn parse_manga(rows: &[SheetRow<'_>]) -> Vec<MangaItem> {
    rows.iter()
        .filter(|r| !r.is_blank())
        .filter_map(|row| {
            let kind = decode_text(row.get("Kind")).to_lowercase();
            let name = decode_text(row.get("Name"));
            let release = date::to_internal(row.get("Release"));
            let read = date::to_internal(row.get("Read"));
            let rating = decode_number(row.get("Rating"));
            let review = decode_text(row.get("Review"));
            match kind.as_str() {
                "chapter" => Some(MangaItem::Chapter(Chapter {
                    name,
                    release,
                    read,
                    rating,
                    review,
                })),
                "volume" => Some(MangaItem::Volume(Volume {
                    name,
                    release,
                    read,
                    rating,
                    review,
                    isbn: decode_text(row.get("ISBN")),
                    synopsis: decode_text(row.get("Synopsis")),
                })),
                other => {
                    tracing::warn!("Skipping detail row of unknown kind '{}'", other);
                    None
                }
            }
        })
        .collect()
}

/// Give a serial record the single placeholder item that carries its summary
/// release date and rating
pub fn apply_placeholder(record: &mut Record, release: &str, rating: Option<f64>) {
    let release = date::to_internal(release);
    match record {
        Record::Anime(a) => a.content = vec![placeholder_single(release, rating)],
        Record::Show(s) => s.content = vec![placeholder_single(release, rating)],
        Record::Manga(m) => {
            m.content = vec![MangaItem::Chapter(Chapter {
                name: PLACEHOLDER_NAME.to_string(),
                release,
                rating,
                ..Default::default()
            })]
        }
        Record::Book(_) | Record::Film(_) => {}
    }
}

fn placeholder_single(release: String, rating: Option<f64>) -> SerialItem {
    SerialItem::Single(SingleRelease {
        name: PLACEHOLDER_NAME.to_string(),
        release,
        rating,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_detail_key_round_trip() {
        let id: FolderId = "Anime-CowboyBebop-3".parse().unwrap();
        let key = DetailSheetKey::for_id(&id);
        assert_eq!(key.sheet_name(), "Anime-CowboyBebop-3");
        assert_eq!(DetailSheetKey::parse(&key.sheet_name()), Some(key.clone()));
        assert!(key.matches(Category::Anime, "CowboyBebop"));
        assert!(!key.matches(Category::Show, "CowboyBebop"));
        assert_eq!(DetailSheetKey::parse("Category-Anime"), None);
    }

    #[test]
    fn test_detail_key_truncates_name_only() {
        let id: FolderId = "Show-TheExtremelyLongShowTitleOfDoom-12".parse().unwrap();
        let key = DetailSheetKey::for_id(&id);
        let tail = format!("{}-{}", key.name, key.suffix);
        assert_eq!(tail.chars().count(), DETAIL_KEY_BUDGET);
        assert_eq!(key.suffix, "12");
        assert_eq!(key.name, "TheExtremelyLongShowTi");
        assert!(key.matches(Category::Show, "TheExtremelyLongShowTitleOfDoom"));
        assert!(key.sheet_name().chars().count() <= 31);
    }

    #[test]
    fn test_detail_key_drops_brackets_and_quotes_link() {
        let id: FolderId = "Anime-[OshiNoKo]-0".parse().unwrap();
        let key = DetailSheetKey::for_id(&id);
        assert_eq!(key.sheet_name(), "Anime-OshiNoKo-0");
        assert!(key.matches(Category::Anime, "[OshiNoKo]"));

        let id: FolderId = "Show-Rock'n'roll-1".parse().unwrap();
        let key = DetailSheetKey::for_id(&id);
        assert_eq!(key.sheet_name(), "Show-Rock'n'roll-1");
        assert_eq!(key.link(), "internal:'Show-Rock''n''roll-1'!A2");
    }

    #[test]
    fn test_detail_rows_keep_exact_ratings() {
        let mut show = Record::empty(Category::Show);
        if let Record::Show(s) = &mut show {
            s.content = vec![SerialItem::Single(SingleRelease {
                name: "Pilot".to_string(),
                rating: Some(8.125),
                ..Default::default()
            })];
        }
        let rows = detail_rows(&show);
        assert_eq!(rows[0][9], Cell::Number(8.125));
        assert_eq!(Cell::rating(Some(8.125)), Cell::Number(8.13));
    }

    #[test]
    fn test_detail_key_with_dashed_slug() {
        let key = DetailSheetKey::parse("Film-Spider-Man-0").unwrap();
        assert_eq!(key.category, Category::Film);
        assert_eq!(key.name, "Spider-Man");
        assert_eq!(key.counter(), 0);
    }

    #[test]
    fn test_suffix_queue_hands_out_in_order() {
        let keys: Vec<DetailSheetKey> = ["Anime-Foo-2", "Anime-Foo-0", "Anime-Bar-0"]
            .iter()
            .filter_map(|s| DetailSheetKey::parse(s))
            .collect();
        let mut queue = SuffixQueue::new(keys, |k| k.counter());

        let first = queue.take(|k| k.matches(Category::Anime, "Foo")).unwrap();
        let second = queue.take(|k| k.matches(Category::Anime, "Foo")).unwrap();
        assert_eq!(first.suffix, "0");
        assert_eq!(second.suffix, "2");
        assert!(queue.take(|k| k.matches(Category::Anime, "Foo")).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_summary_columns() {
        let anime: Vec<&str> = summary_columns(Category::Anime)
            .iter()
            .map(Column::header)
            .collect();
        assert_eq!(&anime[..5], ["Name", "Alt Name", "Rating", "Review", "Synopsis"]);
        assert!(anime.contains(&"Genres"));
        assert!(anime.contains(&"Bookmark"));

        assert_eq!(
            Column::from_header(Category::Book, " isbn "),
            Some(Column::Isbn)
        );
        assert_eq!(Column::from_header(Category::Film, "ISBN"), None);
    }

    #[test]
    fn test_render_then_apply() {
        let mut film = Record::empty(Category::Film);
        film.set_name("Heat");
        if let Record::Film(f) = &mut film {
            f.rating = Some(9.0);
            f.run_time = Some(170);
            f.release_date = "1995-12-15".to_string();
            f.directors = "Michael Mann".to_string();
        }
        film.genres_mut().set("Crime", true);
        film.set_bookmark(true);

        let mut back = Record::empty(Category::Film);
        for column in summary_columns(Category::Film) {
            let value = match render(&film, column) {
                Cell::Text(t) => t,
                Cell::Number(n) => n.to_string(),
            };
            apply(&mut back, column, &value);
        }
        back.set_images(film.images().to_vec());
        assert_eq!(back, film);
    }

    #[test]
    fn test_absent_cells() {
        assert_eq!(decode_text("N/A"), "");
        assert_eq!(decode_number("N/A"), None);
        assert_eq!(decode_number("8"), Some(8.0));
        assert!(!decode_flag("N/A"));
        assert!(decode_flag("Yes"));
    }

    #[test]
    fn test_serial_detail_round_trip() {
        let mut show = Record::empty(Category::Show);
        if let Record::Show(s) = &mut show {
            s.content = vec![
                SerialItem::Season(Season {
                    name: "Season 1".to_string(),
                    start: "2008-01-20".to_string(),
                    end: "2008-03-09".to_string(),
                    status: "Finished".to_string(),
                    episodes: vec![
                        Episode {
                            name: "Pilot".to_string(),
                            watched: "2020-01-01".to_string(),
                            rating: Some(9.0),
                            review: "Strong start".to_string(),
                        },
                        Episode {
                            name: "Cat's in the Bag".to_string(),
                            rating: Some(8.5),
                            ..Default::default()
                        },
                    ],
                }),
                SerialItem::Single(SingleRelease {
                    name: "El Camino".to_string(),
                    release_type: "Movie".to_string(),
                    release: "2019-10-11".to_string(),
                    rating: Some(7.0),
                    ..Default::default()
                }),
                SerialItem::Season(Season {
                    name: "Season 2".to_string(),
                    ..Default::default()
                }),
            ];
        }

        let headers = header_index(&cells(detail_headers(Category::Show)));
        let rendered: Vec<Vec<String>> = detail_rows(&show)
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|c| match c {
                        Cell::Text(t) => t,
                        Cell::Number(n) => n.to_string(),
                    })
                    .collect()
            })
            .collect();
        assert_eq!(rendered.len(), 4);

        let rows: Vec<SheetRow<'_>> = rendered.iter().map(|r| SheetRow::new(&headers, r)).collect();
        let mut back = Record::empty(Category::Show);
        apply_detail_rows(&mut back, &rows);

        let (Record::Show(original), Record::Show(rebuilt)) = (&show, &back) else {
            panic!("category changed");
        };
        assert_eq!(rebuilt.content, original.content);
    }

    #[test]
    fn test_placeholder() {
        let mut manga = Record::empty(Category::Manga);
        apply_placeholder(&mut manga, "05-01-2020", Some(7.5));
        assert_eq!(manga.global_rating(), Some(7.5));
        assert_eq!(manga.earliest_release_date(), Some("2020-05-01".to_string()));
        if let Record::Manga(m) = &manga {
            assert_eq!(m.content[0].name(), PLACEHOLDER_NAME);
        }
    }
}
