//! Genre vocabulary and its display form
//!
//! Each category has a fixed, ordered list of genre symbols. Symbols are
//! written without punctuation or spaces (`SciFi`, `SliceOfLife`); the
//! spreadsheet shows their human form (`Sci-Fi`, `Slice of Life`). Anything a
//! user types that is not in the vocabulary is kept verbatim as an overflow
//! genre.

use crate::codec::ABSENT;
use crate::record::{Category, GenreSelection};

/// Symbols whose display form is not derived by splitting on capitals
const SPECIAL_FORMS: &[(&str, &str)] = &[
    ("CGDCT", "CGDCT"),
    ("ComingOfAge", "Coming-of-Age"),
    ("PostApocalyptic", "Post-Apocalyptic"),
    ("SciFi", "Sci-Fi"),
    ("SliceOfLife", "Slice of Life"),
];

const ANIME_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "CGDCT",
    "Comedy",
    "ComingOfAge",
    "Drama",
    "Ecchi",
    "Fantasy",
    "Harem",
    "Historical",
    "Horror",
    "Isekai",
    "Josei",
    "Magic",
    "MartialArts",
    "Mecha",
    "Military",
    "Music",
    "Mystery",
    "Parody",
    "PostApocalyptic",
    "Psychological",
    "Romance",
    "School",
    "SciFi",
    "Seinen",
    "Shoujo",
    "Shounen",
    "SliceOfLife",
    "Space",
    "Sports",
    "SuperPower",
    "Supernatural",
    "Thriller",
];

const BOOK_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Biography",
    "Classic",
    "Comedy",
    "ComingOfAge",
    "Crime",
    "Drama",
    "Dystopian",
    "Fantasy",
    "Historical",
    "Horror",
    "Memoir",
    "Mystery",
    "Nonfiction",
    "Philosophy",
    "Poetry",
    "PostApocalyptic",
    "Romance",
    "SciFi",
    "SelfHelp",
    "Thriller",
    "YoungAdult",
];

const FILM_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Animation",
    "Biography",
    "Comedy",
    "ComingOfAge",
    "Crime",
    "Documentary",
    "Drama",
    "Family",
    "Fantasy",
    "FilmNoir",
    "History",
    "Horror",
    "Musical",
    "Mystery",
    "PostApocalyptic",
    "Romance",
    "SciFi",
    "Sport",
    "Superhero",
    "Thriller",
    "War",
    "Western",
];

const MANGA_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "CGDCT",
    "Comedy",
    "ComingOfAge",
    "Drama",
    "Ecchi",
    "Fantasy",
    "Harem",
    "Historical",
    "Horror",
    "Isekai",
    "Josei",
    "Magic",
    "MartialArts",
    "Mecha",
    "Military",
    "Mystery",
    "PostApocalyptic",
    "Psychological",
    "Romance",
    "School",
    "SciFi",
    "Seinen",
    "Shoujo",
    "Shounen",
    "SliceOfLife",
    "Sports",
    "Supernatural",
    "Thriller",
    "Tragedy",
];

const SHOW_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Animation",
    "Comedy",
    "ComingOfAge",
    "Crime",
    "Documentary",
    "Drama",
    "Family",
    "Fantasy",
    "History",
    "Horror",
    "Miniseries",
    "Mystery",
    "PostApocalyptic",
    "Reality",
    "Romance",
    "SciFi",
    "Sitcom",
    "SliceOfLife",
    "Superhero",
    "TalkShow",
    "Thriller",
    "Western",
];

/// The fixed, ordered genre vocabulary for a category
pub fn vocabulary(category: Category) -> &'static [&'static str] {
    match category {
        Category::Anime => ANIME_GENRES,
        Category::Book => BOOK_GENRES,
        Category::Film => FILM_GENRES,
        Category::Manga => MANGA_GENRES,
        Category::Show => SHOW_GENRES,
    }
}

/// Result of decoding one display string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreToken {
    /// A member of the category's vocabulary
    Known(&'static str),
    /// Free text kept as typed
    Overflow(String),
}

/// Human-readable form of a genre symbol
pub fn to_display(symbol: &str) -> String {
    if let Some((_, display)) = SPECIAL_FORMS.iter().find(|(s, _)| *s == symbol) {
        return (*display).to_string();
    }

    let mut out = String::with_capacity(symbol.len() + 4);
    for (i, c) in symbol.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Decode a display string against a category's vocabulary.
///
/// Matching is case-insensitive. Unknown values come back as overflow with
/// only the surrounding whitespace removed.
pub fn to_symbol(category: Category, display: &str) -> GenreToken {
    let display = display.trim();
    vocabulary(category)
        .iter()
        .find(|symbol| {
            to_display(symbol).eq_ignore_ascii_case(display) || symbol.eq_ignore_ascii_case(display)
        })
        .map(|symbol| GenreToken::Known(*symbol))
        .unwrap_or_else(|| GenreToken::Overflow(display.to_string()))
}

/// Render a selection as one spreadsheet cell: sorted, comma-joined, `N/A` when empty
pub fn format_cell(selection: &GenreSelection) -> String {
    let mut names: Vec<String> = selection
        .selected_symbols()
        .map(to_display)
        .chain(selection.overflow().iter().cloned())
        .collect();

    if names.is_empty() {
        return ABSENT.to_string();
    }

    names.sort_by_key(|n| n.to_lowercase());
    names.join(", ")
}

/// Parse a genre cell back into a selection for `category`
pub fn parse_cell(category: Category, cell: &str) -> GenreSelection {
    let mut selection = GenreSelection::new(category);
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case(ABSENT) {
        return selection;
    }

    for part in cell.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match to_symbol(category, part) {
            GenreToken::Known(symbol) => {
                selection.set(symbol, true);
            }
            GenreToken::Overflow(text) => selection.add_overflow(&text),
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_forms() {
        assert_eq!(to_display("SciFi"), "Sci-Fi");
        assert_eq!(to_display("ComingOfAge"), "Coming-of-Age");
        assert_eq!(to_display("PostApocalyptic"), "Post-Apocalyptic");
        assert_eq!(to_display("SliceOfLife"), "Slice of Life");
        assert_eq!(to_display("CGDCT"), "CGDCT");
    }

    #[test]
    fn test_split_on_capitals() {
        assert_eq!(to_display("MartialArts"), "Martial Arts");
        assert_eq!(to_display("Action"), "Action");
        assert_eq!(to_display("TalkShow"), "Talk Show");
    }

    #[test]
    fn test_vocabulary_round_trip() {
        for category in Category::ALL {
            for symbol in vocabulary(category) {
                assert_eq!(
                    to_symbol(category, &to_display(symbol)),
                    GenreToken::Known(*symbol),
                    "{:?} {}",
                    category,
                    symbol
                );
            }
        }
    }

    #[test]
    fn test_unknown_is_overflow() {
        assert_eq!(
            to_symbol(Category::Anime, " Cooking "),
            GenreToken::Overflow("Cooking".to_string())
        );
        // Only in the film vocabulary
        assert_eq!(
            to_symbol(Category::Anime, "Film Noir"),
            GenreToken::Overflow("Film Noir".to_string())
        );
        assert_eq!(to_symbol(Category::Film, "film noir"), GenreToken::Known("FilmNoir"));
    }

    #[test]
    fn test_cell_round_trip() {
        let mut selection = GenreSelection::new(Category::Anime);
        selection.set("SciFi", true);
        selection.set("Action", true);
        selection.add_overflow("Cooking");

        let cell = format_cell(&selection);
        assert_eq!(cell, "Action, Cooking, Sci-Fi");

        let parsed = parse_cell(Category::Anime, &cell);
        assert_eq!(parsed, selection);
    }

    #[test]
    fn test_empty_cell() {
        let selection = GenreSelection::new(Category::Book);
        assert_eq!(format_cell(&selection), "N/A");
        assert!(parse_cell(Category::Book, "N/A").is_empty());
    }
}
