//! Per-record genre selection

use serde::{Deserialize, Serialize};

use crate::codec::genre::{self, GenreToken};
use crate::record::Category;

/// A record's genres: the category vocabulary, a parallel membership array
/// and free-text extras.
///
/// `vocabulary` and `selected` always have the same length and are
/// index-aligned. `overflow` holds unique, case-preserved strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawGenreSelection")]
pub struct GenreSelection {
    vocabulary: Vec<String>,
    selected: Vec<bool>,
    overflow: Vec<String>,
}

/// On-disk shape, accepted as-is and then repaired into a valid selection
#[derive(Deserialize)]
struct RawGenreSelection {
    #[serde(default)]
    vocabulary: Vec<String>,
    #[serde(default)]
    selected: Vec<bool>,
    #[serde(default)]
    overflow: Vec<String>,
}

impl From<RawGenreSelection> for GenreSelection {
    fn from(raw: RawGenreSelection) -> Self {
        let mut selected = raw.selected;
        selected.resize(raw.vocabulary.len(), false);

        let mut selection = Self {
            vocabulary: raw.vocabulary,
            selected,
            overflow: Vec::new(),
        };
        for extra in &raw.overflow {
            selection.add_overflow(extra);
        }
        selection
    }
}

impl GenreSelection {
    /// An empty selection over a category's vocabulary
    pub fn new(category: Category) -> Self {
        let vocabulary: Vec<String> = genre::vocabulary(category)
            .iter()
            .map(|s| s.to_string())
            .collect();
        let selected = vec![false; vocabulary.len()];
        Self {
            vocabulary,
            selected,
            overflow: Vec::new(),
        }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn overflow(&self) -> &[String] {
        &self.overflow
    }

    /// Symbols currently selected, in vocabulary order
    pub fn selected_symbols(&self) -> impl Iterator<Item = &str> {
        self.vocabulary
            .iter()
            .zip(&self.selected)
            .filter(|(_, on)| **on)
            .map(|(s, _)| s.as_str())
    }

    pub fn is_selected(&self, symbol: &str) -> bool {
        self.vocabulary
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.selected[i])
            .unwrap_or(false)
    }

    /// Set membership for a vocabulary symbol. Returns false if the symbol is
    /// not part of this vocabulary.
    pub fn set(&mut self, symbol: &str, on: bool) -> bool {
        match self.vocabulary.iter().position(|s| s == symbol) {
            Some(i) => {
                self.selected[i] = on;
                true
            }
            None => false,
        }
    }

    /// Add a free-text genre if it is not already present
    pub fn add_overflow(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() || self.overflow.iter().any(|o| o == text) {
            return;
        }
        self.overflow.push(text.to_string());
    }

    /// No genre selected and no overflow
    pub fn is_empty(&self) -> bool {
        !self.selected.iter().any(|on| *on) && self.overflow.is_empty()
    }

    /// Every genre as a display string, vocabulary first
    pub fn display_names(&self) -> Vec<String> {
        self.selected_symbols()
            .map(genre::to_display)
            .chain(self.overflow.iter().cloned())
            .collect()
    }

    /// Union externally found genre names into this selection.
    ///
    /// Names matching the vocabulary flip their flag; the rest join the
    /// overflow list, which is then sorted.
    pub fn merge_names<S: AsRef<str>>(&mut self, category: Category, names: &[S]) {
        for name in names {
            match genre::to_symbol(category, name.as_ref()) {
                GenreToken::Known(symbol) => {
                    if !self.set(symbol, true) {
                        self.add_overflow(name.as_ref());
                    }
                }
                GenreToken::Overflow(text) => self.add_overflow(&text),
            }
        }
        self.overflow.sort_by_key(|o| o.to_lowercase());
    }

    /// Re-key this selection onto the current vocabulary of `category`.
    ///
    /// Selected symbols that are no longer in the vocabulary move to the
    /// overflow list so nothing the user picked is lost.
    pub fn realign(&mut self, category: Category) {
        let current = genre::vocabulary(category);
        if self.vocabulary.len() == current.len()
            && self.vocabulary.iter().zip(current).all(|(a, b)| a == b)
        {
            return;
        }

        let previous: Vec<String> = self.selected_symbols().map(str::to_string).collect();
        let overflow = std::mem::take(&mut self.overflow);
        *self = Self::new(category);
        for symbol in previous {
            if !self.set(&symbol, true) {
                self.add_overflow(&genre::to_display(&symbol));
            }
        }
        for extra in overflow {
            self.add_overflow(&extra);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_aligned() {
        for category in Category::ALL {
            let selection = GenreSelection::new(category);
            assert_eq!(selection.vocabulary().len(), genre::vocabulary(category).len());
            assert!(selection.is_empty());
        }
    }

    #[test]
    fn test_set_and_overflow() {
        let mut selection = GenreSelection::new(Category::Film);
        assert!(selection.set("Western", true));
        assert!(!selection.set("Isekai", true));
        selection.add_overflow("Heist");
        selection.add_overflow("Heist");
        selection.add_overflow("heist");

        assert!(selection.is_selected("Western"));
        assert_eq!(selection.overflow(), &["Heist".to_string(), "heist".to_string()]);
    }

    #[test]
    fn test_merge_names() {
        let mut selection = GenreSelection::new(Category::Anime);
        selection.add_overflow("Zombies");
        selection.merge_names(Category::Anime, &["Sci-Fi", "Cooking", "action", "Zombies"]);

        assert!(selection.is_selected("SciFi"));
        assert!(selection.is_selected("Action"));
        assert_eq!(selection.overflow(), &["Cooking".to_string(), "Zombies".to_string()]);
    }

    #[test]
    fn test_deserialize_repairs_lengths() {
        let json = r#"{"vocabulary":["Action","Drama"],"selected":[true],"overflow":["X","X"]}"#;
        let selection: GenreSelection = serde_json::from_str(json).unwrap();
        assert_eq!(selection.vocabulary().len(), 2);
        assert!(selection.is_selected("Action"));
        assert!(!selection.is_selected("Drama"));
        assert_eq!(selection.overflow(), &["X".to_string()]);
    }

    #[test]
    fn test_realign_keeps_unknown_symbols() {
        let json = r#"{"vocabulary":["Action","Spaghetti"],"selected":[true,true],"overflow":[]}"#;
        let mut selection: GenreSelection = serde_json::from_str(json).unwrap();
        selection.realign(Category::Film);

        assert_eq!(selection.vocabulary().len(), genre::vocabulary(Category::Film).len());
        assert!(selection.is_selected("Action"));
        assert_eq!(selection.overflow(), &["Spaghetti".to_string()]);
    }
}
