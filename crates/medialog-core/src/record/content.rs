//! Related content for serial categories and the values derived from it

use serde::{Deserialize, Serialize};

use crate::codec::date;

/// One entry in an anime or show's related content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SerialItem {
    /// A one-off release (movie, OVA, special, ...)
    Single(SingleRelease),
    /// A run of episodes
    Season(Season),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SingleRelease {
    pub name: String,
    #[serde(rename = "type")]
    pub release_type: String,
    pub release: String,
    pub watched: String,
    pub rating: Option<f64>,
    pub review: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Season {
    pub name: String,
    pub start: String,
    pub end: String,
    pub status: String,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Episode {
    pub name: String,
    pub watched: String,
    pub rating: Option<f64>,
    pub review: String,
}

/// One entry in a manga's related content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MangaItem {
    Chapter(Chapter),
    Volume(Volume),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Chapter {
    pub name: String,
    pub release: String,
    pub read: String,
    pub rating: Option<f64>,
    pub review: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Volume {
    pub name: String,
    pub release: String,
    pub read: String,
    pub rating: Option<f64>,
    pub review: String,
    pub isbn: String,
    pub synopsis: String,
}

impl SerialItem {
    pub fn name(&self) -> &str {
        match self {
            SerialItem::Single(s) => &s.name,
            SerialItem::Season(s) => &s.name,
        }
    }

    /// Release date for singles, start date for seasons
    pub fn date(&self) -> &str {
        match self {
            SerialItem::Single(s) => &s.release,
            SerialItem::Season(s) => &s.start,
        }
    }
}

impl Season {
    /// Mean of the rated episodes, if any are rated
    pub fn mean_rating(&self) -> Option<f64> {
        mean(self.episodes.iter().filter_map(|e| e.rating))
    }
}

impl MangaItem {
    pub fn name(&self) -> &str {
        match self {
            MangaItem::Chapter(c) => &c.name,
            MangaItem::Volume(v) => &v.name,
        }
    }

    pub fn release(&self) -> &str {
        match self {
            MangaItem::Chapter(c) => &c.release,
            MangaItem::Volume(v) => &v.release,
        }
    }

    pub fn rating(&self) -> Option<f64> {
        match self {
            MangaItem::Chapter(c) => c.rating,
            MangaItem::Volume(v) => v.rating,
        }
    }
}

/// Arithmetic mean, `None` for an empty input
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Global rating of an anime or show.
///
/// Every rated single is one sample and every season with a rated episode
/// contributes its episode mean as one sample; the samples are averaged with
/// equal weight.
pub fn serial_rating(items: &[SerialItem]) -> Option<f64> {
    mean(items.iter().filter_map(|item| match item {
        SerialItem::Single(s) => s.rating,
        SerialItem::Season(s) => s.mean_rating(),
    }))
}

/// Global rating of a manga: chapter mean and volume mean, equally weighted,
/// using whichever of the two exist.
pub fn manga_rating(items: &[MangaItem]) -> Option<f64> {
    let chapters = mean(items.iter().filter_map(|item| match item {
        MangaItem::Chapter(c) => c.rating,
        MangaItem::Volume(_) => None,
    }));
    let volumes = mean(items.iter().filter_map(|item| match item {
        MangaItem::Volume(v) => v.rating,
        MangaItem::Chapter(_) => None,
    }));
    mean(chapters.into_iter().chain(volumes))
}

/// Earliest of a set of stored dates; empty and malformed dates are ignored
pub fn earliest_date<'a, I: IntoIterator<Item = &'a str>>(dates: I) -> Option<String> {
    dates
        .into_iter()
        .filter_map(|d| date::parse_internal(d).map(|parsed| (parsed, d)))
        .min_by_key(|(parsed, _)| *parsed)
        .map(|(_, d)| d.trim().to_string())
}

/// Two-decimal display of a rating, `N/A` when absent
pub fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(r) => format!("{:.2}", r),
        None => date::ABSENT.to_string(),
    }
}
