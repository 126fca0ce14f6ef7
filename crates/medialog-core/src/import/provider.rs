//! External metadata lookup used to enrich imported records

use std::future::Future;

use crate::record::{Category, TextField};

/// A source of externally fetched metadata (a scraper or web API).
///
/// An empty search result means "not found" and is not an error.
pub trait MetadataProvider: Send + Sync {
    /// Find candidates matching a title.
    fn search_by_name(
        &self,
        name: &str,
        category: Category,
    ) -> impl Future<Output = Result<Vec<Candidate>, ProviderError>> + Send;

    /// Fetch the full details of a candidate.
    fn fetch_details(
        &self,
        candidate: &Candidate,
    ) -> impl Future<Output = Result<FetchedDetails, ProviderError>> + Send;
}

/// A search hit
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candidate {
    pub title: String,
    /// Provider-specific handle (URL or id) passed back to `fetch_details`
    pub reference: String,
    pub category: Category,
}

/// Best-effort structured data for one title
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedDetails {
    /// Free-text fields; fields the record's category lacks are ignored
    pub fields: Vec<(TextField, String)>,
    /// Genre display names
    pub genres: Vec<String>,
    /// Image URLs
    pub images: Vec<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Network(e.to_string())
    }
}

/// The candidate whose title equals `name` ignoring case, else the first one
pub fn best_match<'a>(name: &str, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
    let name = name.trim().to_lowercase();
    candidates
        .iter()
        .find(|c| c.title.trim().to_lowercase() == name)
        .or_else(|| candidates.first())
}

/// Provider used when none is configured: never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProvider;

impl MetadataProvider for NoProvider {
    async fn search_by_name(
        &self,
        _name: &str,
        _category: Category,
    ) -> Result<Vec<Candidate>, ProviderError> {
        Ok(Vec::new())
    }

    async fn fetch_details(&self, candidate: &Candidate) -> Result<FetchedDetails, ProviderError> {
        Err(ProviderError::Other(format!(
            "no metadata provider configured for {}",
            candidate.reference
        )))
    }
}
