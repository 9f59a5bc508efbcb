//! Catalog data model: beers and result pages.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable catalog identity of a beer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One catalog entry.
///
/// Equality and hashing look at `id` only: two fetches of the same beer
/// with drifted display fields are still the same row.
#[derive(Debug, Clone)]
pub struct Beer {
    pub id: ItemId,
    pub name: String,
    /// Short display name of the first brewery, if the catalog knows one.
    pub brewery: Option<String>,
    pub abv: Option<f64>,
}

impl Beer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ItemId(id.into()),
            name: name.into(),
            brewery: None,
            abv: None,
        }
    }

    pub fn with_brewery(mut self, brewery: impl Into<String>) -> Self {
        self.brewery = Some(brewery.into());
        self
    }

    pub fn with_abv(mut self, abv: f64) -> Self {
        self.abv = Some(abv);
        self
    }

    pub fn brewery_label(&self) -> &str {
        self.brewery.as_deref().unwrap_or("(unknown)")
    }

    /// `"5.5%"`, or `None` when the catalog has no ABV (column is hidden).
    pub fn abv_label(&self) -> Option<String> {
        self.abv.map(|abv| format!("{abv}%"))
    }
}

impl PartialEq for Beer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Beer {}

impl Hash for Beer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Result of a single page fetch.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Beer>,
    /// Items available across all pages as of this fetch.
    pub total_count: usize,
    /// Server-reported page number (informational).
    pub page_number: Option<u32>,
    /// Server-reported number of pages (informational).
    pub page_count: Option<u32>,
}

impl Page {
    pub fn new(items: Vec<Beer>, total_count: usize) -> Self {
        Self {
            items,
            total_count,
            page_number: None,
            page_count: None,
        }
    }
}
