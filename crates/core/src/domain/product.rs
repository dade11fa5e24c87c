use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ProductId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Category as stored upstream: either a bare name or an embedded category document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Named(String),
    Nested {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
}

impl CategoryRef {
    /// Resolves the display name, preferring `name` over `title` for nested documents.
    pub fn resolve(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name.as_str()),
            Self::Nested { name, title } => name.as_deref().or(title.as_deref()),
        }
    }
}

/// Raw product row as returned by a [`crate::store::RecommendationStore`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<CategoryRef>,
    pub price: Option<f64>,
    pub variant_prices: Vec<f64>,
    pub rating: Option<f64>,
    pub image: Option<String>,
    pub stock: i64,
}

/// Min-max scaled product features, each in `[0, 1]` across one catalog generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct NormalizedFeatures {
    pub price: f64,
    pub rating: f64,
    pub popularity: f64,
}

/// A catalog entry after normalization. Immutable once a snapshot is published.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub rating: f64,
    pub description: String,
    pub image: Option<String>,
    pub main_ingredient: String,
    pub stock: i64,
    pub in_stock: bool,
    pub popularity_score: f64,
    pub content: String,
    pub normalized: NormalizedFeatures,
}

impl Product {
    pub fn price_bracket(&self) -> u8 {
        price_bracket(self.price)
    }
}

/// Coarse price band used by the diversity filter.
pub fn price_bracket(price: f64) -> u8 {
    if price < 100.0 {
        1
    } else if price < 200.0 {
        2
    } else if price < 300.0 {
        3
    } else if price < 500.0 {
        4
    } else {
        5
    }
}
