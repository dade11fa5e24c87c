//! Recommendation strategies and the ensemble that combines them.
//!
//! Every strategy answers with a [`StrategyOutcome`]: either a ranked candidate list or
//! the reason it had nothing to offer, so the hybrid ranker and tests can tell an
//! unknown product apart from a matrix too small to factorize.

pub mod diversity;
pub mod fallback;
pub mod hybrid;
pub mod personalization;

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::affinity::AffinityMatrix;
use crate::catalog::Catalog;
use crate::collaborative::collaborative_recommendations;
use crate::content::{content_based_recommendations, ContentModel};
use crate::domain::product::ProductId;
use crate::latent::{latent_factor_recommendations, LatentModel};

pub use diversity::diversify;
pub use fallback::fallback_recommendations;
pub use hybrid::{hybrid_recommendations, merge_sources, HybridCandidate, SourceScores};
pub use personalization::personalized_recommendations;

/// Weights of the content-based score components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentWeights {
    pub similarity: f64,
    pub price: f64,
    pub rating: f64,
    pub popularity: f64,
    pub ingredient: f64,
}

/// Weights of the hybrid ensemble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    pub content: f64,
    pub collaborative: f64,
    pub latent: f64,
    pub popularity_boost: f64,
    /// Summed collaborative affinity is divided by this before weighting.
    pub collaborative_scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackWeights {
    pub price_similarity: f64,
    pub rating_similarity: f64,
    pub normalized_rating: f64,
    pub normalized_popularity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonalizationWeights {
    pub rating: f64,
    pub popularity: f64,
    pub affordability: f64,
}

/// Affinity contributed per event kind; order lines count like purchases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionWeights {
    pub purchase: f64,
    pub add_to_cart: f64,
    pub add_to_wishlist: f64,
    pub view: f64,
    pub order_item: f64,
}

pub const CONTENT_WEIGHTS: ContentWeights =
    ContentWeights { similarity: 0.40, price: 0.20, rating: 0.15, popularity: 0.15, ingredient: 0.10 };

pub const HYBRID_WEIGHTS: HybridWeights = HybridWeights {
    content: 0.40,
    collaborative: 0.35,
    latent: 0.25,
    popularity_boost: 0.10,
    collaborative_scale: 10.0,
};

pub const FALLBACK_WEIGHTS: FallbackWeights = FallbackWeights {
    price_similarity: 0.2,
    rating_similarity: 0.2,
    normalized_rating: 0.3,
    normalized_popularity: 0.3,
};

pub const PERSONALIZATION_WEIGHTS: PersonalizationWeights =
    PersonalizationWeights { rating: 0.4, popularity: 0.4, affordability: 0.2 };

pub const ACTION_WEIGHTS: ActionWeights = ActionWeights {
    purchase: 5.0,
    add_to_cart: 3.0,
    add_to_wishlist: 2.0,
    view: 1.0,
    order_item: 5.0,
};

/// Ingredient component of the content score.
pub const INGREDIENT_MATCH_SCORE: f64 = 1.0;
pub const INGREDIENT_MISMATCH_SCORE: f64 = 0.5;

/// Diversity cap per main ingredient and per price bracket.
pub const MAX_PER_ATTRIBUTE: usize = 2;

/// Categories a personalized request draws from when none is given.
pub const PERSONALIZED_TOP_CATEGORIES: usize = 3;

pub const REASON_DEFAULT: &str = "Recommended for you";
pub const REASON_COLLABORATIVE: &str = "Customers who liked this also liked";
pub const REASON_LATENT: &str = "AI-powered recommendation (latent factors)";
pub const REASON_PERSONALIZED: &str = "Based on your interests";

/// Which strategy answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Content,
    Collaborative,
    MatrixFactorization,
    Hybrid,
}

impl Method {
    /// Lenient parse: anything unrecognised selects the hybrid ensemble.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "content" => Self::Content,
            "collaborative" => Self::Collaborative,
            "matrix_factorization" | "mf" => Self::MatrixFactorization,
            _ => Self::Hybrid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Collaborative => "collaborative",
            Self::MatrixFactorization => "matrix_factorization",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked product. `score` lives in the producing strategy's own scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub product_id: ProductId,
    pub score: f64,
    pub reason: String,
}

impl Candidate {
    pub fn new(product_id: ProductId, score: f64, reason: impl Into<String>) -> Self {
        Self { product_id, score, reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    UnknownProduct,
    UnknownUser,
    NoInteractions,
    InsufficientData,
    NoCandidates,
    NumericalFailure(String),
}

impl EmptyReason {
    pub fn description(&self) -> String {
        match self {
            Self::UnknownProduct => "product is not in the catalog".to_string(),
            Self::UnknownUser => "user has no history and no category was requested".to_string(),
            Self::NoInteractions => "product has no recorded interactions".to_string(),
            Self::InsufficientData => "not enough interaction data for this strategy".to_string(),
            Self::NoCandidates => "no eligible candidates".to_string(),
            Self::NumericalFailure(detail) => format!("numerical failure: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    Ranked(Vec<Candidate>),
    Empty(EmptyReason),
}

impl StrategyOutcome {
    /// Wraps a candidate list, reporting `NoCandidates` when it is empty.
    pub fn from_candidates(candidates: Vec<Candidate>) -> Self {
        if candidates.is_empty() {
            Self::Empty(EmptyReason::NoCandidates)
        } else {
            Self::Ranked(candidates)
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Ranked(candidates) => candidates,
            Self::Empty(_) => &[],
        }
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        match self {
            Self::Ranked(candidates) => candidates,
            Self::Empty(_) => Vec::new(),
        }
    }

    pub fn empty_reason(&self) -> Option<&EmptyReason> {
        match self {
            Self::Ranked(_) => None,
            Self::Empty(reason) => Some(reason),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates().is_empty()
    }
}

/// Read-only view over one engine generation that every strategy scores against.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub catalog: &'a Catalog,
    pub content: &'a ContentModel,
    pub affinity: &'a AffinityMatrix,
    pub latent: &'a LatentModel,
}

impl StrategyContext<'_> {
    pub fn recommend(
        &self,
        method: Method,
        product_id: &str,
        n: usize,
        category_filter: bool,
    ) -> StrategyOutcome {
        match method {
            Method::Content => content_based_recommendations(
                self.catalog,
                self.content,
                product_id,
                n,
                category_filter,
            ),
            Method::Collaborative => collaborative_recommendations(
                self.catalog,
                self.affinity,
                product_id,
                n,
                category_filter,
            ),
            Method::MatrixFactorization => latent_factor_recommendations(
                self.catalog,
                self.affinity,
                self.latent,
                product_id,
                n,
                category_filter,
            ),
            Method::Hybrid => hybrid_recommendations(self, product_id, n, category_filter),
        }
    }
}

/// Stable descending sort by score, then truncation. Equal scores keep input order.
pub fn top_n(mut candidates: Vec<Candidate>, n: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| descending(a.score, b.score));
    candidates.truncate(n);
    candidates
}

pub(crate) fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
