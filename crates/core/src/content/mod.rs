//! Content similarity: TF-IDF over each product's text blob, blended with price,
//! rating, popularity and ingredient closeness.

mod stopwords;
pub mod tfidf;

use ndarray::Array2;
use tracing::warn;

pub use tfidf::{tokenize, TermMatrix, TfIdfConfig, TfIdfVectorizer};

use crate::catalog::Catalog;
use crate::domain::product::Product;
use crate::ranking::{
    top_n, Candidate, EmptyReason, StrategyOutcome, CONTENT_WEIGHTS, INGREDIENT_MATCH_SCORE,
    INGREDIENT_MISMATCH_SCORE, REASON_DEFAULT,
};

/// Pairwise content similarity for one catalog generation, indexed by catalog position.
#[derive(Debug, Clone)]
pub struct ContentModel {
    similarity: Array2<f64>,
    vocabulary_size: usize,
}

impl ContentModel {
    pub fn build(catalog: &Catalog, config: TfIdfConfig) -> Self {
        let documents: Vec<&str> = catalog.iter().map(|product| product.content.as_str()).collect();
        let matrix = TfIdfVectorizer::new(config).fit_transform(&documents);
        Self { similarity: matrix.cosine_similarity(), vocabulary_size: matrix.vocabulary.len() }
    }

    pub fn empty() -> Self {
        Self { similarity: Array2::zeros((0, 0)), vocabulary_size: 0 }
    }

    pub fn similarity(&self, left: usize, right: usize) -> f64 {
        self.similarity.get((left, right)).copied().unwrap_or(0.0)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }
}

pub fn content_based_recommendations(
    catalog: &Catalog,
    model: &ContentModel,
    product_id: &str,
    n: usize,
    category_filter: bool,
) -> StrategyOutcome {
    let Some(target_position) = catalog.position(product_id) else {
        warn!(
            event_name = "recommender.content.unknown_product",
            product_id = %product_id,
            "product not found for content recommendations"
        );
        return StrategyOutcome::Empty(EmptyReason::UnknownProduct);
    };
    let target = &catalog.products()[target_position];
    let weights = CONTENT_WEIGHTS;

    let candidates = catalog
        .iter()
        .enumerate()
        .filter(|(position, product)| {
            *position != target_position
                && product.in_stock
                && (!category_filter || product.category == target.category)
        })
        .map(|(position, product)| {
            let ingredient = if product.main_ingredient == target.main_ingredient {
                INGREDIENT_MATCH_SCORE
            } else {
                INGREDIENT_MISMATCH_SCORE
            };
            let score = weights.similarity * model.similarity(target_position, position)
                + weights.price * (1.0 - (target.normalized.price - product.normalized.price).abs())
                + weights.rating
                    * (1.0 - (target.normalized.rating - product.normalized.rating).abs())
                + weights.popularity * product.normalized.popularity
                + weights.ingredient * ingredient;
            Candidate::new(product.id.clone(), score, content_reason(target, product))
        })
        .collect();

    StrategyOutcome::from_candidates(top_n(candidates, n))
}

/// Human-readable explanation of why `candidate` resembles `target`.
pub fn content_reason(target: &Product, candidate: &Product) -> String {
    let mut reasons = Vec::new();

    if candidate.main_ingredient == target.main_ingredient {
        reasons.push(format!("Same ingredient ({})", candidate.main_ingredient));
    }
    if target.price > 0.0 && (target.price - candidate.price).abs() / target.price < 0.2 {
        reasons.push("Similar price".to_string());
    }
    if (target.rating - candidate.rating).abs() < 0.5 {
        reasons.push("Similar rating".to_string());
    }
    if candidate.popularity_score > 10.0 {
        reasons.push("Popular choice".to_string());
    }

    if reasons.is_empty() {
        REASON_DEFAULT.to_string()
    } else {
        reasons.join(", ")
    }
}
