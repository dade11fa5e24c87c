//! Cold-start path: category heuristics for known products, global popularity otherwise.

use tracing::warn;

use super::{top_n, Candidate, EmptyReason, StrategyOutcome, FALLBACK_WEIGHTS, REASON_DEFAULT};
use crate::catalog::Catalog;
use crate::domain::product::Product;

pub fn fallback_recommendations(
    catalog: &Catalog,
    product_id: &str,
    n: usize,
    category_filter: bool,
) -> StrategyOutcome {
    if catalog.is_empty() {
        return StrategyOutcome::Empty(EmptyReason::NoCandidates);
    }

    let Some(target) = catalog.get(product_id) else {
        return StrategyOutcome::from_candidates(trending(catalog, None, n));
    };

    if !category_filter {
        return StrategyOutcome::from_candidates(trending(catalog, Some(product_id), n));
    }

    let candidates: Vec<Candidate> = catalog
        .iter()
        .filter(|product| {
            product.category == target.category && product.id != target.id && product.in_stock
        })
        .map(|product| Candidate::new(product.id.clone(), fallback_score(target, product), REASON_DEFAULT))
        .collect();

    if candidates.is_empty() {
        warn!(
            event_name = "recommender.fallback.empty_category",
            product_id = %product_id,
            category = %target.category,
            "no fallback candidates in category"
        );
        return StrategyOutcome::Empty(EmptyReason::NoCandidates);
    }

    StrategyOutcome::Ranked(top_n(candidates, n))
}

pub fn fallback_score(target: &Product, candidate: &Product) -> f64 {
    let weights = FALLBACK_WEIGHTS;
    let price_similarity = 1.0 / (1.0 + (candidate.price - target.price).abs());
    let rating_similarity = 1.0 - (candidate.rating - target.rating).abs() / 5.0;

    weights.price_similarity * price_similarity
        + weights.rating_similarity * rating_similarity
        + weights.normalized_rating * candidate.normalized.rating
        + weights.normalized_popularity * candidate.normalized.popularity
}

/// In-stock products by raw popularity score, optionally excluding one id.
fn trending(catalog: &Catalog, exclude: Option<&str>, n: usize) -> Vec<Candidate> {
    let candidates = catalog
        .iter()
        .filter(|product| product.in_stock && Some(product.id.as_str()) != exclude)
        .map(|product| Candidate::new(product.id.clone(), product.popularity_score, REASON_DEFAULT))
        .collect();
    top_n(candidates, n)
}

#[cfg(test)]
mod tests {
    use super::{fallback_recommendations, fallback_score};
    use crate::catalog::Catalog;
    use crate::ranking::EmptyReason;
    use crate::test_support::product;

    fn catalog() -> Catalog {
        let mut popular = product("tea", "Green Tea", "beverages", 50.0, 4.0, 5);
        popular.popularity_score = 30.0;
        let mut sold_out = product("cola", "Kokum Cola", "beverages", 40.0, 4.0, 0);
        sold_out.popularity_score = 99.0;
        let mut pickle = product("pickle", "Mango Pickle", "pickles", 100.0, 4.5, 5);
        pickle.popularity_score = 10.0;
        Catalog::new(vec![
            pickle,
            product("lime", "Lime Pickle", "pickles", 110.0, 4.3, 5),
            popular,
            sold_out,
        ])
    }

    #[test]
    fn unknown_product_gets_global_trending_in_stock() {
        let outcome = fallback_recommendations(&catalog(), "new-product", 2, true);
        let ids: Vec<_> = outcome.candidates().iter().map(|c| c.product_id.as_str()).collect();
        assert_eq!(ids, vec!["tea", "pickle"]);
    }

    #[test]
    fn category_fallback_excludes_self_and_other_categories() {
        let outcome = fallback_recommendations(&catalog(), "pickle", 5, true);
        let ids: Vec<_> = outcome.candidates().iter().map(|c| c.product_id.as_str()).collect();
        assert_eq!(ids, vec!["lime"]);
    }

    #[test]
    fn unfiltered_fallback_is_trending_without_self() {
        let outcome = fallback_recommendations(&catalog(), "pickle", 5, false);
        let ids: Vec<_> = outcome.candidates().iter().map(|c| c.product_id.as_str()).collect();
        assert_eq!(ids, vec!["tea", "lime"]);
    }

    #[test]
    fn lone_product_in_category_yields_empty() {
        let outcome = fallback_recommendations(&catalog(), "tea", 5, true);
        assert_eq!(outcome.empty_reason(), Some(&EmptyReason::NoCandidates));
    }

    #[test]
    fn score_blends_closeness_and_quality() {
        let target = product("a", "Mango Pickle", "pickles", 100.0, 4.5, 5);
        let candidate = product("b", "Lime Pickle", "pickles", 100.0, 4.5, 5);
        // Identical price and rating, zero normalized features outside a catalog.
        assert!((fallback_score(&target, &candidate) - 0.4).abs() < 1e-12);
    }
}
