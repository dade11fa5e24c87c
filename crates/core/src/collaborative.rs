//! Item-based collaborative filtering over the affinity matrix.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::affinity::AffinityMatrix;
use crate::catalog::Catalog;
use crate::ranking::{top_n, Candidate, EmptyReason, StrategyOutcome, REASON_COLLABORATIVE};

/// Products co-liked with `product_id`, scored by affinity summed over every user who
/// liked the target. Unknown, out-of-stock and (optionally) off-category products are
/// removed before the top `n` are taken.
pub fn collaborative_recommendations(
    catalog: &Catalog,
    matrix: &AffinityMatrix,
    product_id: &str,
    n: usize,
    category_filter: bool,
) -> StrategyOutcome {
    let Some(target) = catalog.get(product_id) else {
        warn!(
            event_name = "recommender.collaborative.unknown_product",
            product_id = %product_id,
            "product not found for collaborative recommendations"
        );
        return StrategyOutcome::Empty(EmptyReason::UnknownProduct);
    };
    let Some(target_column) = matrix.column_of(product_id) else {
        debug!(
            event_name = "recommender.collaborative.no_interactions",
            product_id = %product_id,
            "product has no interactions"
        );
        return StrategyOutcome::Empty(EmptyReason::NoInteractions);
    };

    let mut summed: BTreeMap<usize, f64> = BTreeMap::new();
    let mut liked_by_anyone = false;
    for &(user_row, affinity) in matrix.column(target_column) {
        if affinity <= 0.0 {
            continue;
        }
        liked_by_anyone = true;
        for &(column, value) in matrix.row(user_row) {
            if column != target_column && value > 0.0 {
                *summed.entry(column).or_insert(0.0) += value;
            }
        }
    }
    if !liked_by_anyone {
        return StrategyOutcome::Empty(EmptyReason::NoInteractions);
    }

    let candidates = summed
        .into_iter()
        .filter_map(|(column, score)| {
            let product = catalog.get(matrix.product_at(column)?.as_str())?;
            let eligible =
                product.in_stock && (!category_filter || product.category == target.category);
            eligible.then(|| Candidate::new(product.id.clone(), score, REASON_COLLABORATIVE))
        })
        .collect();

    StrategyOutcome::from_candidates(top_n(candidates, n))
}
