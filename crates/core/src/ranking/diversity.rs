//! Post-ranking diversity filter over main ingredient and price bracket.

use std::collections::HashMap;

use super::{Candidate, MAX_PER_ATTRIBUTE};
use crate::catalog::{Catalog, FALLBACK_INGREDIENT};

/// Picks up to `n` candidates from a ranked list so that no main ingredient and no price
/// bracket appears more than [`MAX_PER_ATTRIBUTE`] times. Deferred candidates fill any
/// remaining slots in their original order. Lists no longer than `n` are returned as is.
pub fn diversify(catalog: &Catalog, ranked: Vec<Candidate>, n: usize) -> Vec<Candidate> {
    if ranked.len() <= n {
        return ranked;
    }

    let mut ingredient_counts: HashMap<&str, usize> = HashMap::new();
    let mut bracket_counts: HashMap<u8, usize> = HashMap::new();
    let mut accepted = Vec::with_capacity(n);
    let mut deferred = Vec::new();

    for candidate in ranked {
        if accepted.len() >= n {
            deferred.push(candidate);
            continue;
        }

        let (ingredient, bracket) = match catalog.get(candidate.product_id.as_str()) {
            Some(product) => (product.main_ingredient.as_str(), product.price_bracket()),
            None => (FALLBACK_INGREDIENT, 0),
        };
        let ingredient_seen = ingredient_counts.get(ingredient).copied().unwrap_or(0);
        let bracket_seen = bracket_counts.get(&bracket).copied().unwrap_or(0);

        if ingredient_seen < MAX_PER_ATTRIBUTE && bracket_seen < MAX_PER_ATTRIBUTE {
            *ingredient_counts.entry(ingredient).or_insert(0) += 1;
            *bracket_counts.entry(bracket).or_insert(0) += 1;
            accepted.push(candidate);
        } else {
            deferred.push(candidate);
        }
    }

    let needed = n.saturating_sub(accepted.len());
    accepted.extend(deferred.into_iter().take(needed));
    accepted
}
