//! Per-user recommendations from a category preference histogram.

use std::collections::{HashMap, HashSet};

use super::{
    top_n, Candidate, EmptyReason, StrategyOutcome, PERSONALIZATION_WEIGHTS,
    PERSONALIZED_TOP_CATEGORIES, REASON_PERSONALIZED,
};
use crate::catalog::Catalog;
use crate::domain::interaction::Interaction;
use crate::domain::order::OrderRecord;
use crate::domain::product::{Product, ProductId};

const PURCHASE_CATEGORY_WEIGHT: u32 = 2;
const INTERACTION_CATEGORY_WEIGHT: u32 = 1;

/// Everything known about one user: all orders regardless of status plus tracked events.
#[derive(Debug, Clone, Default)]
pub struct UserHistory {
    pub orders: Vec<OrderRecord>,
    pub interactions: Vec<Interaction>,
}

impl UserHistory {
    pub fn purchased(&self) -> HashSet<&ProductId> {
        self.orders.iter().flat_map(|order| order.product_ids.iter()).collect()
    }
}

/// Category weights in first-seen order, then sorted by weight with ties kept stable.
pub fn category_preferences(catalog: &Catalog, history: &UserHistory) -> Vec<(String, u32)> {
    let mut preferences: Vec<(String, u32)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut bump = |category: &str, weight: u32| {
        let position = *positions.entry(category.to_string()).or_insert_with(|| {
            preferences.push((category.to_string(), 0));
            preferences.len() - 1
        });
        preferences[position].1 += weight;
    };

    for product_id in history.orders.iter().flat_map(|order| order.product_ids.iter()) {
        if let Some(product) = catalog.get(product_id.as_str()) {
            bump(&product.category, PURCHASE_CATEGORY_WEIGHT);
        }
    }
    for interaction in &history.interactions {
        if let Some(product) = catalog.get(interaction.product_id.as_str()) {
            bump(&product.category, INTERACTION_CATEGORY_WEIGHT);
        }
    }

    preferences.sort_by(|a, b| b.1.cmp(&a.1));
    preferences
}

pub fn personalized_score(product: &Product) -> f64 {
    let weights = PERSONALIZATION_WEIGHTS;
    weights.rating * product.normalized.rating
        + weights.popularity * product.normalized.popularity
        + weights.affordability * (1.0 - product.normalized.price)
}

pub fn personalized_recommendations(
    catalog: &Catalog,
    history: &UserHistory,
    n: usize,
    category: Option<&str>,
) -> StrategyOutcome {
    let categories: Vec<String> = match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(category) => vec![category.to_lowercase()],
        None => category_preferences(catalog, history)
            .into_iter()
            .take(PERSONALIZED_TOP_CATEGORIES)
            .map(|(category, _)| category)
            .collect(),
    };
    if categories.is_empty() {
        return StrategyOutcome::Empty(EmptyReason::UnknownUser);
    }

    let purchased = history.purchased();
    let mut seen: HashSet<ProductId> = HashSet::new();
    let mut recommendations = Vec::new();

    for category in &categories {
        let candidates = catalog
            .iter()
            .filter(|product| {
                &product.category == category
                    && product.in_stock
                    && !purchased.contains(&product.id)
            })
            .map(|product| {
                Candidate::new(product.id.clone(), personalized_score(product), REASON_PERSONALIZED)
            })
            .collect();

        for candidate in top_n(candidates, n) {
            if seen.insert(candidate.product_id.clone()) {
                recommendations.push(candidate);
            }
        }
    }

    recommendations.truncate(n);
    StrategyOutcome::from_candidates(recommendations)
}
