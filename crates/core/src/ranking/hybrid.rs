//! Weighted ensemble of the content, collaborative and latent-factor strategies.

use std::collections::HashMap;

use tracing::{debug, info};

use super::{
    descending, diversify, fallback_recommendations, Candidate, Method, StrategyContext,
    StrategyOutcome, HYBRID_WEIGHTS,
};
use crate::catalog::Catalog;
use crate::domain::product::ProductId;

/// Only the strongest `n * DIVERSITY_POOL_FACTOR` merged candidates are diversified.
const DIVERSITY_POOL_FACTOR: usize = 2;

/// Which strategy list a contribution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    Content,
    Collaborative,
    Latent,
}

/// Explicit per-source contributions of one merged candidate. Each field already
/// carries its weight and rank decay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceScores {
    pub content: f64,
    pub collaborative: f64,
    pub latent: f64,
    pub popularity_boost: f64,
}

impl SourceScores {
    pub fn combined(&self) -> f64 {
        self.content + self.collaborative + self.latent + self.popularity_boost
    }

    fn slot(&mut self, source: ScoreSource) -> &mut f64 {
        match source {
            ScoreSource::Content => &mut self.content,
            ScoreSource::Collaborative => &mut self.collaborative,
            ScoreSource::Latent => &mut self.latent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridCandidate {
    pub product_id: ProductId,
    pub scores: SourceScores,
    /// Reason from the first source that produced this product.
    pub reason: String,
}

/// Multiplier for the `position`-th entry (0-based) of a list of `length` entries.
pub fn rank_decay(position: usize, length: usize) -> f64 {
    if length == 0 {
        return 0.0;
    }
    1.0 - position as f64 / (2.0 * length as f64)
}

/// Weighted, rank-decayed contribution of one raw strategy score.
pub fn weighted_contribution(source: ScoreSource, raw: f64, position: usize, length: usize) -> f64 {
    let weights = HYBRID_WEIGHTS;
    let weighted = match source {
        ScoreSource::Content => raw * weights.content,
        ScoreSource::Collaborative => raw / weights.collaborative_scale * weights.collaborative,
        ScoreSource::Latent => raw * weights.latent,
    };
    weighted * rank_decay(position, length)
}

/// Merges the three strategy lists by product id and ranks by combined score.
/// Ties keep the order in which products first appeared across the sources.
pub fn merge_sources(
    catalog: &Catalog,
    content: &[Candidate],
    collaborative: &[Candidate],
    latent: &[Candidate],
) -> Vec<HybridCandidate> {
    let mut merged: Vec<HybridCandidate> = Vec::new();
    let mut positions: HashMap<ProductId, usize> = HashMap::new();

    let sources = [
        (ScoreSource::Content, content),
        (ScoreSource::Collaborative, collaborative),
        (ScoreSource::Latent, latent),
    ];
    for (source, candidates) in sources {
        for (position, candidate) in candidates.iter().enumerate() {
            let contribution =
                weighted_contribution(source, candidate.score, position, candidates.len());
            let slot = *positions.entry(candidate.product_id.clone()).or_insert_with(|| {
                merged.push(HybridCandidate {
                    product_id: candidate.product_id.clone(),
                    scores: SourceScores::default(),
                    reason: candidate.reason.clone(),
                });
                merged.len() - 1
            });
            *merged[slot].scores.slot(source) = contribution;
        }
    }

    for candidate in &mut merged {
        let popularity = catalog
            .get(candidate.product_id.as_str())
            .map(|product| product.normalized.popularity)
            .unwrap_or(0.0);
        candidate.scores.popularity_boost = HYBRID_WEIGHTS.popularity_boost * popularity;
    }

    merged.sort_by(|a, b| descending(a.scores.combined(), b.scores.combined()));
    merged
}

/// Ensemble recommendations. Falls back to the cold-start path when every source is empty.
pub fn hybrid_recommendations(
    context: &StrategyContext<'_>,
    product_id: &str,
    n: usize,
    category_filter: bool,
) -> StrategyOutcome {
    let wide = n.saturating_mul(2);
    let content = context.recommend(Method::Content, product_id, wide, category_filter);
    let collaborative = context.recommend(Method::Collaborative, product_id, wide, category_filter);
    let latent = context.recommend(Method::MatrixFactorization, product_id, n, category_filter);

    for (method, outcome) in [
        (Method::Content, &content),
        (Method::Collaborative, &collaborative),
        (Method::MatrixFactorization, &latent),
    ] {
        if let Some(reason) = outcome.empty_reason() {
            debug!(
                event_name = "recommender.hybrid.source_empty",
                product_id = %product_id,
                source = %method,
                reason = %reason.description(),
                "hybrid source contributed nothing"
            );
        }
    }

    if content.is_empty() && collaborative.is_empty() && latent.is_empty() {
        info!(
            event_name = "recommender.hybrid.fallback",
            product_id = %product_id,
            "no strategy produced candidates; using fallback"
        );
        return fallback_recommendations(context.catalog, product_id, n, category_filter);
    }

    let merged = merge_sources(
        context.catalog,
        content.candidates(),
        collaborative.candidates(),
        latent.candidates(),
    );
    let ranked = merged
        .into_iter()
        .map(|candidate| {
            Candidate::new(candidate.product_id, candidate.scores.combined(), candidate.reason)
        })
        .collect();

    StrategyOutcome::from_candidates(diversify_head(context.catalog, ranked, n))
}

fn diversify_head(catalog: &Catalog, mut ranked: Vec<Candidate>, n: usize) -> Vec<Candidate> {
    ranked.truncate(n.saturating_mul(DIVERSITY_POOL_FACTOR));
    diversify(catalog, ranked, n)
}
