use chrono::{DateTime, Utc};
use tracing::info;

use crate::affinity::AffinityMatrix;
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::content::{ContentModel, TfIdfConfig};
use crate::domain::interaction::Interaction;
use crate::domain::order::OrderRecord;
use crate::latent::{factorize, LatentModel};
use crate::ranking::{EmptyReason, StrategyContext};

/// One immutable engine generation. Rebuilt wholesale and published as a unit.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub generation: u64,
    pub catalog: Catalog,
    pub content: ContentModel,
    pub affinity: AffinityMatrix,
    pub latent: LatentModel,
    /// `None` until a product load has succeeded.
    pub last_updated: Option<DateTime<Utc>>,
}

impl EngineSnapshot {
    /// Generation zero: nothing loaded yet.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            catalog: Catalog::default(),
            content: ContentModel::empty(),
            affinity: AffinityMatrix::default(),
            latent: LatentModel::Unavailable(EmptyReason::InsufficientData),
            last_updated: None,
        }
    }

    pub fn build(
        generation: u64,
        catalog: Catalog,
        orders: &[OrderRecord],
        interactions: &[Interaction],
        config: &EngineConfig,
        loaded_at: DateTime<Utc>,
    ) -> Self {
        let content = ContentModel::build(
            &catalog,
            TfIdfConfig { max_features: config.max_vocabulary, ..TfIdfConfig::default() },
        );
        let affinity = AffinityMatrix::build(orders, interactions);
        let latent = factorize(&affinity, config.max_latent_factors);

        if let LatentModel::Unavailable(reason) = &latent {
            info!(
                event_name = "recommender.latent.unavailable",
                generation,
                reason = %reason.description(),
                "latent factors not available for this generation"
            );
        }

        Self {
            generation,
            catalog,
            content,
            affinity,
            latent,
            last_updated: Some(loaded_at),
        }
    }

    pub fn context(&self) -> StrategyContext<'_> {
        StrategyContext {
            catalog: &self.catalog,
            content: &self.content,
            affinity: &self.affinity,
            latent: &self.latent,
        }
    }

    /// `[users, products]`, or `None` when no interactions were aggregated.
    pub fn matrix_shape(&self) -> Option<[usize; 2]> {
        if self.affinity.is_empty() {
            return None;
        }
        let (users, products) = self.affinity.shape();
        Some([users, products])
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::EngineSnapshot;
    use crate::catalog::Catalog;
    use crate::config::EngineConfig;
    use crate::domain::interaction::{Interaction, InteractionAction};
    use crate::test_support::{order, product};

    #[test]
    fn empty_snapshot_has_never_loaded() {
        let snapshot = EngineSnapshot::empty();
        assert_eq!(snapshot.generation, 0);
        assert!(snapshot.catalog.is_empty());
        assert!(snapshot.last_updated.is_none());
        assert_eq!(snapshot.matrix_shape(), None);
    }

    #[test]
    fn build_derives_every_model_from_one_catalog() {
        let catalog = Catalog::new(vec![
            product("a", "Masala Chips", "snacks", 40.0, 4.2, 3),
            product("b", "Banana Chips", "snacks", 60.0, 4.0, 3),
            product("c", "Green Tea", "beverages", 150.0, 4.6, 3),
        ]);
        let orders = vec![order("o1", "u1", "delivered", &["a", "b"])];
        let interactions = vec![Interaction::new("u2", "c", InteractionAction::View)];

        let snapshot = EngineSnapshot::build(
            7,
            catalog,
            &orders,
            &interactions,
            &EngineConfig::default(),
            Utc::now(),
        );

        assert_eq!(snapshot.generation, 7);
        assert_eq!(snapshot.catalog.len(), 3);
        assert!(snapshot.content.vocabulary_size() > 0);
        assert_eq!(snapshot.matrix_shape(), Some([2, 3]));
        assert!(snapshot.last_updated.is_some());
    }
}
