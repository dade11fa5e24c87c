use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use recommender_core::domain::interaction::{Interaction, InteractionAction};
use recommender_core::domain::order::{OrderRecord, PopularityCounts};
use recommender_core::domain::product::{ProductId, ProductRecord};
use recommender_core::store::{RecommendationStore, StoreError};

use super::{CatalogWriter, RepositoryError};

#[derive(Default)]
struct MemoryState {
    products: Vec<(ProductRecord, bool)>,
    orders: Vec<OrderRecord>,
    interactions: Vec<Interaction>,
}

/// Process-local store for tests and demos. Insertion order is preserved.
#[derive(Default)]
pub struct InMemoryRecommendationStore {
    state: RwLock<MemoryState>,
}

impl InMemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn active_products(&self) -> Result<Vec<ProductRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.products.iter().filter(|(_, active)| *active).map(|(p, _)| p.clone()).collect())
    }

    async fn popularity_counts(&self) -> Result<HashMap<ProductId, PopularityCounts>, StoreError> {
        let state = self.state.read().await;
        let mut counts: HashMap<ProductId, PopularityCounts> = HashMap::new();

        for order in state.orders.iter().filter(|order| order.is_qualifying()) {
            let mut seen: Vec<&ProductId> = Vec::new();
            for product_id in &order.product_ids {
                if !seen.contains(&product_id) {
                    seen.push(product_id);
                    counts.entry(product_id.clone()).or_default().qualifying_orders += 1;
                }
            }
        }
        for interaction in &state.interactions {
            let entry = counts.entry(interaction.product_id.clone()).or_default();
            match interaction.action {
                InteractionAction::AddToCart => entry.cart_adds += 1,
                InteractionAction::View => entry.views += 1,
                InteractionAction::AddToWishlist | InteractionAction::Purchase => {}
            }
        }

        Ok(counts)
    }

    async fn qualifying_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.orders.iter().filter(|order| order.is_qualifying()).cloned().collect())
    }

    async fn interactions(&self) -> Result<Vec<Interaction>, StoreError> {
        Ok(self.state.read().await.interactions.clone())
    }

    async fn orders_for_user(&self, user_id: &str) -> Result<Vec<OrderRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.orders.iter().filter(|order| order.user_id == user_id).cloned().collect())
    }

    async fn interactions_for_user(&self, user_id: &str) -> Result<Vec<Interaction>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .interactions
            .iter()
            .filter(|interaction| interaction.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn record_interaction(&self, interaction: &Interaction) -> Result<(), StoreError> {
        self.state.write().await.interactions.push(interaction.clone());
        Ok(())
    }

    async fn interaction_count(&self) -> Result<u64, StoreError> {
        Ok(self.state.read().await.interactions.len() as u64)
    }
}

#[async_trait]
impl CatalogWriter for InMemoryRecommendationStore {
    async fn save_product(
        &self,
        product: &ProductRecord,
        active: bool,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        match state.products.iter_mut().find(|(existing, _)| existing.id == product.id) {
            Some(slot) => *slot = (product.clone(), active),
            None => state.products.push((product.clone(), active)),
        }
        Ok(())
    }

    async fn save_order(&self, order: &OrderRecord) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        match state.orders.iter_mut().find(|existing| existing.id == order.id) {
            Some(slot) => *slot = order.clone(),
            None => state.orders.push(order.clone()),
        }
        Ok(())
    }
}
