//! Read-mostly collaborator that owns durable products, orders and interactions.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::interaction::Interaction;
use crate::domain::order::{OrderRecord, PopularityCounts};
use crate::domain::product::{ProductId, ProductRecord};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store returned undecodable data: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Products flagged active, in the store's natural order.
    async fn active_products(&self) -> Result<Vec<ProductRecord>, StoreError>;

    /// Per-product order/cart/view counts feeding the popularity score.
    async fn popularity_counts(&self) -> Result<HashMap<ProductId, PopularityCounts>, StoreError>;

    /// Orders in a delivered, processing or confirmed state.
    async fn qualifying_orders(&self) -> Result<Vec<OrderRecord>, StoreError>;

    async fn interactions(&self) -> Result<Vec<Interaction>, StoreError>;

    /// Every order placed by the user regardless of status.
    async fn orders_for_user(&self, user_id: &str) -> Result<Vec<OrderRecord>, StoreError>;

    async fn interactions_for_user(&self, user_id: &str) -> Result<Vec<Interaction>, StoreError>;

    async fn record_interaction(&self, interaction: &Interaction) -> Result<(), StoreError>;

    async fn interaction_count(&self) -> Result<u64, StoreError>;
}
