use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::catalog::build_product;
use crate::domain::interaction::Interaction;
use crate::domain::order::{OrderRecord, PopularityCounts};
use crate::domain::product::{CategoryRef, Product, ProductId, ProductRecord};
use crate::store::{RecommendationStore, StoreError};

pub(crate) fn record(
    id: &str,
    name: &str,
    category: &str,
    price: f64,
    rating: f64,
    stock: i64,
) -> ProductRecord {
    ProductRecord {
        id: id.to_string(),
        title: Some(name.to_string()),
        description: None,
        category: Some(CategoryRef::Named(category.to_string())),
        price: Some(price),
        variant_prices: Vec::new(),
        rating: Some(rating),
        image: None,
        stock,
    }
}

/// Un-normalized product; wrap in a `Catalog` to get scaled features.
pub(crate) fn product(
    id: &str,
    name: &str,
    category: &str,
    price: f64,
    rating: f64,
    stock: i64,
) -> Product {
    build_product(record(id, name, category, price, rating, stock), 0.0)
}

pub(crate) fn order(id: &str, user: &str, status: &str, products: &[&str]) -> OrderRecord {
    OrderRecord {
        id: id.to_string(),
        user_id: user.to_string(),
        status: status.to_string(),
        product_ids: products.iter().map(|id| ProductId::from(*id)).collect(),
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub products: RwLock<Vec<ProductRecord>>,
    pub popularity: HashMap<ProductId, PopularityCounts>,
    pub orders: Vec<OrderRecord>,
    pub interactions: RwLock<Vec<Interaction>>,
    pub fail_products: AtomicBool,
    pub fail_popularity: AtomicBool,
    pub product_loads: AtomicUsize,
    /// Delay applied to every product load, in milliseconds.
    pub product_delay_ms: AtomicU64,
}

impl FakeStore {
    pub fn with_products(products: Vec<ProductRecord>) -> Self {
        Self { products: RwLock::new(products), ..Self::default() }
    }

    pub fn product_loads(&self) -> usize {
        self.product_loads.load(Ordering::SeqCst)
    }

    fn unavailable(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecommendationStore for FakeStore {
    async fn active_products(&self) -> Result<Vec<ProductRecord>, StoreError> {
        self.product_loads.fetch_add(1, Ordering::SeqCst);
        let delay = self.product_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.unavailable(&self.fail_products)?;
        Ok(self.products.read().clone())
    }

    async fn popularity_counts(&self) -> Result<HashMap<ProductId, PopularityCounts>, StoreError> {
        self.unavailable(&self.fail_popularity)?;
        Ok(self.popularity.clone())
    }

    async fn qualifying_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(self.orders.iter().filter(|order| order.is_qualifying()).cloned().collect())
    }

    async fn interactions(&self) -> Result<Vec<Interaction>, StoreError> {
        Ok(self.interactions.read().clone())
    }

    async fn orders_for_user(&self, user_id: &str) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(self.orders.iter().filter(|order| order.user_id == user_id).cloned().collect())
    }

    async fn interactions_for_user(&self, user_id: &str) -> Result<Vec<Interaction>, StoreError> {
        Ok(self
            .interactions
            .read()
            .iter()
            .filter(|interaction| interaction.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn record_interaction(&self, interaction: &Interaction) -> Result<(), StoreError> {
        self.interactions.write().push(interaction.clone());
        Ok(())
    }

    async fn interaction_count(&self) -> Result<u64, StoreError> {
        Ok(self.interactions.read().len() as u64)
    }
}
