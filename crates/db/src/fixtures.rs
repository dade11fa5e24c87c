use std::collections::HashSet;

use recommender_core::domain::interaction::{Interaction, InteractionAction};
use recommender_core::domain::order::OrderRecord;
use recommender_core::domain::product::{CategoryRef, ProductId, ProductRecord};
use recommender_core::store::RecommendationStore;
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::{CatalogWriter, RepositoryError};

#[derive(Debug, Clone, Copy)]
struct SeedProduct {
    id: &'static str,
    title: &'static str,
    category: SeedCategory,
    description: &'static str,
    price: f64,
    variant_prices: &'static [f64],
    rating: Option<f64>,
    stock: i64,
    active: bool,
}

#[derive(Debug, Clone, Copy)]
enum SeedCategory {
    Plain(&'static str),
    Named(&'static str),
    Titled(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct SeedOrder {
    id: &'static str,
    user_id: &'static str,
    status: &'static str,
    product_ids: &'static [&'static str],
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        id: "demo-banana-chips",
        title: "Kerala Banana Chips",
        category: SeedCategory::Plain("Snacks"),
        description: "Thin banana chips fried in coconut oil",
        price: 120.0,
        variant_prices: &[99.0, 180.0],
        rating: Some(4.5),
        stock: 40,
        active: true,
    },
    SeedProduct {
        id: "demo-masala-peanuts",
        title: "Masala Peanuts",
        category: SeedCategory::Plain("Snacks"),
        description: "Gram flour coated peanuts with red chili",
        price: 90.0,
        variant_prices: &[],
        rating: Some(4.3),
        stock: 25,
        active: true,
    },
    SeedProduct {
        id: "demo-madras-mixture",
        title: "Madras Mixture",
        category: SeedCategory::Plain("Snacks"),
        description: "Savoury namkeen mixture with curry leaves",
        price: 110.0,
        variant_prices: &[],
        rating: Some(4.1),
        stock: 30,
        active: true,
    },
    SeedProduct {
        id: "demo-garam-masala",
        title: "Garam Masala",
        category: SeedCategory::Named("Spices"),
        description: "Aromatic blend of clove, cinnamon and cardamom",
        price: 150.0,
        variant_prices: &[],
        rating: Some(4.7),
        stock: 50,
        active: true,
    },
    SeedProduct {
        id: "demo-turmeric",
        title: "Turmeric Powder",
        category: SeedCategory::Plain("Spices"),
        description: "Stone ground single origin turmeric",
        price: 80.0,
        variant_prices: &[],
        rating: Some(4.4),
        stock: 60,
        active: true,
    },
    SeedProduct {
        id: "demo-kashmiri-chili",
        title: "Kashmiri Chili Powder",
        category: SeedCategory::Plain("Spices"),
        description: "Bright red, mildly hot chili",
        price: 140.0,
        variant_prices: &[],
        rating: Some(4.2),
        stock: 0,
        active: true,
    },
    SeedProduct {
        id: "demo-masala-tea",
        title: "Masala Tea",
        category: SeedCategory::Plain("Beverages"),
        description: "Assam tea with ginger and cardamom",
        price: 220.0,
        variant_prices: &[],
        rating: Some(4.6),
        stock: 35,
        active: true,
    },
    SeedProduct {
        id: "demo-filter-coffee",
        title: "Filter Coffee",
        category: SeedCategory::Plain("Beverages"),
        description: "Chicory blended south Indian coffee",
        price: 260.0,
        variant_prices: &[],
        rating: None,
        stock: 20,
        active: true,
    },
    SeedProduct {
        id: "demo-roasted-cashews",
        title: "Roasted Cashews",
        category: SeedCategory::Titled("Dry Fruits"),
        description: "Whole W240 cashews, lightly salted",
        price: 650.0,
        variant_prices: &[450.0, 650.0],
        rating: Some(4.8),
        stock: 15,
        active: true,
    },
    SeedProduct {
        id: "demo-medjool-dates",
        title: "Medjool Dates",
        category: SeedCategory::Plain("Dry Fruits"),
        description: "Soft premium dates",
        price: 520.0,
        variant_prices: &[],
        rating: Some(4.4),
        stock: 12,
        active: true,
    },
    SeedProduct {
        id: "demo-jaggery-cookies",
        title: "Jaggery Cookies",
        category: SeedCategory::Plain("Sweets"),
        description: "Whole wheat cookies sweetened with jaggery",
        price: 160.0,
        variant_prices: &[],
        rating: Some(4.0),
        stock: 18,
        active: true,
    },
    SeedProduct {
        id: "demo-coconut-oil",
        title: "Cold Pressed Coconut Oil",
        category: SeedCategory::Plain("Oils"),
        description: "Wood pressed virgin coconut oil",
        price: 340.0,
        variant_prices: &[],
        rating: Some(4.6),
        stock: 22,
        active: true,
    },
    SeedProduct {
        id: "demo-discontinued-halwa",
        title: "Carrot Halwa Mix",
        category: SeedCategory::Plain("Sweets"),
        description: "No longer sold",
        price: 200.0,
        variant_prices: &[],
        rating: Some(3.9),
        stock: 5,
        active: false,
    },
];

const SEED_ORDERS: &[SeedOrder] = &[
    SeedOrder {
        id: "demo-order-1001",
        user_id: "demo-asha",
        status: "delivered",
        product_ids: &["demo-banana-chips", "demo-masala-peanuts", "demo-masala-tea"],
    },
    SeedOrder {
        id: "demo-order-1002",
        user_id: "demo-asha",
        status: "confirmed",
        product_ids: &["demo-garam-masala", "demo-turmeric"],
    },
    SeedOrder {
        id: "demo-order-1003",
        user_id: "demo-ravi",
        status: "processing",
        product_ids: &["demo-banana-chips", "demo-madras-mixture", "demo-filter-coffee"],
    },
    SeedOrder {
        id: "demo-order-1004",
        user_id: "demo-ravi",
        status: "delivered",
        product_ids: &["demo-roasted-cashews", "demo-medjool-dates"],
    },
    SeedOrder {
        id: "demo-order-1005",
        user_id: "demo-meera",
        status: "delivered",
        product_ids: &["demo-masala-peanuts", "demo-madras-mixture", "demo-jaggery-cookies"],
    },
    SeedOrder {
        id: "demo-order-1006",
        user_id: "demo-meera",
        status: "cancelled",
        product_ids: &["demo-coconut-oil"],
    },
    SeedOrder {
        id: "demo-order-1007",
        user_id: "demo-kiran",
        status: "pending",
        product_ids: &["demo-masala-tea"],
    },
];

const SEED_INTERACTIONS: &[(&str, &str, InteractionAction)] = &[
    ("demo-kiran", "demo-banana-chips", InteractionAction::View),
    ("demo-kiran", "demo-masala-peanuts", InteractionAction::View),
    ("demo-kiran", "demo-banana-chips", InteractionAction::AddToCart),
    ("demo-kiran", "demo-roasted-cashews", InteractionAction::AddToWishlist),
    ("demo-asha", "demo-roasted-cashews", InteractionAction::View),
    ("demo-asha", "demo-medjool-dates", InteractionAction::AddToCart),
    ("demo-ravi", "demo-garam-masala", InteractionAction::View),
    ("demo-meera", "demo-masala-tea", InteractionAction::Purchase),
];

const SEED_USERS: &[&str] = &["demo-asha", "demo-ravi", "demo-meera", "demo-kiran"];

/// Deterministic demo catalog: a small grocery shop with orders across several
/// statuses and a handful of tracked events.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub fn active_product_count() -> usize {
        SEED_PRODUCTS.iter().filter(|product| product.active).count()
    }

    pub fn qualifying_order_count() -> usize {
        SEED_ORDERS
            .iter()
            .filter(|order| {
                recommender_core::domain::order::is_qualifying_status(order.status)
            })
            .count()
    }

    pub fn products() -> Vec<(ProductRecord, bool)> {
        SEED_PRODUCTS.iter().map(|seed| (seed.to_record(), seed.active)).collect()
    }

    pub fn orders() -> Vec<OrderRecord> {
        SEED_ORDERS.iter().map(SeedOrder::to_record).collect()
    }

    /// Writes the dataset. Re-running is safe: products and orders upsert, and tracked
    /// events already present for a seed user are not duplicated.
    pub async fn load<S>(store: &S) -> Result<SeedResult, RepositoryError>
    where
        S: CatalogWriter + RecommendationStore,
    {
        for (product, active) in Self::products() {
            store.save_product(&product, active).await?;
        }
        for order in Self::orders() {
            store.save_order(&order).await?;
        }

        let mut interactions_seeded = 0;
        for user_id in SEED_USERS {
            let existing: HashSet<(String, InteractionAction)> = store
                .interactions_for_user(user_id)
                .await?
                .into_iter()
                .map(|interaction| (interaction.product_id.0, interaction.action))
                .collect();

            for (_, product_id, action) in
                SEED_INTERACTIONS.iter().filter(|(user, _, _)| user == user_id)
            {
                if existing.contains(&(product_id.to_string(), *action)) {
                    continue;
                }
                store
                    .record_interaction(&Interaction::new(*user_id, *product_id, *action))
                    .await?;
                interactions_seeded += 1;
            }
        }

        info!(
            event_name = "recommender.db.seeded",
            products = SEED_PRODUCTS.len(),
            orders = SEED_ORDERS.len(),
            interactions = interactions_seeded,
            "demo dataset loaded"
        );
        Ok(SeedResult {
            products_seeded: SEED_PRODUCTS.len(),
            orders_seeded: SEED_ORDERS.len(),
            interactions_seeded,
        })
    }

    /// Checks that the store exposes the seeded catalog the way the engine will read it.
    pub async fn verify<S>(store: &S) -> Result<VerificationResult, RepositoryError>
    where
        S: RecommendationStore + ?Sized,
    {
        let mut checks = Vec::new();

        let active: HashSet<String> = store
            .active_products()
            .await?
            .into_iter()
            .map(|product| product.id)
            .collect();
        for seed in SEED_PRODUCTS {
            checks.push((seed.id, active.contains(seed.id) == seed.active));
        }

        let qualifying: HashSet<String> = store
            .qualifying_orders()
            .await?
            .into_iter()
            .map(|order| order.id)
            .collect();
        for seed in SEED_ORDERS {
            let expected = recommender_core::domain::order::is_qualifying_status(seed.status);
            checks.push((seed.id, qualifying.contains(seed.id) == expected));
        }

        let interaction_count = store
            .interaction_count()
            .await?;
        checks.push(("interactions", interaction_count >= SEED_INTERACTIONS.len() as u64));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes seeded rows from a SQL database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let product_ids: Vec<&str> = SEED_PRODUCTS.iter().map(|product| product.id).collect();
        let order_ids: Vec<&str> = SEED_ORDERS.iter().map(|order| order.id).collect();
        let quoted_products = sql_array_from_ids(&product_ids);
        let quoted_orders = sql_array_from_ids(&order_ids);
        let quoted_users = sql_array_from_ids(SEED_USERS);

        let mut tx = pool.begin().await?;
        sqlx::query(&format!("DELETE FROM user_interaction WHERE user_id IN {quoted_users}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM order_item WHERE order_id IN {quoted_orders}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM customer_order WHERE id IN {quoted_orders}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM product_variant WHERE product_id IN {quoted_products}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM product WHERE id IN {quoted_products}"))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

impl SeedProduct {
    fn to_record(&self) -> ProductRecord {
        let category = match self.category {
            SeedCategory::Plain(name) => CategoryRef::Named(name.to_string()),
            SeedCategory::Named(name) => {
                CategoryRef::Nested { name: Some(name.to_string()), title: None }
            }
            SeedCategory::Titled(title) => {
                CategoryRef::Nested { name: None, title: Some(title.to_string()) }
            }
        };

        ProductRecord {
            id: self.id.to_string(),
            title: Some(self.title.to_string()),
            description: Some(self.description.to_string()),
            category: Some(category),
            price: Some(self.price),
            variant_prices: self.variant_prices.to_vec(),
            rating: self.rating,
            image: Some(format!("/images/products/{}.jpg", self.id)),
            stock: self.stock,
        }
    }
}

impl SeedOrder {
    fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id.to_string(),
            user_id: self.user_id.to_string(),
            status: self.status.to_string(),
            product_ids: self.product_ids.iter().map(|id| ProductId::from(*id)).collect(),
        }
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub orders_seeded: usize,
    pub interactions_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use recommender_core::store::RecommendationStore;

    use super::DemoSeedDataset;
    use crate::repositories::{InMemoryRecommendationStore, SqlRecommendationStore};
    use crate::{connect_with_settings, migrations};

    #[test]
    fn dataset_contract_is_consistent() {
        assert_eq!(DemoSeedDataset::active_product_count(), 12);
        assert_eq!(DemoSeedDataset::qualifying_order_count(), 5);
        let products = DemoSeedDataset::products();
        for order in DemoSeedDataset::orders() {
            for id in &order.product_ids {
                assert!(
                    products.iter().any(|(product, _)| &product.id == id.as_str()),
                    "order {} references unknown product {id}",
                    order.id
                );
            }
        }
    }

    #[tokio::test]
    async fn load_verify_and_clean_against_sqlite() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let store = SqlRecommendationStore::new(pool.clone());

        let seeded = DemoSeedDataset::load(&store).await.expect("load");
        assert_eq!(seeded.products_seeded, 13);
        assert_eq!(seeded.interactions_seeded, 8);

        let verification = DemoSeedDataset::verify(&store).await.expect("verify");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);

        let reseeded = DemoSeedDataset::load(&store).await.expect("reload");
        assert_eq!(reseeded.interactions_seeded, 0);
        assert_eq!(store.interaction_count().await.expect("count"), 8);

        DemoSeedDataset::clean(&pool).await.expect("clean");
        assert!(store.active_products().await.expect("products").is_empty());
        assert_eq!(store.interaction_count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn load_into_memory_store() {
        let store = InMemoryRecommendationStore::new();
        DemoSeedDataset::load(&store).await.expect("load");

        let verification = DemoSeedDataset::verify(&store).await.expect("verify");
        assert!(verification.all_present);
        assert_eq!(store.active_products().await.expect("products").len(), 12);
    }
}
