use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

use recommender_core::domain::interaction::{Interaction, InteractionAction};
use recommender_core::domain::order::{OrderRecord, PopularityCounts};
use recommender_core::domain::product::{CategoryRef, ProductId, ProductRecord};
use recommender_core::store::{RecommendationStore, StoreError};

use super::{CatalogWriter, RepositoryError};
use crate::DbPool;

const ORDER_LINE_COLUMNS: &str = "SELECT o.id, o.user_id, o.status, oi.product_id
     FROM customer_order o
     LEFT JOIN order_item oi ON oi.order_id = o.id";

const INTERACTION_COLUMNS: &str =
    "SELECT user_id, product_id, action, metadata_json, created_at FROM user_interaction";

pub struct SqlRecommendationStore {
    pool: DbPool,
}

impl SqlRecommendationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn load_products(&self) -> Result<Vec<ProductRecord>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT id, title, description, category, price, rating, image, stock
             FROM product
             WHERE is_active = 1
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut variant_prices = self.load_variant_prices().await?;
        rows.iter()
            .map(|row| {
                let mut record = row_to_product(row)?;
                record.variant_prices = variant_prices.remove(&record.id).unwrap_or_default();
                Ok(record)
            })
            .collect()
    }

    async fn load_variant_prices(&self) -> Result<HashMap<String, Vec<f64>>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT v.product_id, v.price
             FROM product_variant v
             JOIN product p ON p.id = v.product_id
             WHERE p.is_active = 1 AND v.price IS NOT NULL
             ORDER BY v.product_id, v.rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut prices: HashMap<String, Vec<f64>> = HashMap::new();
        for row in &rows {
            let product_id: String =
                row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let price: f64 =
                row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            prices.entry(product_id).or_default().push(price);
        }
        Ok(prices)
    }

    async fn load_popularity(
        &self,
    ) -> Result<HashMap<ProductId, PopularityCounts>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT p.id AS product_id,
                    (SELECT COUNT(DISTINCT oi.order_id)
                       FROM order_item oi
                       JOIN customer_order o ON o.id = oi.order_id
                      WHERE oi.product_id = p.id
                        AND LOWER(o.status) IN ('delivered', 'processing', 'confirmed'))
                        AS qualifying_orders,
                    (SELECT COUNT(*) FROM user_interaction ui
                      WHERE ui.product_id = p.id AND ui.action = 'add_to_cart') AS cart_adds,
                    (SELECT COUNT(*) FROM user_interaction ui
                      WHERE ui.product_id = p.id AND ui.action = 'view') AS views
             FROM product p
             WHERE p.is_active = 1",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let product_id: String = row
                    .try_get("product_id")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let qualifying_orders: i64 = row
                    .try_get("qualifying_orders")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let cart_adds: i64 =
                    row.try_get("cart_adds").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let views: i64 =
                    row.try_get("views").map_err(|e| RepositoryError::Decode(e.to_string()))?;

                Ok((
                    ProductId(product_id),
                    PopularityCounts {
                        qualifying_orders: non_negative(qualifying_orders),
                        cart_adds: non_negative(cart_adds),
                        views: non_negative(views),
                    },
                ))
            })
            .collect()
    }

    async fn load_qualifying_orders(&self) -> Result<Vec<OrderRecord>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(&format!(
            "{ORDER_LINE_COLUMNS}
             WHERE LOWER(o.status) IN ('delivered', 'processing', 'confirmed')
             ORDER BY o.rowid, oi.line_no"
        ))
        .fetch_all(&self.pool)
        .await?;

        group_order_rows(&rows)
    }

    async fn load_orders_for_user(&self, user_id: &str) -> Result<Vec<OrderRecord>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(&format!(
            "{ORDER_LINE_COLUMNS}
             WHERE o.user_id = ?
             ORDER BY o.rowid, oi.line_no"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        group_order_rows(&rows)
    }

    async fn load_interactions(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<Interaction>, RepositoryError> {
        let rows: Vec<SqliteRow> = match user_id {
            Some(user_id) => {
                sqlx::query(&format!("{INTERACTION_COLUMNS} WHERE user_id = ? ORDER BY id"))
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(&format!("{INTERACTION_COLUMNS} ORDER BY id"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(row_to_interaction).collect()
    }

    async fn insert_interaction(&self, interaction: &Interaction) -> Result<(), RepositoryError> {
        let metadata_json = interaction
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO user_interaction (user_id, product_id, action, metadata_json, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&interaction.user_id)
        .bind(interaction.product_id.as_str())
        .bind(interaction.action.as_str())
        .bind(&metadata_json)
        .bind(interaction.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_interactions(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_interaction")
            .fetch_one(&self.pool)
            .await?;
        Ok(non_negative(count))
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn row_to_product(row: &SqliteRow) -> Result<ProductRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String = row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category: Option<String> =
        row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price: Option<f64> =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rating: Option<f64> =
        row.try_get("rating").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let image: Option<String> =
        row.try_get("image").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let stock: i64 = row.try_get("stock").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ProductRecord {
        id,
        title: Some(title),
        description,
        category: category.map(decode_category),
        price,
        variant_prices: Vec::new(),
        rating,
        image,
        stock,
    })
}

/// The category column holds either a bare name or a JSON document with `name`/`title`.
pub fn decode_category(raw: String) -> CategoryRef {
    if raw.trim_start().starts_with('{') {
        match serde_json::from_str::<CategoryRef>(&raw) {
            Ok(category) => return category,
            Err(error) => warn!(
                event_name = "recommender.store.category_malformed",
                error = %error,
                "category column is not valid JSON; using it as a plain name"
            ),
        }
    }
    CategoryRef::Named(raw)
}

pub fn encode_category(category: &CategoryRef) -> Result<String, RepositoryError> {
    match category {
        CategoryRef::Named(name) => Ok(name.clone()),
        nested => serde_json::to_string(nested).map_err(|e| RepositoryError::Decode(e.to_string())),
    }
}

fn group_order_rows(rows: &[SqliteRow]) -> Result<Vec<OrderRecord>, RepositoryError> {
    let mut orders: Vec<OrderRecord> = Vec::new();
    for row in rows {
        let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let product_id: Option<String> =
            row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        if orders.last().map(|order| order.id != id).unwrap_or(true) {
            let user_id: String =
                row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let status: String =
                row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            orders.push(OrderRecord { id, user_id, status, product_ids: Vec::new() });
        }

        if let (Some(order), Some(product_id)) = (orders.last_mut(), product_id) {
            order.product_ids.push(ProductId(product_id));
        }
    }
    Ok(orders)
}

fn row_to_interaction(row: &SqliteRow) -> Result<Interaction, RepositoryError> {
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_id: String =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action_str: String =
        row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let metadata_json: Option<String> =
        row.try_get("metadata_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let action = action_str
        .parse::<InteractionAction>()
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let metadata = metadata_json
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let timestamp = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Interaction { user_id, product_id: ProductId(product_id), action, timestamp, metadata })
}

#[async_trait]
impl RecommendationStore for SqlRecommendationStore {
    async fn active_products(&self) -> Result<Vec<ProductRecord>, StoreError> {
        Ok(self.load_products().await?)
    }

    async fn popularity_counts(&self) -> Result<HashMap<ProductId, PopularityCounts>, StoreError> {
        Ok(self.load_popularity().await?)
    }

    async fn qualifying_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(self.load_qualifying_orders().await?)
    }

    async fn interactions(&self) -> Result<Vec<Interaction>, StoreError> {
        Ok(self.load_interactions(None).await?)
    }

    async fn orders_for_user(&self, user_id: &str) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(self.load_orders_for_user(user_id).await?)
    }

    async fn interactions_for_user(&self, user_id: &str) -> Result<Vec<Interaction>, StoreError> {
        Ok(self.load_interactions(Some(user_id)).await?)
    }

    async fn record_interaction(&self, interaction: &Interaction) -> Result<(), StoreError> {
        Ok(self.insert_interaction(interaction).await?)
    }

    async fn interaction_count(&self) -> Result<u64, StoreError> {
        Ok(self.count_interactions().await?)
    }
}

#[async_trait]
impl CatalogWriter for SqlRecommendationStore {
    async fn save_product(
        &self,
        product: &ProductRecord,
        active: bool,
    ) -> Result<(), RepositoryError> {
        let category = product.category.as_ref().map(encode_category).transpose()?;
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO product (id, title, description, category, price, rating, image, stock,
                                  is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 category = excluded.category,
                 price = excluded.price,
                 rating = excluded.rating,
                 image = excluded.image,
                 stock = excluded.stock,
                 is_active = excluded.is_active,
                 updated_at = excluded.updated_at",
        )
        .bind(&product.id)
        .bind(product.title.as_deref().unwrap_or_default())
        .bind(&product.description)
        .bind(&category)
        .bind(product.price)
        .bind(product.rating)
        .bind(&product.image)
        .bind(product.stock)
        .bind(i64::from(active))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM product_variant WHERE product_id = ?")
            .bind(&product.id)
            .execute(&mut *tx)
            .await?;
        for (index, price) in product.variant_prices.iter().enumerate() {
            sqlx::query("INSERT INTO product_variant (id, product_id, price) VALUES (?, ?, ?)")
                .bind(format!("{}-v{}", product.id, index + 1))
                .bind(&product.id)
                .bind(price)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_order(&self, order: &OrderRecord) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO customer_order (id, user_id, status, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 user_id = excluded.user_id,
                 status = excluded.status",
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(&order.status)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM order_item WHERE order_id = ?")
            .bind(&order.id)
            .execute(&mut *tx)
            .await?;
        for (line_no, product_id) in order.product_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_item (order_id, line_no, product_id, quantity)
                 VALUES (?, ?, ?, 1)",
            )
            .bind(&order.id)
            .bind(line_no as i64 + 1)
            .bind(product_id.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use recommender_core::domain::interaction::{Interaction, InteractionAction};
    use recommender_core::domain::order::{OrderRecord, PopularityCounts};
    use recommender_core::domain::product::{CategoryRef, ProductId, ProductRecord};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use recommender_core::store::RecommendationStore;
    use serde_json::json;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::{Layer, Registry};

    use super::{decode_category, SqlRecommendationStore};
    use crate::repositories::CatalogWriter;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlRecommendationStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlRecommendationStore::new(pool)
    }

    fn product(id: &str, title: &str, category: CategoryRef) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            title: Some(title.to_string()),
            description: Some("small batch".to_string()),
            category: Some(category),
            price: Some(120.0),
            variant_prices: Vec::new(),
            rating: Some(4.2),
            image: Some(format!("/images/{id}.png")),
            stock: 8,
        }
    }

    fn order(id: &str, user: &str, status: &str, products: &[&str]) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            user_id: user.to_string(),
            status: status.to_string(),
            product_ids: products.iter().map(|p| ProductId::from(*p)).collect(),
        }
    }

    #[test]
    fn category_column_accepts_plain_and_json() {
        assert_eq!(decode_category("Snacks".to_string()), CategoryRef::Named("Snacks".to_string()));
        assert_eq!(
            decode_category(r#"{"title":"Spices"}"#.to_string()),
            CategoryRef::Nested { name: None, title: Some("Spices".to_string()) }
        );
        assert_eq!(decode_category("{broken".to_string()), CategoryRef::Named("{broken".to_string()));
    }

    /// Collects the `event_name` of every event emitted while installed.
    #[derive(Clone, Default)]
    struct EventNames(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> Layer<S> for EventNames {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct Name(Option<String>);
            impl Visit for Name {
                fn record_str(&mut self, field: &Field, value: &str) {
                    if field.name() == "event_name" {
                        self.0 = Some(value.to_string());
                    }
                }
                fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
            }

            let mut name = Name(None);
            event.record(&mut name);
            if let Some(name) = name.0 {
                self.0.lock().push(name);
            }
        }
    }

    #[test]
    fn malformed_category_json_is_logged() {
        let names = EventNames::default();
        let subscriber = Registry::default().with(names.clone());

        let decoded = tracing::subscriber::with_default(subscriber, || {
            decode_category("{\"name\": ".to_string())
        });

        assert_eq!(decoded, CategoryRef::Named("{\"name\": ".to_string()));
        assert_eq!(*names.0.lock(), vec!["recommender.store.category_malformed".to_string()]);
    }

    #[tokio::test]
    async fn active_products_round_trip_with_variants() {
        let store = store().await;
        let mut chips = product("p1", "Banana Chips", CategoryRef::Named("Snacks".to_string()));
        chips.variant_prices = vec![90.0, 150.0];
        let masala = product(
            "p2",
            "Garam Masala",
            CategoryRef::Nested { name: Some("Spices".to_string()), title: None },
        );
        let retired = product("p3", "Old Stock", CategoryRef::Named("Snacks".to_string()));

        store.save_product(&chips, true).await.expect("save chips");
        store.save_product(&masala, true).await.expect("save masala");
        store.save_product(&retired, false).await.expect("save retired");

        let products = store.active_products().await.expect("load");
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, "p1");
        assert_eq!(products[0].variant_prices, vec![90.0, 150.0]);
        assert_eq!(products[1].category, masala.category);
        assert!(products[1].variant_prices.is_empty());
        assert_eq!(products[1].image.as_deref(), Some("/images/p2.png"));
    }

    #[tokio::test]
    async fn popularity_counts_only_qualifying_orders() {
        let store = store().await;
        let snacks = CategoryRef::Named("Snacks".to_string());
        store.save_product(&product("p1", "Banana Chips", snacks.clone()), true).await.expect("p1");
        store.save_product(&product("p2", "Peanut Chikki", snacks), true).await.expect("p2");

        store.save_order(&order("o1", "u1", "Delivered", &["p1", "p2"])).await.expect("o1");
        store.save_order(&order("o2", "u2", "confirmed", &["p1"])).await.expect("o2");
        store.save_order(&order("o3", "u3", "cancelled", &["p1"])).await.expect("o3");
        for action in [InteractionAction::View, InteractionAction::View, InteractionAction::AddToCart] {
            store.record_interaction(&Interaction::new("u4", "p1", action)).await.expect("track");
        }

        let counts = store.popularity_counts().await.expect("counts");
        assert_eq!(
            counts.get("p1"),
            Some(&PopularityCounts { qualifying_orders: 2, cart_adds: 1, views: 2 })
        );
        assert_eq!(
            counts.get("p2"),
            Some(&PopularityCounts { qualifying_orders: 1, cart_adds: 0, views: 0 })
        );
    }

    #[tokio::test]
    async fn order_queries_group_items_by_order() {
        let store = store().await;
        store.save_order(&order("o1", "u1", "processing", &["p1", "p2"])).await.expect("o1");
        store.save_order(&order("o2", "u1", "pending", &["p3"])).await.expect("o2");
        store.save_order(&order("o3", "u2", "delivered", &[])).await.expect("o3");

        let qualifying = store.qualifying_orders().await.expect("qualifying");
        assert_eq!(qualifying.len(), 2);
        assert_eq!(qualifying[0], order("o1", "u1", "processing", &["p1", "p2"]));
        assert!(qualifying[1].product_ids.is_empty());

        let mine = store.orders_for_user("u1").await.expect("user orders");
        let ids: Vec<&str> = mine.iter().map(|order| order.id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o2"]);
    }

    #[tokio::test]
    async fn interactions_round_trip_with_metadata() {
        let store = store().await;
        let tracked = Interaction::new("u1", "p1", InteractionAction::AddToWishlist)
            .with_metadata(json!({"source": "search"}));

        store.record_interaction(&tracked).await.expect("record");
        store
            .record_interaction(&Interaction::new("u2", "p1", InteractionAction::Purchase))
            .await
            .expect("record");

        assert_eq!(store.interaction_count().await.expect("count"), 2);
        let mine = store.interactions_for_user("u1").await.expect("user interactions");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].action, InteractionAction::AddToWishlist);
        assert_eq!(mine[0].metadata, Some(json!({"source": "search"})));
        assert_eq!(store.interactions().await.expect("all").len(), 2);
    }
}
