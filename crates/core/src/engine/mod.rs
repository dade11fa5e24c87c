//! The recommendation engine: owns the published snapshot and the response cache,
//! rebuilds on staleness, and answers every request against one immutable generation.

mod refresh;
mod request;
mod response;
mod snapshot;

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub use refresh::RefreshPolicy;
pub use request::{
    parse_count, parse_flag, validate_count, PersonalizedRequest, RecommendationRequest,
    TrackRequest, ANONYMOUS_USER,
};
pub use response::{
    EngineStats, HealthSummary, PersonalizedProduct, PersonalizedResponse, RecommendationResponse,
    RecommendedProduct, RefreshReport, StatsResponse, TrackResponse, HEALTHY,
};
pub use snapshot::EngineSnapshot;

use crate::cache::{CacheKey, CacheStats, ResponseCache};
use crate::catalog::try_load_catalog;
use crate::config::EngineConfig;
use crate::domain::interaction::Interaction;
use crate::errors::ApplicationError;
use crate::ranking::personalization::UserHistory;
use crate::ranking::personalized_recommendations;
use crate::store::RecommendationStore;

pub struct RecommendationEngine {
    store: Arc<dyn RecommendationStore>,
    config: EngineConfig,
    policy: RefreshPolicy,
    snapshot: RwLock<Arc<EngineSnapshot>>,
    refresh_guard: Mutex<()>,
    generation: AtomicU64,
    cache: ResponseCache<CacheKey, RecommendationResponse>,
}

impl RecommendationEngine {
    /// Creates an engine with nothing loaded. The first request triggers a rebuild.
    pub fn new(store: Arc<dyn RecommendationStore>, config: EngineConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            policy: RefreshPolicy::new(config.update_interval()),
            cache: ResponseCache::new(capacity, config.cache_ttl()),
            snapshot: RwLock::new(Arc::new(EngineSnapshot::empty())),
            refresh_guard: Mutex::new(()),
            generation: AtomicU64::new(0),
            config,
        }
    }

    /// Creates the engine and performs the initial load. A failed load is logged and
    /// retried by the next request.
    pub async fn bootstrap(store: Arc<dyn RecommendationStore>, config: EngineConfig) -> Self {
        let engine = Self::new(store, config);
        if let Err(error) = engine.refresh().await {
            error!(
                event_name = "recommender.bootstrap.initial_load_failed",
                error = %error,
                "initial engine load failed; serving empty results until the store recovers"
            );
        }
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The currently published generation. Cheap; callers hold it for a whole request.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn is_stale(&self) -> bool {
        self.policy.is_due(self.snapshot().last_updated, Utc::now())
    }

    /// Rebuilds when the published generation is stale. Concurrent callers coalesce on
    /// one rebuild. Once a generation is published, callers that find a rebuild already
    /// running keep serving it instead of waiting. Returns whether this call published a
    /// new generation.
    pub async fn update_if_needed(&self) -> bool {
        if !self.is_stale() {
            return false;
        }

        let published = self.snapshot().last_updated.is_some();
        let _guard = if published {
            match self.refresh_guard.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!(
                        event_name = "recommender.refresh.in_progress",
                        "rebuild already running; serving the published generation"
                    );
                    return false;
                }
            }
        } else {
            self.refresh_guard.lock().await
        };
        if !self.is_stale() {
            debug!(
                event_name = "recommender.refresh.coalesced",
                "another caller already refreshed the engine"
            );
            return false;
        }

        match self.rebuild().await {
            Ok(_) => true,
            Err(error) => {
                error!(
                    event_name = "recommender.refresh.failed",
                    error = %error,
                    "scheduled refresh failed; keeping the previous generation"
                );
                false
            }
        }
    }

    /// Unconditional rebuild.
    pub async fn refresh(&self) -> Result<RefreshReport, ApplicationError> {
        let _guard = self.refresh_guard.lock().await;
        let snapshot = self.rebuild().await?;

        Ok(RefreshReport {
            success: true,
            message: "Recommendation engine refreshed".to_string(),
            products_loaded: snapshot.catalog.len(),
            generation: snapshot.generation,
        })
    }

    /// Callers must hold `refresh_guard`.
    async fn rebuild(&self) -> Result<Arc<EngineSnapshot>, ApplicationError> {
        let started = Instant::now();
        info!(event_name = "recommender.refresh.started", "refreshing recommendation engine");

        let catalog = try_load_catalog(self.store.as_ref()).await.map_err(|error| {
            error!(
                event_name = "recommender.catalog.load_failed",
                error = %error,
                "could not load products"
            );
            ApplicationError::from(error)
        })?;

        let orders = match self.store.qualifying_orders().await {
            Ok(orders) => orders,
            Err(error) => {
                error!(
                    event_name = "recommender.affinity.orders_failed",
                    error = %error,
                    "could not load orders; building affinity without them"
                );
                Vec::new()
            }
        };
        let interactions = match self.store.interactions().await {
            Ok(interactions) => interactions,
            Err(error) => {
                error!(
                    event_name = "recommender.affinity.interactions_failed",
                    error = %error,
                    "could not load interactions; building affinity without them"
                );
                Vec::new()
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let config = self.config.clone();
        let loaded_at = Utc::now();
        let snapshot = tokio::task::spawn_blocking(move || {
            EngineSnapshot::build(generation, catalog, &orders, &interactions, &config, loaded_at)
        })
        .await
        .map_err(|error| ApplicationError::Rebuild(error.to_string()))?;

        let snapshot = Arc::new(snapshot);
        *self.snapshot.write() = Arc::clone(&snapshot);
        self.cache.clear();

        info!(
            event_name = "recommender.refresh.completed",
            generation,
            products_loaded = snapshot.catalog.len(),
            vocabulary = snapshot.content.vocabulary_size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recommendation engine refreshed"
        );
        Ok(snapshot)
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, ApplicationError> {
        let count = validate_count(as_requested(request.count), self.config.max_count)?;
        self.update_if_needed().await;
        let snapshot = self.snapshot();

        let key = CacheKey {
            product_id: request.product_id.clone(),
            method: request.method,
            count,
            category_filter: request.category_filter,
            user_id: request.user_id.clone(),
            generation: snapshot.generation,
        };
        if request.use_cache {
            if let Some(cached) = self.cache.get(&key) {
                debug!(
                    event_name = "recommender.cache.hit",
                    product_id = %request.product_id,
                    method = %request.method,
                    "serving cached recommendations"
                );
                return Ok(cached);
            }
        }

        let outcome = snapshot.context().recommend(
            request.method,
            &request.product_id,
            count,
            request.category_filter,
        );
        if let Some(reason) = outcome.empty_reason() {
            warn!(
                event_name = "recommender.recommend.empty",
                product_id = %request.product_id,
                method = %request.method,
                reason = %reason.description(),
                "no recommendations produced"
            );
        }

        let recommendations = outcome
            .candidates()
            .iter()
            .filter_map(|candidate| {
                snapshot
                    .catalog
                    .get(candidate.product_id.as_str())
                    .map(|product| RecommendedProduct::from_candidate(product, candidate))
            })
            .collect();
        let response =
            RecommendationResponse::new(recommendations, request.method, request.category_filter);

        if request.use_cache {
            self.cache.insert(key, response.clone());
        }
        Ok(response)
    }

    pub async fn personalized(
        &self,
        request: &PersonalizedRequest,
    ) -> Result<PersonalizedResponse, ApplicationError> {
        let count = validate_count(as_requested(request.count), self.config.max_count)?;
        self.update_if_needed().await;
        let snapshot = self.snapshot();
        let history = self.load_history(&request.user_id).await;

        let outcome = personalized_recommendations(
            &snapshot.catalog,
            &history,
            count,
            request.category.as_deref(),
        );
        if let Some(reason) = outcome.empty_reason() {
            info!(
                event_name = "recommender.personalized.empty",
                user_id = %request.user_id,
                reason = %reason.description(),
                "no personalized recommendations produced"
            );
        }

        let recommendations: Vec<PersonalizedProduct> = outcome
            .candidates()
            .iter()
            .filter_map(|candidate| {
                snapshot
                    .catalog
                    .get(candidate.product_id.as_str())
                    .map(|product| PersonalizedProduct::from_candidate(product, candidate))
            })
            .collect();

        Ok(PersonalizedResponse {
            success: true,
            total: recommendations.len(),
            recommendations,
            user_id: request.user_id.clone(),
        })
    }

    async fn load_history(&self, user_id: &str) -> UserHistory {
        let orders = self.store.orders_for_user(user_id).await.unwrap_or_else(|error| {
            error!(
                event_name = "recommender.personalized.orders_failed",
                user_id = %user_id,
                error = %error,
                "could not load user orders"
            );
            Vec::new()
        });
        let interactions = self.store.interactions_for_user(user_id).await.unwrap_or_else(|error| {
            error!(
                event_name = "recommender.personalized.interactions_failed",
                user_id = %user_id,
                error = %error,
                "could not load user interactions"
            );
            Vec::new()
        });

        UserHistory { orders, interactions }
    }

    /// Appends one event. Takes effect in affinity on the next rebuild.
    pub async fn track(&self, interaction: Interaction) -> Result<TrackResponse, ApplicationError> {
        self.store.record_interaction(&interaction).await.map_err(|error| {
            error!(
                event_name = "recommender.interaction.track_failed",
                error = %error,
                "could not record interaction"
            );
            ApplicationError::from(error)
        })?;

        info!(
            event_name = "recommender.interaction.tracked",
            user_id = %interaction.user_id,
            product_id = %interaction.product_id,
            action = %interaction.action,
            "interaction tracked"
        );
        Ok(TrackResponse::tracked())
    }

    pub async fn stats(&self) -> Result<EngineStats, ApplicationError> {
        let snapshot = self.snapshot();
        let user_interactions = self.store.interaction_count().await?;

        Ok(EngineStats {
            products_loaded: snapshot.catalog.len(),
            last_updated: snapshot.last_updated,
            generation: snapshot.generation,
            cache: self.cache.stats(),
            user_interactions,
            matrix_shape: snapshot.matrix_shape(),
        })
    }

    pub fn health(&self) -> HealthSummary {
        let snapshot = self.snapshot();
        HealthSummary {
            status: HEALTHY,
            products_loaded: snapshot.catalog.len(),
            last_updated: snapshot.last_updated,
            generation: snapshot.generation,
        }
    }
}

fn as_requested(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use super::{PersonalizedRequest, RecommendationEngine, RecommendationRequest};
    use crate::config::EngineConfig;
    use crate::domain::interaction::{Interaction, InteractionAction};
    use crate::domain::order::PopularityCounts;
    use crate::domain::product::ProductId;
    use crate::errors::{ApplicationError, DomainError};
    use crate::ranking::Method;
    use crate::test_support::{order, record, FakeStore};

    fn trio() -> FakeStore {
        FakeStore::with_products(vec![
            record("A", "Masala Peanuts", "Snacks", 100.0, 4.5, 10),
            record("B", "Salted Peanuts", "Snacks", 110.0, 4.3, 10),
            record("C", "Ginger Tea", "Beverages", 50.0, 4.0, 10),
        ])
    }

    fn ids(response: &super::RecommendationResponse) -> Vec<&str> {
        response.recommendations.iter().map(|item| item.id.as_str()).collect()
    }

    async fn engine_with(store: Arc<FakeStore>, config: EngineConfig) -> RecommendationEngine {
        RecommendationEngine::bootstrap(store, config).await
    }

    #[tokio::test]
    async fn hybrid_end_to_end_over_three_products() {
        let engine = engine_with(Arc::new(trio()), EngineConfig::default()).await;

        let filtered = engine
            .recommend(&RecommendationRequest::new("A", 1))
            .await
            .expect("filtered recommendation");
        assert_eq!(ids(&filtered), vec!["B"]);
        assert_eq!(filtered.total, 1);

        let unfiltered = engine
            .recommend(&RecommendationRequest::new("A", 2).category_filter(false))
            .await
            .expect("unfiltered recommendation");
        assert_eq!(ids(&unfiltered), vec!["B", "C"]);
        assert!(!unfiltered.category_filter);
    }

    #[tokio::test]
    async fn repeated_request_is_served_from_cache() {
        let engine = engine_with(Arc::new(trio()), EngineConfig::default()).await;
        let request = RecommendationRequest::new("A", 2).category_filter(false);

        let first = engine.recommend(&request).await.expect("first");
        let second = engine.recommend(&request).await.expect("second");

        assert_eq!(
            serde_json::to_string(&first).expect("json"),
            serde_json::to_string(&second).expect("json")
        );
        let stats = engine.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn zero_ttl_always_recomputes() {
        let config = EngineConfig { cache_ttl_secs: 0, ..EngineConfig::default() };
        let engine = engine_with(Arc::new(trio()), config).await;
        let request = RecommendationRequest::new("A", 1);

        engine.recommend(&request).await.expect("first");
        engine.recommend(&request).await.expect("second");

        let stats = engine.cache_stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
    }

    #[tokio::test]
    async fn cache_bypass_does_not_touch_counters() {
        let engine = engine_with(Arc::new(trio()), EngineConfig::default()).await;

        engine
            .recommend(&RecommendationRequest::new("A", 1).use_cache(false))
            .await
            .expect("uncached");

        let stats = engine.cache_stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn refresh_twice_keeps_catalog_and_clears_cache() {
        let store = Arc::new(trio());
        let engine = engine_with(Arc::clone(&store), EngineConfig::default()).await;
        assert_eq!(engine.snapshot().generation, 1);

        engine.recommend(&RecommendationRequest::new("A", 1)).await.expect("warm cache");
        let first = engine.refresh().await.expect("first refresh");
        assert_eq!(engine.cache_stats().entries, 0);

        engine.recommend(&RecommendationRequest::new("A", 1)).await.expect("warm cache again");
        let second = engine.refresh().await.expect("second refresh");

        assert_eq!(first.products_loaded, 3);
        assert_eq!(second.products_loaded, 3);
        assert_eq!(second.generation, first.generation + 1);
        assert_eq!(engine.cache_stats().entries, 0);
        assert_eq!(engine.cache_stats().misses, 2);
    }

    #[tokio::test]
    async fn unknown_product_falls_back_to_popular_items() {
        let mut store = trio();
        store.popularity = HashMap::from([
            (ProductId::from("C"), PopularityCounts { qualifying_orders: 4, cart_adds: 0, views: 0 }),
            (ProductId::from("B"), PopularityCounts { qualifying_orders: 1, cart_adds: 0, views: 0 }),
        ]);
        let engine = engine_with(Arc::new(store), EngineConfig::default()).await;

        let response = engine
            .recommend(&RecommendationRequest::new("missing", 2))
            .await
            .expect("cold start");

        assert_eq!(ids(&response), vec!["C", "B"]);
        assert_eq!(response.recommendations[0].popularity, 20.0);
    }

    #[tokio::test]
    async fn every_method_excludes_self_and_honours_category() {
        let store = FakeStore {
            orders: vec![
                order("o1", "u1", "delivered", &["A", "B", "C"]),
                order("o2", "u2", "confirmed", &["A", "B"]),
                order("o3", "u3", "processing", &["B", "C"]),
            ],
            ..trio()
        };
        let engine = engine_with(Arc::new(store), EngineConfig::default()).await;

        for method in
            [Method::Content, Method::Collaborative, Method::MatrixFactorization, Method::Hybrid]
        {
            let response = engine
                .recommend(&RecommendationRequest::new("A", 5).method(method))
                .await
                .expect("recommendation");
            assert_eq!(response.method, method);
            for item in &response.recommendations {
                assert_ne!(item.id, "A", "{method} recommended the target itself");
                assert_eq!(item.category, "snacks", "{method} ignored the category filter");
            }
        }
    }

    #[tokio::test]
    async fn concurrent_staleness_checks_share_one_rebuild() {
        let store = Arc::new(trio());
        let engine = RecommendationEngine::new(Arc::clone(&store) as _, EngineConfig::default());

        let (first, second) = tokio::join!(engine.update_if_needed(), engine.update_if_needed());

        assert!(first ^ second, "exactly one caller should publish a generation");
        assert_eq!(store.product_loads(), 1);
        assert!(!engine.update_if_needed().await);
        assert_eq!(engine.snapshot().generation, 1);
    }

    #[tokio::test]
    async fn readers_keep_the_published_generation_during_a_slow_rebuild() {
        let store = Arc::new(trio());
        let config = EngineConfig { update_interval_secs: 0, ..EngineConfig::default() };
        let engine = Arc::new(engine_with(Arc::clone(&store), config).await);
        assert_eq!(engine.snapshot().generation, 1);

        store.product_delay_ms.store(400, Ordering::SeqCst);
        let background = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.update_if_needed().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(engine.is_stale());

        let response = tokio::time::timeout(
            Duration::from_millis(200),
            engine.recommend(&RecommendationRequest::new("A", 1)),
        )
        .await
        .expect("reader must not wait for the rebuild")
        .expect("recommendation");
        assert_eq!(ids(&response), vec!["B"]);
        assert_eq!(engine.snapshot().generation, 1);

        assert!(background.await.expect("rebuild task"));
        assert_eq!(engine.snapshot().generation, 2);
        assert_eq!(store.product_loads(), 2);
    }

    #[tokio::test]
    async fn failed_product_load_keeps_retrying() {
        let store = Arc::new(trio());
        store.fail_products.store(true, Ordering::SeqCst);
        let engine = engine_with(Arc::clone(&store), EngineConfig::default()).await;

        assert_eq!(engine.health().products_loaded, 0);
        assert!(engine.health().last_updated.is_none());
        assert!(matches!(engine.refresh().await, Err(ApplicationError::Persistence(_))));

        let response =
            engine.recommend(&RecommendationRequest::new("A", 1)).await.expect("empty response");
        assert!(response.recommendations.is_empty());
        assert_eq!(store.product_loads(), 3);

        store.fail_products.store(false, Ordering::SeqCst);
        assert!(engine.update_if_needed().await);
        assert_eq!(engine.health().products_loaded, 3);
    }

    #[tokio::test]
    async fn count_outside_range_is_rejected() {
        let engine = engine_with(Arc::new(trio()), EngineConfig::default()).await;

        let error = engine
            .recommend(&RecommendationRequest::new("A", 0))
            .await
            .expect_err("zero count");
        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::CountOutOfRange { requested: 0, max: 100 })
        );
    }

    #[tokio::test]
    async fn tracked_interactions_show_up_in_stats() {
        let engine = engine_with(Arc::new(trio()), EngineConfig::default()).await;

        engine
            .track(Interaction::new("u1", "A", InteractionAction::AddToCart))
            .await
            .expect("tracked");
        let stats = engine.stats().await.expect("stats");

        assert_eq!(stats.user_interactions, 1);
        assert_eq!(stats.products_loaded, 3);
        assert_eq!(stats.generation, 1);
        assert_eq!(stats.matrix_shape, None);
    }

    #[tokio::test]
    async fn personalized_skips_purchased_products() {
        let store = FakeStore { orders: vec![order("o1", "u1", "pending", &["A"])], ..trio() };
        let engine = engine_with(Arc::new(store), EngineConfig::default()).await;

        let response = engine
            .personalized(&PersonalizedRequest::new("u1", 10))
            .await
            .expect("personalized");
        let ids: Vec<&str> = response.recommendations.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["B"]);
        assert_eq!(response.user_id, "u1");

        let stranger = engine
            .personalized(&PersonalizedRequest::new("nobody", 10))
            .await
            .expect("personalized");
        assert_eq!(stranger.total, 0);

        let by_category = engine
            .personalized(&PersonalizedRequest::new("nobody", 10).category(Some("Beverages".into())))
            .await
            .expect("personalized");
        assert_eq!(by_category.recommendations[0].id, "C");
    }
}
