pub mod affinity;
pub mod cache;
pub mod catalog;
pub mod collaborative;
pub mod config;
pub mod content;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod latent;
pub mod ranking;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use affinity::AffinityMatrix;
pub use cache::{CacheKey, CacheStats, ResponseCache};
pub use catalog::Catalog;
pub use config::{AppConfig, ConfigError, ConfigOverrides, EngineConfig, LoadOptions, LogFormat};
pub use domain::interaction::{Interaction, InteractionAction};
pub use domain::order::{OrderRecord, PopularityCounts};
pub use domain::product::{CategoryRef, Product, ProductId, ProductRecord};
pub use engine::{
    EngineSnapshot, PersonalizedRequest, RecommendationEngine, RecommendationRequest,
    RecommendationResponse, TrackRequest,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ranking::{Candidate, EmptyReason, Method, StrategyOutcome};
pub use store::{RecommendationStore, StoreError};
