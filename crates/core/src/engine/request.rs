use serde::Deserialize;

use crate::domain::interaction::{Interaction, InteractionAction};
use crate::domain::product::ProductId;
use crate::errors::DomainError;
use crate::ranking::Method;

pub const ANONYMOUS_USER: &str = "anonymous";

/// A product-anchored recommendation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendationRequest {
    pub product_id: String,
    pub count: usize,
    pub method: Method,
    pub category_filter: bool,
    pub use_cache: bool,
    pub user_id: Option<String>,
}

impl RecommendationRequest {
    /// Hybrid, category-filtered and cacheable unless changed.
    pub fn new(product_id: impl Into<String>, count: usize) -> Self {
        Self {
            product_id: product_id.into(),
            count,
            method: Method::Hybrid,
            category_filter: true,
            use_cache: true,
            user_id: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn category_filter(mut self, category_filter: bool) -> Self {
        self.category_filter = category_filter;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id.filter(|user_id| !user_id.trim().is_empty());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonalizedRequest {
    pub user_id: String,
    pub count: usize,
    pub category: Option<String>,
}

impl PersonalizedRequest {
    pub fn new(user_id: impl Into<String>, count: usize) -> Self {
        Self { user_id: user_id.into(), count, category: None }
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = category.filter(|category| !category.trim().is_empty());
        self
    }
}

/// Body of a tracking call. Every field is optional on the wire.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl TrackRequest {
    /// Missing action means a view; a missing user is recorded as anonymous.
    pub fn into_interaction(self) -> Result<Interaction, DomainError> {
        let product_id = self
            .product_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DomainError::InvalidRequest("productId is required".to_string()))?;

        let action = match self.action.as_deref().map(str::trim) {
            None | Some("") => InteractionAction::View,
            Some(raw) => raw.parse()?,
        };

        let user_id = self
            .user_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        let interaction = Interaction::new(user_id, ProductId(product_id), action);
        Ok(match self.metadata {
            Some(metadata) if !metadata.is_null() => interaction.with_metadata(metadata),
            _ => interaction,
        })
    }
}

/// Parses a count parameter, falling back to `default` when absent.
pub fn parse_count(raw: Option<&str>, default: usize, max: usize) -> Result<usize, DomainError> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(default);
    };

    let requested = raw
        .parse::<i64>()
        .map_err(|_| DomainError::InvalidRequest(format!("n must be an integer, got `{raw}`")))?;
    validate_count(requested, max)
}

pub fn validate_count(requested: i64, max: usize) -> Result<usize, DomainError> {
    match usize::try_from(requested) {
        Ok(count) if (1..=max).contains(&count) => Ok(count),
        _ => Err(DomainError::CountOutOfRange { requested, max }),
    }
}

/// Query-string boolean: only a case-insensitive `true` enables the flag.
pub fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw {
        None => default,
        Some(value) => value.trim().eq_ignore_ascii_case("true"),
    }
}
