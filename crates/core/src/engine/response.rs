use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::domain::product::Product;
use crate::ranking::{Candidate, Method};

pub const HEALTHY: &str = "healthy";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendedProduct {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub rating: f64,
    #[serde(rename = "mainIngredient")]
    pub main_ingredient: String,
    pub image: Option<String>,
    pub description: String,
    pub similarity: f64,
    pub reason: String,
    pub stock: i64,
    pub popularity: f64,
}

impl RecommendedProduct {
    pub fn from_candidate(product: &Product, candidate: &Candidate) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            rating: product.rating,
            main_ingredient: product.main_ingredient.clone(),
            image: product.image.clone(),
            description: product.description.clone(),
            similarity: round_to(candidate.score, 2),
            reason: candidate.reason.clone(),
            stock: product.stock,
            popularity: round_to(product.popularity_score, 1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendationResponse {
    pub success: bool,
    pub recommendations: Vec<RecommendedProduct>,
    pub total: usize,
    pub method: Method,
    pub category_filter: bool,
}

impl RecommendationResponse {
    pub fn new(recommendations: Vec<RecommendedProduct>, method: Method, category_filter: bool) -> Self {
        Self {
            success: true,
            total: recommendations.len(),
            recommendations,
            method,
            category_filter,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonalizedProduct {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub rating: f64,
    pub image: Option<String>,
    pub reason: String,
}

impl PersonalizedProduct {
    pub fn from_candidate(product: &Product, candidate: &Candidate) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            rating: product.rating,
            image: product.image.clone(),
            reason: candidate.reason.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonalizedResponse {
    pub success: bool,
    pub recommendations: Vec<PersonalizedProduct>,
    pub total: usize,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackResponse {
    pub success: bool,
    pub message: String,
}

impl TrackResponse {
    pub fn tracked() -> Self {
        Self { success: true, message: "Interaction tracked".to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub success: bool,
    pub message: String,
    pub products_loaded: usize,
    #[serde(skip)]
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub status: &'static str,
    pub products_loaded: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineStats {
    pub products_loaded: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub generation: u64,
    pub cache: CacheStats,
    pub user_interactions: u64,
    pub matrix_shape: Option<[usize; 2]>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: EngineStats,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RecommendationResponse, RecommendedProduct};
    use crate::domain::product::ProductId;
    use crate::ranking::{Candidate, Method};
    use crate::test_support::product;

    #[test]
    fn recommended_product_rounds_display_scores() {
        let mut target = product("p1", "Roasted Cashew", "snacks", 120.0, 4.4, 6);
        target.popularity_score = 17.25;
        let candidate = Candidate::new(ProductId::from("p1"), 0.73456, "Similar price");

        let item = RecommendedProduct::from_candidate(&target, &candidate);

        assert_eq!(item.similarity, 0.73);
        assert_eq!(item.popularity, 17.3);
        assert_eq!(item.main_ingredient, "cashew");
    }

    #[test]
    fn response_serializes_wire_field_names() {
        let target = product("p1", "Roasted Cashew", "snacks", 120.0, 4.4, 6);
        let candidate = Candidate::new(ProductId::from("p1"), 0.5, "Recommended for you");
        let response = RecommendationResponse::new(
            vec![RecommendedProduct::from_candidate(&target, &candidate)],
            Method::MatrixFactorization,
            false,
        );

        let value = serde_json::to_value(&response).expect("serializable response");

        assert_eq!(value["method"], json!("matrix_factorization"));
        assert_eq!(value["category_filter"], json!(false));
        assert_eq!(value["total"], json!(1));
        assert_eq!(value["recommendations"][0]["mainIngredient"], json!("cashew"));
        assert_eq!(value["recommendations"][0]["image"], json!(null));
    }
}
