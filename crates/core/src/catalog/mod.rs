//! Catalog loading and feature engineering.
//!
//! Pulls active products from the store, resolves category and price, derives the
//! main ingredient and popularity score, then min-max scales price, rating and
//! popularity across the whole generation.

mod ingredients;
mod normalize;

use std::collections::HashMap;

use tracing::{error, info};

pub use ingredients::{extract_main_ingredient, FALLBACK_INGREDIENT, INGREDIENT_KEYWORDS};
pub use normalize::{min_max, normalize_features};

use crate::domain::order::PopularityCounts;
use crate::domain::product::{NormalizedFeatures, Product, ProductId, ProductRecord};
use crate::store::{RecommendationStore, StoreError};

pub const DEFAULT_RATING: f64 = 4.0;
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Ordered product list with an id index. Catalog order breaks score ties.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl Catalog {
    /// Builds the catalog and normalizes features. Duplicate ids keep their first occurrence.
    pub fn new(products: Vec<Product>) -> Self {
        let mut unique = Vec::with_capacity(products.len());
        let mut index = HashMap::with_capacity(products.len());
        for product in products {
            if index.contains_key(&product.id) {
                continue;
            }
            index.insert(product.id.clone(), unique.len());
            unique.push(product);
        }

        normalize_features(&mut unique);
        Self { products: unique, index }
    }

    pub fn from_records(
        records: Vec<ProductRecord>,
        popularity: &HashMap<ProductId, PopularityCounts>,
    ) -> Self {
        let products = records
            .into_iter()
            .map(|record| {
                let score = popularity
                    .get(record.id.as_str())
                    .map(PopularityCounts::score)
                    .unwrap_or(0.0);
                build_product(record, score)
            })
            .collect();
        Self::new(products)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.position(id).map(|position| &self.products[position])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }
}

/// Turns a raw store row into a catalog product with derived attributes.
/// Normalized features stay zero until the catalog is assembled.
pub fn build_product(record: ProductRecord, popularity_score: f64) -> Product {
    let category = record
        .category
        .as_ref()
        .and_then(|category| category.resolve())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_CATEGORY)
        .to_lowercase();

    let name = record.title.unwrap_or_default();
    let description = record.description.unwrap_or_default();
    let price = resolve_price(record.price, &record.variant_prices);
    let rating = record.rating.filter(|rating| rating.is_finite()).unwrap_or(DEFAULT_RATING);
    let main_ingredient = extract_main_ingredient(&name, &description);
    let stock = record.stock.max(0);
    let content = format!("{name} {category} {description} {main_ingredient}").to_lowercase();

    Product {
        id: ProductId(record.id),
        name,
        category,
        price,
        rating,
        description,
        image: record.image,
        main_ingredient,
        stock,
        in_stock: stock > 0,
        popularity_score,
        content,
        normalized: NormalizedFeatures::default(),
    }
}

/// Cheapest positive variant price, otherwise the base price.
pub fn resolve_price(base_price: Option<f64>, variant_prices: &[f64]) -> f64 {
    let cheapest_variant = variant_prices
        .iter()
        .copied()
        .filter(|price| price.is_finite() && *price > 0.0)
        .fold(None, |cheapest: Option<f64>, price| {
            Some(cheapest.map_or(price, |current| current.min(price)))
        });

    cheapest_variant
        .or(base_price.filter(|price| price.is_finite()))
        .unwrap_or(0.0)
        .max(0.0)
}

/// Loads one catalog generation. Popularity failures degrade to zero popularity;
/// a failure to read products is returned to the caller.
pub async fn try_load_catalog(store: &dyn RecommendationStore) -> Result<Catalog, StoreError> {
    let records = store.active_products().await?;

    let popularity = match store.popularity_counts().await {
        Ok(counts) => counts,
        Err(error) => {
            error!(
                event_name = "recommender.catalog.popularity_failed",
                error = %error,
                "could not load popularity signals; scoring all products as unpopular"
            );
            HashMap::new()
        }
    };

    let catalog = Catalog::from_records(records, &popularity);
    info!(
        event_name = "recommender.catalog.loaded",
        products_loaded = catalog.len(),
        "catalog generation loaded"
    );
    Ok(catalog)
}

/// Like [`try_load_catalog`] but never fails: a store error yields an empty catalog.
pub async fn load_catalog(store: &dyn RecommendationStore) -> Catalog {
    match try_load_catalog(store).await {
        Ok(catalog) => catalog,
        Err(error) => {
            error!(
                event_name = "recommender.catalog.load_failed",
                error = %error,
                "could not load products; serving an empty catalog"
            );
            Catalog::default()
        }
    }
}
