use crate::domain::product::{NormalizedFeatures, Product};

/// Scales values into `[0, 1]`. A constant column scales to `0.0`.
pub fn min_max(values: &[f64]) -> Vec<f64> {
    let Some(first) = values.first().copied() else {
        return Vec::new();
    };
    let (min, max) = values
        .iter()
        .fold((first, first), |(min, max), value| (min.min(*value), max.max(*value)));
    let range = max - min;

    values
        .iter()
        .map(|value| if range > f64::EPSILON { (value - min) / range } else { 0.0 })
        .collect()
}

/// Fills [`Product::normalized`] for every product of one catalog generation.
pub fn normalize_features(products: &mut [Product]) {
    if products.is_empty() {
        return;
    }

    let prices = min_max(&products.iter().map(|p| p.price).collect::<Vec<_>>());
    let ratings = min_max(&products.iter().map(|p| p.rating).collect::<Vec<_>>());
    let popularity = min_max(&products.iter().map(|p| p.popularity_score).collect::<Vec<_>>());

    for (index, product) in products.iter_mut().enumerate() {
        product.normalized = NormalizedFeatures {
            price: prices[index],
            rating: ratings[index],
            popularity: popularity[index],
        };
    }
}

#[cfg(test)]
mod tests {
    use super::min_max;

    #[test]
    fn min_max_scales_to_unit_interval() {
        let scaled = min_max(&[50.0, 100.0, 110.0]);
        assert!((scaled[0] - 0.0).abs() < 1e-9);
        assert!((scaled[1] - 50.0 / 60.0).abs() < 1e-9);
        assert!((scaled[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_column_scales_to_zero() {
        assert_eq!(min_max(&[3.0, 3.0, 3.0]), vec![0.0, 0.0, 0.0]);
        assert!(min_max(&[]).is_empty());
    }
}
