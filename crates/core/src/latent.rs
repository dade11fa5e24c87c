//! Latent-factor similarity via a truncated SVD of the mean-centred affinity matrix.
//!
//! The right singular vectors are recovered from a symmetric eigendecomposition of
//! whichever Gram matrix is smaller (`AᵀA` or `AAᵀ`).

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis};
use tracing::{debug, warn};

use crate::affinity::AffinityMatrix;
use crate::catalog::Catalog;
use crate::ranking::{descending, Candidate, EmptyReason, StrategyOutcome, REASON_LATENT};

pub const DEFAULT_MAX_FACTORS: usize = 50;

const MAX_EIGEN_ITERATIONS: usize = 10_000;
/// Singular values below this fraction of the largest are treated as zero.
const SINGULAR_VALUE_FLOOR: f64 = 1e-6;

/// Per-product latent vectors, one row per affinity matrix column.
#[derive(Debug, Clone)]
pub struct LatentFactors {
    product_vectors: Array2<f64>,
}

impl LatentFactors {
    pub fn rank(&self) -> usize {
        self.product_vectors.ncols()
    }

    pub fn similarity(&self, left: usize, right: usize) -> f64 {
        let left = self.product_vectors.row(left);
        let right = self.product_vectors.row(right);
        let norms = left.dot(&left).sqrt() * right.dot(&right).sqrt();
        if norms > 0.0 {
            left.dot(&right) / norms
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub enum LatentModel {
    Ready(LatentFactors),
    Unavailable(EmptyReason),
}

impl LatentModel {
    pub fn factors(&self) -> Option<&LatentFactors> {
        match self {
            Self::Ready(factors) => Some(factors),
            Self::Unavailable(_) => None,
        }
    }
}

/// Rank used for a matrix of the given shape; zero means the matrix is too small.
pub fn factor_rank(shape: (usize, usize), max_factors: usize) -> usize {
    max_factors.min(shape.0.min(shape.1).saturating_sub(1))
}

pub fn factorize(matrix: &AffinityMatrix, max_factors: usize) -> LatentModel {
    if matrix.is_empty() {
        return LatentModel::Unavailable(EmptyReason::InsufficientData);
    }
    let rank = factor_rank(matrix.shape(), max_factors);
    if rank < 1 {
        debug!(
            event_name = "recommender.latent.skipped",
            users = matrix.shape().0,
            products = matrix.shape().1,
            "affinity matrix too small for factorization"
        );
        return LatentModel::Unavailable(EmptyReason::InsufficientData);
    }

    let mut dense = matrix.to_dense();
    let user_means = dense.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(dense.nrows()));
    for (mut row, mean) in dense.axis_iter_mut(Axis(0)).zip(user_means.iter()) {
        row.mapv_inplace(|value| value - mean);
    }

    match right_singular_vectors(&dense, rank) {
        Ok(product_vectors) => LatentModel::Ready(LatentFactors { product_vectors }),
        Err(detail) => {
            warn!(
                event_name = "recommender.latent.numerical_failure",
                detail = %detail,
                "latent factorization failed"
            );
            LatentModel::Unavailable(EmptyReason::NumericalFailure(detail))
        }
    }
}

/// Top-`rank` right singular vectors of `a` as a `columns × kept` matrix.
/// Components whose singular value is numerically zero are dropped.
fn right_singular_vectors(a: &Array2<f64>, rank: usize) -> Result<Array2<f64>, String> {
    if !a.iter().all(|value| value.is_finite()) {
        return Err("affinity matrix contains non-finite values".to_string());
    }
    let (rows, columns) = a.dim();
    let use_column_gram = columns <= rows;
    let gram = if use_column_gram { a.t().dot(a) } else { a.dot(&a.t()) };

    let size = gram.nrows();
    let gram = DMatrix::from_fn(size, size, |row, column| gram[[row, column]]);
    let eigen = SymmetricEigen::try_new(gram, f64::EPSILON, MAX_EIGEN_ITERATIONS).ok_or_else(
        || format!("eigen decomposition did not converge in {MAX_EIGEN_ITERATIONS} iterations"),
    )?;
    let eigenvalues = eigen.eigenvalues;
    let eigenvectors = eigen.eigenvectors;

    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    order.sort_by(|left, right| descending(eigenvalues[*left], eigenvalues[*right]));

    let largest_sigma =
        order.first().map(|index| eigenvalues[*index].max(0.0).sqrt()).unwrap_or(0.0);
    let floor = SINGULAR_VALUE_FLOOR * largest_sigma.max(1.0);
    let kept: Vec<usize> = order
        .into_iter()
        .take(rank)
        .filter(|index| eigenvalues[*index].max(0.0).sqrt() > floor)
        .collect();
    if kept.is_empty() {
        return Err("no non-degenerate singular values".to_string());
    }

    let mut vectors = Array2::<f64>::zeros((columns, kept.len()));
    for (component, index) in kept.iter().enumerate() {
        let eigenvector: Array1<f64> = eigenvectors.column(*index).iter().copied().collect();
        if use_column_gram {
            vectors.column_mut(component).assign(&eigenvector);
        } else {
            let sigma = eigenvalues[*index].sqrt();
            let projected = a.t().dot(&eigenvector) / sigma;
            vectors.column_mut(component).assign(&projected);
        }
    }

    if vectors.iter().all(|value| value.is_finite()) {
        Ok(vectors)
    } else {
        Err("non-finite latent factors".to_string())
    }
}

pub fn latent_factor_recommendations(
    catalog: &Catalog,
    matrix: &AffinityMatrix,
    model: &LatentModel,
    product_id: &str,
    n: usize,
    category_filter: bool,
) -> StrategyOutcome {
    let Some(target) = catalog.get(product_id) else {
        warn!(
            event_name = "recommender.latent.unknown_product",
            product_id = %product_id,
            "product not found for latent factor recommendations"
        );
        return StrategyOutcome::Empty(EmptyReason::UnknownProduct);
    };
    let factors = match model {
        LatentModel::Ready(factors) => factors,
        LatentModel::Unavailable(reason) => return StrategyOutcome::Empty(reason.clone()),
    };
    let Some(target_column) = matrix.column_of(product_id) else {
        return StrategyOutcome::Empty(EmptyReason::NoInteractions);
    };

    let (_, product_count) = matrix.shape();
    let mut scored: Vec<(usize, f64)> = (0..product_count)
        .filter(|column| *column != target_column)
        .map(|column| (column, factors.similarity(target_column, column)))
        .collect();
    scored.sort_by(|left, right| descending(left.1, right.1));

    let candidates: Vec<Candidate> = scored
        .into_iter()
        .filter_map(|(column, similarity)| {
            let product = catalog.get(matrix.product_at(column)?.as_str())?;
            let eligible =
                product.in_stock && (!category_filter || product.category == target.category);
            eligible.then(|| Candidate::new(product.id.clone(), similarity, REASON_LATENT))
        })
        .take(n)
        .collect();

    StrategyOutcome::from_candidates(candidates)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::{
        factor_rank, factorize, latent_factor_recommendations, right_singular_vectors,
        LatentModel,
    };
    use crate::affinity::AffinityMatrix;
    use crate::catalog::Catalog;
    use crate::domain::interaction::{Interaction, InteractionAction};
    use crate::ranking::EmptyReason;
    use crate::test_support::product;

    #[test]
    fn rank_is_capped_by_smaller_dimension() {
        assert_eq!(factor_rank((3, 10), 50), 2);
        assert_eq!(factor_rank((200, 300), 50), 50);
        assert_eq!(factor_rank((1, 5), 50), 0);
    }

    #[test]
    fn tall_matrix_keeps_the_dominant_product_direction() {
        let vectors = right_singular_vectors(&array![[1.0, 0.0], [0.0, 2.0], [0.0, 0.0]], 1)
            .expect("well conditioned input");

        assert_eq!(vectors.dim(), (2, 1));
        assert!(vectors[[0, 0]].abs() < 1e-9);
        assert!((vectors[[1, 0]].abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn wide_matrix_projects_back_onto_products() {
        let vectors = right_singular_vectors(&array![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0]], 2)
            .expect("well conditioned input");

        assert_eq!(vectors.dim(), (3, 2));
        assert!((vectors[[1, 0]].abs() - 1.0).abs() < 1e-9);
        assert!((vectors[[0, 1]].abs() - 1.0).abs() < 1e-9);
        assert!(vectors.row(2).iter().all(|value| value.abs() < 1e-9));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        assert!(right_singular_vectors(&array![[f64::NAN, 0.0], [0.0, 1.0]], 1).is_err());
    }

    #[test]
    fn single_user_matrix_is_skipped_as_insufficient() {
        let matrix = AffinityMatrix::build(
            &[],
            &[
                Interaction::new("u1", "a", InteractionAction::Purchase),
                Interaction::new("u1", "b", InteractionAction::View),
            ],
        );
        assert!(matches!(
            factorize(&matrix, 50),
            LatentModel::Unavailable(EmptyReason::InsufficientData)
        ));
    }

    #[test]
    fn uniform_rows_are_a_numerical_failure_not_a_fault() {
        let matrix = AffinityMatrix::build(
            &[],
            &[
                Interaction::new("u1", "a", InteractionAction::View),
                Interaction::new("u1", "b", InteractionAction::View),
                Interaction::new("u2", "a", InteractionAction::View),
                Interaction::new("u2", "b", InteractionAction::View),
            ],
        );
        assert!(matches!(
            factorize(&matrix, 50),
            LatentModel::Unavailable(EmptyReason::NumericalFailure(_))
        ));
    }

    #[test]
    fn products_bought_together_are_latent_neighbours() {
        let catalog = Catalog::new(vec![
            product("a", "Mango Pickle", "pickles", 100.0, 4.5, 5),
            product("b", "Lime Pickle", "pickles", 110.0, 4.3, 5),
            product("c", "Green Tea", "beverages", 50.0, 4.0, 5),
            product("d", "Masala Chai", "beverages", 60.0, 4.2, 5),
        ]);
        let mut interactions = Vec::new();
        for user in ["u1", "u2", "u3"] {
            interactions.push(Interaction::new(user, "a", InteractionAction::Purchase));
            interactions.push(Interaction::new(user, "b", InteractionAction::Purchase));
        }
        for user in ["u4", "u5", "u6"] {
            interactions.push(Interaction::new(user, "c", InteractionAction::Purchase));
            interactions.push(Interaction::new(user, "d", InteractionAction::Purchase));
        }
        let matrix = AffinityMatrix::build(&[], &interactions);
        let model = factorize(&matrix, 50);
        assert!(model.factors().is_some());

        let outcome = latent_factor_recommendations(&catalog, &matrix, &model, "a", 3, false);
        let ids: Vec<_> = outcome.candidates().iter().map(|c| c.product_id.as_str()).collect();

        assert_eq!(ids.first(), Some(&"b"));
        assert!(!ids.contains(&"a"));
        assert!(outcome.candidates().iter().all(|c| c.score.is_finite()));
    }
}
