//! User × product affinity built from orders and tracked interactions.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use ndarray::Array2;

use crate::domain::interaction::Interaction;
use crate::domain::order::OrderRecord;
use crate::domain::product::ProductId;
use crate::ranking::ACTION_WEIGHTS;

/// Sparse affinity matrix. Users and products are indexed in sorted id order, so two
/// builds over the same data produce identical layouts. Absent pairs have zero affinity.
#[derive(Debug, Clone, Default)]
pub struct AffinityMatrix {
    users: Vec<String>,
    products: Vec<ProductId>,
    product_index: HashMap<ProductId, usize>,
    rows: Vec<Vec<(usize, f64)>>,
    columns: Vec<Vec<(usize, f64)>>,
}

impl AffinityMatrix {
    /// Sums weighted contributions per (user, product). Non-qualifying orders are ignored.
    pub fn build(orders: &[OrderRecord], interactions: &[Interaction]) -> Self {
        let mut totals: BTreeMap<(&str, &ProductId), f64> = BTreeMap::new();

        for order in orders.iter().filter(|order| order.is_qualifying()) {
            for product_id in &order.product_ids {
                *totals.entry((order.user_id.as_str(), product_id)).or_insert(0.0) +=
                    ACTION_WEIGHTS.order_item;
            }
        }
        for interaction in interactions {
            *totals.entry((interaction.user_id.as_str(), &interaction.product_id)).or_insert(0.0) +=
                interaction.action.weight();
        }

        let users: Vec<String> = totals
            .keys()
            .map(|(user, _)| *user)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let products: Vec<ProductId> = totals
            .keys()
            .map(|(_, product)| *product)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();

        let user_index: HashMap<&str, usize> =
            users.iter().enumerate().map(|(row, user)| (user.as_str(), row)).collect();
        let product_index: HashMap<ProductId, usize> =
            products.iter().enumerate().map(|(column, id)| (id.clone(), column)).collect();

        let mut rows = vec![Vec::new(); users.len()];
        let mut columns = vec![Vec::new(); products.len()];
        for ((user, product), value) in &totals {
            let row = user_index[user];
            let column = product_index[*product];
            rows[row].push((column, *value));
            columns[column].push((row, *value));
        }
        for row in &mut rows {
            row.sort_by_key(|(column, _)| *column);
        }

        Self { users, products, product_index, rows, columns }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() || self.products.is_empty()
    }

    /// `(users, products)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.users.len(), self.products.len())
    }

    pub fn column_of(&self, product_id: &str) -> Option<usize> {
        self.product_index.get(product_id).copied()
    }

    pub fn product_at(&self, column: usize) -> Option<&ProductId> {
        self.products.get(column)
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    /// Non-zero `(product column, affinity)` pairs of one user, in column order.
    pub fn row(&self, row: usize) -> &[(usize, f64)] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-zero `(user row, affinity)` pairs of one product, in row order.
    pub fn column(&self, column: usize) -> &[(usize, f64)] {
        self.columns.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.row(row)
            .binary_search_by_key(&column, |(candidate, _)| *candidate)
            .map(|position| self.rows[row][position].1)
            .unwrap_or(0.0)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros(self.shape());
        for (row, entries) in self.rows.iter().enumerate() {
            for (column, value) in entries {
                dense[[row, *column]] = *value;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::AffinityMatrix;
    use crate::domain::interaction::{Interaction, InteractionAction};
    use crate::domain::order::OrderRecord;
    use crate::domain::product::ProductId;

    fn order(user: &str, status: &str, products: &[&str]) -> OrderRecord {
        OrderRecord {
            id: format!("{user}-{status}"),
            user_id: user.to_string(),
            status: status.to_string(),
            product_ids: products.iter().map(|id| ProductId::from(*id)).collect(),
        }
    }

    #[test]
    fn sums_orders_and_weighted_interactions_per_pair() {
        let matrix = AffinityMatrix::build(
            &[order("u2", "delivered", &["p1", "p2"]), order("u1", "cancelled", &["p3"])],
            &[
                Interaction::new("u2", "p1", InteractionAction::View),
                Interaction::new("u1", "p2", InteractionAction::AddToCart),
                Interaction::new("u1", "p2", InteractionAction::AddToWishlist),
            ],
        );

        assert_eq!(matrix.shape(), (2, 2), "cancelled order contributes nothing");
        assert_eq!(matrix.users(), ["u1".to_string(), "u2".to_string()]);
        let p1 = matrix.column_of("p1").expect("p1 column");
        let p2 = matrix.column_of("p2").expect("p2 column");
        assert!((matrix.get(1, p1) - 6.0).abs() < 1e-9);
        assert!((matrix.get(0, p2) - 5.0).abs() < 1e-9);
        assert_eq!(matrix.get(0, p1), 0.0);
        assert_eq!(matrix.column(p2).len(), 2);
    }

    #[test]
    fn empty_inputs_produce_empty_matrix() {
        let matrix = AffinityMatrix::build(&[], &[]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.shape(), (0, 0));
        assert_eq!(matrix.to_dense().len(), 0);
    }
}
