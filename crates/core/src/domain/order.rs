use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

/// Order statuses that count as a real purchase signal.
pub const QUALIFYING_ORDER_STATUSES: [&str; 3] = ["delivered", "processing", "confirmed"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub product_ids: Vec<ProductId>,
}

impl OrderRecord {
    pub fn is_qualifying(&self) -> bool {
        is_qualifying_status(&self.status)
    }
}

pub fn is_qualifying_status(status: &str) -> bool {
    QUALIFYING_ORDER_STATUSES.iter().any(|candidate| candidate.eq_ignore_ascii_case(status))
}

/// Raw signal counts behind a product's popularity score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityCounts {
    pub qualifying_orders: u64,
    pub cart_adds: u64,
    pub views: u64,
}

impl PopularityCounts {
    pub fn score(&self) -> f64 {
        5.0 * self.qualifying_orders as f64 + 2.0 * self.cart_adds as f64 + 0.5 * self.views as f64
    }
}
