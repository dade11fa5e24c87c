use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionAction {
    View,
    AddToCart,
    AddToWishlist,
    Purchase,
}

impl InteractionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::AddToCart => "add_to_cart",
            Self::AddToWishlist => "add_to_wishlist",
            Self::Purchase => "purchase",
        }
    }

    /// Affinity contributed by one event of this kind.
    pub fn weight(self) -> f64 {
        let weights = crate::ranking::ACTION_WEIGHTS;
        match self {
            Self::View => weights.view,
            Self::AddToCart => weights.add_to_cart,
            Self::AddToWishlist => weights.add_to_wishlist,
            Self::Purchase => weights.purchase,
        }
    }
}

impl fmt::Display for InteractionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "add_to_cart" => Ok(Self::AddToCart),
            "add_to_wishlist" => Ok(Self::AddToWishlist),
            "purchase" => Ok(Self::Purchase),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}

/// One tracked user event. Append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub product_id: ProductId,
    pub action: InteractionAction,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

impl Interaction {
    pub fn new(
        user_id: impl Into<String>,
        product_id: impl Into<ProductId>,
        action: InteractionAction,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            product_id: product_id.into(),
            action,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::InteractionAction;
    use crate::errors::DomainError;

    #[test]
    fn actions_parse_case_insensitively() {
        assert_eq!("VIEW".parse::<InteractionAction>(), Ok(InteractionAction::View));
        assert_eq!(" add_to_cart ".parse::<InteractionAction>(), Ok(InteractionAction::AddToCart));
        assert_eq!(
            "bookmark".parse::<InteractionAction>(),
            Err(DomainError::UnknownAction("bookmark".to_string()))
        );
    }

    #[test]
    fn action_weights_rank_purchase_highest() {
        assert_eq!(InteractionAction::Purchase.weight(), 5.0);
        assert_eq!(InteractionAction::AddToCart.weight(), 3.0);
        assert_eq!(InteractionAction::AddToWishlist.weight(), 2.0);
        assert_eq!(InteractionAction::View.weight(), 1.0);
    }
}
