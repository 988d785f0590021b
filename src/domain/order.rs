//! Order command types (§3 "Order Command").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Directional intent of an order command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LongEntry,
    LongExit,
    ShortEntry,
    ShortExit,
}

impl Direction {
    /// `true` for entries (open a position), `false` for exits (close one).
    pub fn is_entry(self) -> bool {
        matches!(self, Direction::LongEntry | Direction::ShortEntry)
    }

    /// Net position sign an exit of this direction expects to find
    /// (positive = long, negative = short). Entries have no matching sign.
    pub fn expected_position_sign(self) -> Option<i8> {
        match self {
            Direction::LongExit => Some(1),
            Direction::ShortExit => Some(-1),
            Direction::LongEntry | Direction::ShortEntry => None,
        }
    }

    /// Upstream side (buy/sell) this direction resolves to.
    pub fn upstream_side(self) -> UpstreamSide {
        match self {
            Direction::LongEntry | Direction::ShortExit => UpstreamSide::Buy,
            Direction::ShortEntry | Direction::LongExit => UpstreamSide::Sell,
        }
    }
}

/// The side the upstream brokerage API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamSide {
    Buy,
    Sell,
}

/// Market vs. limit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    Market,
    Limit,
}

impl Default for PriceType {
    /// "Price-type defaults to market" (§4.D).
    fn default() -> Self {
        PriceType::Market
    }
}

/// Time-in-force / order lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Day,
    FillOrKill,
    ImmediateOrCancel,
}

/// A `place_order` payload, as received from the facade (§3).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OrderCommand {
    pub direction: Direction,
    pub symbol: String,
    pub quantity: u32,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub price_type: PriceType,
    pub order_kind: OrderKind,
}

/// Errors that make an `OrderCommand` invalid before it ever reaches the
/// worker — caught at validation time (§7 "Validation").
#[derive(Debug, thiserror::Error)]
pub enum OrderValidationError {
    #[error("quantity must be at least 1, got {0}")]
    NonPositiveQuantity(u32),
    #[error("limit orders require a positive price")]
    LimitRequiresPrice,
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl OrderCommand {
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.quantity < 1 {
            return Err(OrderValidationError::NonPositiveQuantity(self.quantity));
        }
        if self.price_type == PriceType::Limit {
            match self.price {
                Some(p) if p > Decimal::ZERO => {}
                _ => return Err(OrderValidationError::LimitRequiresPrice),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_directions_have_no_expected_sign() {
        assert_eq!(Direction::LongEntry.expected_position_sign(), None);
        assert_eq!(Direction::ShortEntry.expected_position_sign(), None);
    }

    #[test]
    fn exit_directions_resolve_expected_sign() {
        assert_eq!(Direction::LongExit.expected_position_sign(), Some(1));
        assert_eq!(Direction::ShortExit.expected_position_sign(), Some(-1));
    }

    #[test]
    fn omitted_price_type_defaults_to_market() {
        let json = r#"{
            "direction": "long_entry",
            "symbol": "TMFR1",
            "quantity": 1,
            "price": null,
            "order_kind": "day"
        }"#;
        let cmd: OrderCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.price_type, PriceType::Market);
    }

    #[test]
    fn upstream_side_mapping() {
        assert_eq!(Direction::LongEntry.upstream_side(), UpstreamSide::Buy);
        assert_eq!(Direction::ShortExit.upstream_side(), UpstreamSide::Buy);
        assert_eq!(Direction::ShortEntry.upstream_side(), UpstreamSide::Sell);
        assert_eq!(Direction::LongExit.upstream_side(), UpstreamSide::Sell);
    }

    #[test]
    fn limit_without_price_rejected() {
        let cmd = OrderCommand {
            direction: Direction::LongEntry,
            symbol: "TMFR1".into(),
            quantity: 1,
            price: None,
            price_type: PriceType::Limit,
            order_kind: OrderKind::Day,
        };
        assert!(matches!(
            cmd.validate(),
            Err(OrderValidationError::LimitRequiresPrice)
        ));
    }

    #[test]
    fn zero_quantity_rejected() {
        let cmd = OrderCommand {
            direction: Direction::LongEntry,
            symbol: "TMFR1".into(),
            quantity: 0,
            price: None,
            price_type: PriceType::Market,
            order_kind: OrderKind::Day,
        };
        assert!(matches!(
            cmd.validate(),
            Err(OrderValidationError::NonPositiveQuantity(0))
        ));
    }
}
