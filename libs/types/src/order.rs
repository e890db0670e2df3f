//! Liquidating order types
//!
//! The orchestrator submits closing orders through the order-management
//! collaborator; these types define the shape of that submission and
//! its record in the emitted margin-call event.

use crate::ids::{OrderId, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order type used for liquidations
///
/// Market by default; configurable on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
}

impl Default for OrderType {
    fn default() -> Self {
        OrderType::Market
    }
}

/// A liquidating order accepted by the order-management collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationOrder {
    pub order_id: OrderId,
    pub symbol: Symbol,
    /// Signed closing quantity: buy-to-cover is positive, sell-to-close
    /// is negative. Magnitude never exceeds the held position size.
    pub quantity: Decimal,
    pub order_type: OrderType,
    pub submitted_at: i64,
}

impl LiquidationOrder {
    pub fn new(
        order_id: OrderId,
        symbol: Symbol,
        quantity: Decimal,
        order_type: OrderType,
        submitted_at: i64,
    ) -> Self {
        assert!(quantity != Decimal::ZERO, "Liquidation quantity must be non-zero");
        Self {
            order_id,
            symbol,
            quantity,
            order_type,
            submitted_at,
        }
    }

    /// Whether this order reduces a short position
    pub fn is_buy_to_cover(&self) -> bool {
        self.quantity > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_to_cover() {
        let order = LiquidationOrder::new(
            OrderId::new(),
            Symbol::new("GOOG151224C00750000"),
            Decimal::from(10),
            OrderType::Market,
            0,
        );
        assert!(order.is_buy_to_cover());
    }

    #[test]
    fn test_sell_to_close() {
        let order = LiquidationOrder::new(
            OrderId::new(),
            Symbol::new("GOOG"),
            Decimal::from(-100),
            OrderType::default(),
            0,
        );
        assert!(!order.is_buy_to_cover());
    }

    #[test]
    #[should_panic(expected = "Liquidation quantity must be non-zero")]
    fn test_zero_quantity_rejected() {
        LiquidationOrder::new(
            OrderId::new(),
            Symbol::new("GOOG"),
            Decimal::ZERO,
            OrderType::Market,
            0,
        );
    }
}
