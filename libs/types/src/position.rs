//! Position tracking types
//!
//! A position's quantity is signed: positive = long, negative = short.
//! Positions are owned by the portfolio and mutated only by fill
//! events; the margin engine reads them through immutable snapshots.

use crate::instrument::Instrument;
use crate::numeric::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An open position in a margin-able instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: Uuid,
    pub instrument: Instrument,
    /// Signed quantity: positive = long, negative = short
    pub quantity: Decimal,
    /// Average cost basis per unit
    pub avg_cost: Price,
    /// Most recent observed mark; fallback when the live quote is
    /// missing (stale-data policy)
    pub last_mark: Option<Price>,
    pub opened_at: i64,
    pub updated_at: i64,
    pub version: u64,
}

impl Position {
    /// Create a new position
    ///
    /// # Panics
    /// Panics if quantity is zero (a flat position does not exist)
    pub fn new(
        instrument: Instrument,
        quantity: Decimal,
        avg_cost: Price,
        timestamp: i64,
    ) -> Self {
        assert!(quantity != Decimal::ZERO, "Position quantity must be non-zero");
        Self {
            position_id: Uuid::now_v7(),
            instrument,
            quantity,
            avg_cost,
            last_mark: None,
            opened_at: timestamp,
            updated_at: timestamp,
            version: 0,
        }
    }

    pub fn is_short(&self) -> bool {
        self.quantity < Decimal::ZERO
    }

    /// Magnitude of the held quantity
    pub fn abs_quantity(&self) -> Decimal {
        self.quantity.abs()
    }

    /// Record a new observed mark price
    pub fn update_mark(&mut self, mark: Price, timestamp: i64) {
        self.last_mark = Some(mark);
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Apply a signed fill to the position
    ///
    /// A closing fill's magnitude is capped upstream at the current
    /// position size; a fill that would flip the sign past zero is a
    /// programmer error.
    ///
    /// # Panics
    /// Panics if the fill flips the position sign through zero
    pub fn apply_fill(&mut self, fill_quantity: Decimal, timestamp: i64) {
        let new_quantity = self.quantity + fill_quantity;
        assert!(
            new_quantity == Decimal::ZERO
                || new_quantity.is_sign_positive() == self.quantity.is_sign_positive(),
            "Fill must not flip position sign through zero"
        );
        self.quantity = new_quantity;
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Signed mark-to-market value: `quantity × mark × multiplier`
    ///
    /// Long positions add value; short positions contribute negative
    /// value equal to the cost to buy back.
    pub fn market_value(&self, mark: Price) -> Decimal {
        self.quantity * mark.as_decimal() * self.instrument.contract_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::OptionRight;

    fn short_call(qty: i64) -> Position {
        let instr = Instrument::option(
            "GOOG151224C00750000",
            OptionRight::Call,
            Price::from_u64(750),
            "GOOG",
            1_451_001_600_000_000_000,
        );
        Position::new(
            instr,
            Decimal::from(qty),
            Price::from_str("9.5").unwrap(),
            1_450_828_800_000_000_000,
        )
    }

    #[test]
    fn test_short_position_sign() {
        let pos = short_call(-10);
        assert!(pos.is_short());
        assert_eq!(pos.abs_quantity(), Decimal::from(10));
    }

    #[test]
    #[should_panic(expected = "Position quantity must be non-zero")]
    fn test_flat_position_rejected() {
        let instr = Instrument::equity("GOOG");
        Position::new(instr, Decimal::ZERO, Price::from_u64(750), 0);
    }

    #[test]
    fn test_market_value_short_is_negative() {
        let pos = short_call(-10);
        // -10 × 12 × 100 = -12000 (buy-back liability)
        let value = pos.market_value(Price::from_u64(12));
        assert_eq!(value, Decimal::from(-12_000));
    }

    #[test]
    fn test_market_value_long_equity() {
        let pos = Position::new(
            Instrument::equity("GOOG"),
            Decimal::from(100),
            Price::from_u64(700),
            0,
        );
        assert_eq!(pos.market_value(Price::from_u64(750)), Decimal::from(75_000));
    }

    #[test]
    fn test_update_mark_bumps_version() {
        let mut pos = short_call(-10);
        assert_eq!(pos.last_mark, None);
        pos.update_mark(Price::from_u64(11), 1);
        assert_eq!(pos.last_mark, Some(Price::from_u64(11)));
        assert_eq!(pos.version, 1);
    }

    #[test]
    fn test_apply_closing_fill() {
        let mut pos = short_call(-10);
        // Buy-to-cover 4 contracts
        pos.apply_fill(Decimal::from(4), 2);
        assert_eq!(pos.quantity, Decimal::from(-6));
    }

    #[test]
    fn test_apply_fill_to_flat() {
        let mut pos = short_call(-10);
        pos.apply_fill(Decimal::from(10), 2);
        assert_eq!(pos.quantity, Decimal::ZERO);
    }

    #[test]
    #[should_panic(expected = "Fill must not flip position sign")]
    fn test_fill_through_zero_panics() {
        let mut pos = short_call(-10);
        pos.apply_fill(Decimal::from(11), 2);
    }
}
