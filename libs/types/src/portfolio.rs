//! Portfolio snapshot types
//!
//! The engine never reads ambient shared state: each evaluation tick
//! receives an explicit, read-only snapshot of cash and open positions
//! so that the state observed at requirement-computation time is the
//! state at order-submission time.

use crate::ids::PortfolioId;
use crate::position::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only view of a portfolio at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub portfolio_id: PortfolioId,
    /// Settled cash balance
    pub cash: Decimal,
    /// All open positions (zero-quantity positions are not
    /// representable; see `Position::new`)
    pub positions: Vec<Position>,
    /// Snapshot time, Unix nanoseconds
    pub as_of: i64,
}

impl PortfolioSnapshot {
    pub fn new(portfolio_id: PortfolioId, cash: Decimal, as_of: i64) -> Self {
        Self {
            portfolio_id,
            cash,
            positions: Vec::new(),
            as_of,
        }
    }

    pub fn with_positions(mut self, positions: Vec<Position>) -> Self {
        self.positions = positions;
        self
    }

    pub fn is_invested(&self) -> bool {
        !self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use crate::numeric::Price;

    #[test]
    fn test_empty_snapshot() {
        let snap = PortfolioSnapshot::new(PortfolioId::new(), Decimal::from(160_000), 0);
        assert!(!snap.is_invested());
        assert_eq!(snap.cash, Decimal::from(160_000));
    }

    #[test]
    fn test_snapshot_with_positions() {
        let pos = Position::new(
            Instrument::equity("GOOG"),
            Decimal::from(100),
            Price::from_u64(700),
            0,
        );
        let snap = PortfolioSnapshot::new(PortfolioId::new(), Decimal::from(10_000), 0)
            .with_positions(vec![pos]);
        assert!(snap.is_invested());
        assert_eq!(snap.positions.len(), 1);
    }
}
