//! Liquidation selection
//!
//! Given a margin deficiency and the margin-consuming positions,
//! deterministically orders candidates and sizes the closing trades.
//! Greedy by design: determinism and speed over global optimality.
//!
//! Ordering: margin released per unit of notional, descending; ties
//! broken by symbol lexical order. A position is always fully closed
//! before the next one is partially closed, so liquidation never
//! leaves a trail of small residual positions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use types::ids::Symbol;
use types::position::Position;

use crate::aggregator::value_mark;
use crate::providers::MarkPriceSource;
use crate::requirement::MarginRequirement;

/// A proposed closing trade
///
/// Ephemeral: produced and consumed within one orchestration cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationCandidate {
    pub symbol: Symbol,
    /// Signed closing quantity (buy-to-cover positive, sell-to-close
    /// negative). Magnitude never exceeds the held quantity.
    pub close_quantity: Decimal,
    /// Maintenance margin freed by this close
    pub released_margin: Decimal,
    /// Margin freed per unit of notional (the ranking key)
    pub priority: Decimal,
}

/// The selector's output for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionPlan {
    pub candidates: Vec<LiquidationCandidate>,
    /// True when every candidate was consumed and a deficiency remains
    pub insufficient_liquidatable_margin: bool,
    /// Deficiency remaining after the whole plan executes (>= 0)
    pub projected_deficiency: Decimal,
}

impl SelectionPlan {
    fn empty(deficiency: Decimal) -> Self {
        Self {
            candidates: Vec::new(),
            insufficient_liquidatable_margin: deficiency > Decimal::ZERO,
            projected_deficiency: deficiency.max(Decimal::ZERO),
        }
    }
}

/// Select the closing trades that eliminate `deficiency`.
///
/// Only margin-consuming positions (maintenance > 0) are candidates.
/// Partial closes are rounded UP to the instrument's lot size and
/// capped at the held quantity, so a closing order can never flip a
/// position's sign through zero.
pub fn select(
    deficiency: Decimal,
    positions: &[Position],
    requirements: &[MarginRequirement],
    marks: &dyn MarkPriceSource,
) -> SelectionPlan {
    if deficiency <= Decimal::ZERO {
        return SelectionPlan::empty(Decimal::ZERO);
    }

    let mut ranked: Vec<(&Position, &MarginRequirement, Decimal)> = requirements
        .iter()
        .filter(|req| req.maintenance > Decimal::ZERO)
        .filter_map(|req| {
            // Pair by position identity: a snapshot may hold several
            // positions in the same symbol
            positions
                .iter()
                .find(|pos| pos.position_id == req.position_id)
                .map(|pos| {
                    let notional = pos.abs_quantity()
                        * value_mark(pos, marks).as_decimal()
                        * pos.instrument.contract_multiplier;
                    (pos, req, req.maintenance / notional)
                })
        })
        .collect();

    if ranked.is_empty() {
        return SelectionPlan::empty(deficiency);
    }

    ranked.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.symbol.cmp(&b.1.symbol)));

    let mut remaining = deficiency;
    let mut candidates = Vec::new();

    for (position, requirement, priority) in ranked {
        let held = position.abs_quantity();
        let margin_per_unit = requirement.maintenance / held;

        let (close_magnitude, released) = if requirement.maintenance <= remaining {
            // Full close
            (held, requirement.maintenance)
        } else {
            let lot = position.instrument.lot_size.as_decimal();
            let raw_units = remaining / margin_per_unit;
            let rounded = (raw_units / lot).ceil() * lot;
            let capped = rounded.min(held);
            (capped, margin_per_unit * capped)
        };

        // Closing trade has the opposite sign of the position
        let close_quantity = if position.is_short() {
            close_magnitude
        } else {
            -close_magnitude
        };

        candidates.push(LiquidationCandidate {
            symbol: requirement.symbol.clone(),
            close_quantity,
            released_margin: released,
            priority,
        });

        remaining -= released;
        if remaining <= Decimal::ZERO {
            break;
        }
    }

    SelectionPlan {
        candidates,
        insufficient_liquidatable_margin: remaining > Decimal::ZERO,
        projected_deficiency: remaining.max(Decimal::ZERO),
    }
}
