//! Portfolio margin aggregation
//!
//! Sums per-position requirements into a total maintenance requirement,
//! marks the portfolio to market, and derives the deficiency. Pure
//! aggregation: calling it twice on the same snapshot yields identical
//! state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use types::errors::RequirementError;
use types::ids::Symbol;
use types::numeric::Price;
use types::portfolio::PortfolioSnapshot;
use types::position::Position;

use crate::providers::MarkPriceSource;
use crate::requirement::{
    self, MarginRequirement, RequirementParams, RiskDirection,
};

/// How to treat a position whose requirement cannot be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionPolicy {
    /// Charge the position's full notional as maintenance requirement.
    /// The conservative default: an unevaluable position can trigger a
    /// call but never hides one.
    MaximallyRisky,
    /// Skip the position from the requirement sum and surface it on
    /// the margin state for the caller to act on.
    Flag,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        ExclusionPolicy::MaximallyRisky
    }
}

/// A position whose requirement computation failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedPosition {
    pub symbol: Symbol,
    pub error: RequirementError,
}

/// Aggregate margin state of a portfolio at one tick
///
/// Invariant: `deficiency == max(0, total_maintenance - total_value)`.
/// Recomputed from the snapshot on every tick, never mutated directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMarginState {
    pub total_maintenance: Decimal,
    /// Cash plus signed mark-to-market value of all positions
    pub total_value: Decimal,
    /// `max(0, total_maintenance - total_value)`; > 0 signals a call
    pub deficiency: Decimal,
    pub requirements: Vec<MarginRequirement>,
    pub excluded: Vec<ExcludedPosition>,
    pub computed_at: i64,
}

impl PortfolioMarginState {
    /// Strict comparison: a deficiency of exactly zero is NOT a call
    pub fn is_margin_call(&self) -> bool {
        self.deficiency > Decimal::ZERO
    }
}

/// Evaluate the portfolio's aggregate margin state.
///
/// Iterates all open positions, invokes the requirement model per
/// instrument kind, and folds per-position failures in according to
/// `policy`. No side effects; idempotent on an unchanged snapshot.
pub fn evaluate(
    snapshot: &PortfolioSnapshot,
    marks: &dyn MarkPriceSource,
    params: &RequirementParams,
    policy: ExclusionPolicy,
    now: i64,
) -> PortfolioMarginState {
    let mut total_maintenance = Decimal::ZERO;
    let mut total_value = snapshot.cash;
    let mut requirements = Vec::with_capacity(snapshot.positions.len());
    let mut excluded = Vec::new();

    for position in &snapshot.positions {
        total_value += position.market_value(value_mark(position, marks));

        match requirement::requirement(position, marks, params, now) {
            Ok(req) => {
                total_maintenance += req.maintenance;
                requirements.push(req);
            }
            Err(error) => match policy {
                ExclusionPolicy::MaximallyRisky => {
                    let req = maximally_risky_requirement(position, marks, now);
                    warn!(
                        symbol = %position.instrument.symbol,
                        %error,
                        maintenance = %req.maintenance,
                        "requirement failed, charging full notional"
                    );
                    total_maintenance += req.maintenance;
                    requirements.push(req);
                }
                ExclusionPolicy::Flag => {
                    warn!(
                        symbol = %position.instrument.symbol,
                        %error,
                        "requirement failed, position excluded from requirement sum"
                    );
                    excluded.push(ExcludedPosition {
                        symbol: position.instrument.symbol.clone(),
                        error,
                    });
                }
            },
        }
    }

    let deficiency = (total_maintenance - total_value).max(Decimal::ZERO);

    PortfolioMarginState {
        total_maintenance,
        total_value,
        deficiency,
        requirements,
        excluded,
        computed_at: now,
    }
}

/// Best available mark for valuation: live quote, else last known,
/// else cost basis. Valuation always has an answer; only requirement
/// computation is allowed to fail.
pub(crate) fn value_mark(position: &Position, marks: &dyn MarkPriceSource) -> Price {
    marks
        .current_mark(&position.instrument.symbol)
        .or(position.last_mark)
        .unwrap_or(position.avg_cost)
}

/// Full-notional requirement for a position the model cannot evaluate
fn maximally_risky_requirement(
    position: &Position,
    marks: &dyn MarkPriceSource,
    now: i64,
) -> MarginRequirement {
    let mark = value_mark(position, marks);
    let notional = requirement::round_up(
        position.abs_quantity() * mark.as_decimal() * position.instrument.contract_multiplier,
    );
    MarginRequirement {
        position_id: position.position_id,
        symbol: position.instrument.symbol.clone(),
        maintenance: notional,
        initial: notional,
        direction: if position.is_short() {
            RiskDirection::Short
        } else {
            RiskDirection::Long
        },
        computed_at: now,
        used_stale_mark: true,
    }
}
