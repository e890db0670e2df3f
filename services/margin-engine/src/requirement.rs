//! Margin requirement model
//!
//! Pure per-instrument requirement functions, dispatched on
//! `InstrumentKind`. All amounts round UP (favor safety). The
//! short-option formula is a regulatory-style
//! percentage-of-underlying-minus-OTM model with a per-contract floor;
//! the constants live in `RequirementParams` and the choice is
//! recorded in DESIGN.md.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use types::errors::RequirementError;
use types::ids::Symbol;
use types::instrument::{InstrumentKind, OptionRight};
use types::numeric::Price;
use types::position::Position;

use crate::providers::MarkPriceSource;

/// Which direction of market move hurts this position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskDirection {
    /// Loses when the market falls
    Long,
    /// Loses when the market rises
    Short,
}

/// Per-position margin requirement
///
/// Derived on every evaluation tick; never persisted across ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginRequirement {
    /// The exact position this requirement was computed for; symbols
    /// are not unique within a snapshot
    pub position_id: Uuid,
    pub symbol: Symbol,
    /// Maintenance requirement, always >= 0
    pub maintenance: Decimal,
    /// Initial requirement, >= maintenance
    pub initial: Decimal,
    pub direction: RiskDirection,
    pub computed_at: i64,
    /// True when the live quote was missing and the last known mark
    /// was used instead
    pub used_stale_mark: bool,
}

/// Requirement model constants
///
/// | Parameter          | Default | Meaning                                  |
/// |--------------------|---------|------------------------------------------|
/// | equity_long_rate   | 0.25    | maintenance rate, long equity            |
/// | equity_short_rate  | 0.30    | maintenance rate, short equity           |
/// | option_base_rate   | 0.20    | pct of underlying for short options      |
/// | option_floor_rate  | 0.10    | per-contract floor for short options     |
/// | initial_multiplier | 1.5     | initial = maintenance × multiplier       |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementParams {
    pub equity_long_rate: Decimal,
    pub equity_short_rate: Decimal,
    pub option_base_rate: Decimal,
    pub option_floor_rate: Decimal,
    pub initial_multiplier: Decimal,
}

impl Default for RequirementParams {
    fn default() -> Self {
        Self {
            equity_long_rate: Decimal::from_str_exact("0.25").unwrap(),
            equity_short_rate: Decimal::from_str_exact("0.30").unwrap(),
            option_base_rate: Decimal::from_str_exact("0.20").unwrap(),
            option_floor_rate: Decimal::from_str_exact("0.10").unwrap(),
            initial_multiplier: Decimal::from_str_exact("1.5").unwrap(),
        }
    }
}

/// Compute the margin requirement for one position.
///
/// Pure function of the position snapshot and current market state.
/// Missing instrument quotes fall back to the position's last known
/// mark (flagged `used_stale_mark`); a missing underlying quote has no
/// fallback and fails with `StaleOrMissingMarketData`.
pub fn requirement(
    position: &Position,
    marks: &dyn MarkPriceSource,
    params: &RequirementParams,
    now: i64,
) -> Result<MarginRequirement, RequirementError> {
    match &position.instrument.kind {
        InstrumentKind::Equity => equity_requirement(position, marks, params, now),
        InstrumentKind::Option { right, strike, underlying, .. } => {
            option_requirement(position, *right, *strike, underlying, marks, params, now)
        }
        InstrumentKind::OtherDerivative => {
            Err(RequirementError::UnsupportedInstrumentKind {
                symbol: position.instrument.symbol.to_string(),
                kind: "OtherDerivative".to_string(),
            })
        }
    }
}

fn equity_requirement(
    position: &Position,
    marks: &dyn MarkPriceSource,
    params: &RequirementParams,
    now: i64,
) -> Result<MarginRequirement, RequirementError> {
    let (mark, stale) = resolve_mark(position, marks)?;
    let direction = direction_of(position);
    let rate = position.instrument.maintenance_rate.unwrap_or(match direction {
        RiskDirection::Long => params.equity_long_rate,
        RiskDirection::Short => params.equity_short_rate,
    });
    let notional =
        position.abs_quantity() * mark.as_decimal() * position.instrument.contract_multiplier;
    let maintenance = round_up(notional * rate);

    Ok(MarginRequirement {
        position_id: position.position_id,
        symbol: position.instrument.symbol.clone(),
        maintenance,
        initial: round_up(maintenance * params.initial_multiplier),
        direction,
        computed_at: now,
        used_stale_mark: stale,
    })
}

fn option_requirement(
    position: &Position,
    right: OptionRight,
    strike: Price,
    underlying: &Symbol,
    marks: &dyn MarkPriceSource,
    params: &RequirementParams,
    now: i64,
) -> Result<MarginRequirement, RequirementError> {
    let (option_mark, stale) = resolve_mark(position, marks)?;
    let multiplier = position.instrument.contract_multiplier;
    let contracts = position.abs_quantity();

    if !position.is_short() {
        // Long options are paid in full: no maintenance requirement,
        // initial requirement is the full premium.
        let premium = round_up(contracts * option_mark.as_decimal() * multiplier);
        return Ok(MarginRequirement {
            position_id: position.position_id,
            symbol: position.instrument.symbol.clone(),
            maintenance: Decimal::ZERO,
            initial: premium,
            direction: RiskDirection::Long,
            computed_at: now,
            used_stale_mark: stale,
        });
    }

    // Short option: premium + max(base% of underlying − OTM amount, floor).
    // No last-known fallback exists for the underlying quote.
    let underlying_mark = marks.current_mark(underlying).ok_or_else(|| {
        RequirementError::StaleOrMissingMarketData {
            symbol: underlying.to_string(),
        }
    })?;

    let u = underlying_mark.as_decimal();
    let k = strike.as_decimal();
    let otm_amount = match right {
        OptionRight::Call => (k - u).max(Decimal::ZERO),
        OptionRight::Put => (u - k).max(Decimal::ZERO),
    };
    let floor_base = match right {
        OptionRight::Call => u,
        OptionRight::Put => k,
    };

    let premium = option_mark.as_decimal() * multiplier;
    let otm_component =
        (params.option_base_rate * u - otm_amount).max(Decimal::ZERO) * multiplier;
    let floor_component = params.option_floor_rate * floor_base * multiplier;
    let per_contract = premium + otm_component.max(floor_component);
    let maintenance = round_up(contracts * per_contract);

    Ok(MarginRequirement {
        position_id: position.position_id,
        symbol: position.instrument.symbol.clone(),
        maintenance,
        initial: round_up(maintenance * params.initial_multiplier),
        direction: RiskDirection::Short,
        computed_at: now,
        used_stale_mark: stale,
    })
}

fn direction_of(position: &Position) -> RiskDirection {
    if position.is_short() {
        RiskDirection::Short
    } else {
        RiskDirection::Long
    }
}

/// Resolve the instrument's own mark: live quote, else last known
/// (flagged stale), else fail.
pub(crate) fn resolve_mark(
    position: &Position,
    marks: &dyn MarkPriceSource,
) -> Result<(Price, bool), RequirementError> {
    let symbol = &position.instrument.symbol;
    if let Some(mark) = marks.current_mark(symbol) {
        return Ok((mark, false));
    }
    if let Some(last) = position.last_mark {
        warn!(%symbol, %last, "no current quote, using last known mark");
        return Ok((last, true));
    }
    Err(RequirementError::StaleOrMissingMarketData {
        symbol: symbol.to_string(),
    })
}

/// Round UP to 2 decimal places (favor safety for margin amounts)
pub(crate) fn round_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::AwayFromZero)
}
