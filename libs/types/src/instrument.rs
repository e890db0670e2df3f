//! Instrument definitions
//!
//! The margin-requirement model is polymorphic over `InstrumentKind`:
//! each kind supplies its own requirement formula via capability-keyed
//! dispatch in the engine, not an inheritance hierarchy.

use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionRight {
    /// Right to buy the underlying at the strike
    Call,
    /// Right to sell the underlying at the strike
    Put,
}

/// Instrument kind, tagged variant per kind of margin treatment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum InstrumentKind {
    /// Cash equity
    Equity,
    /// Listed option on an equity underlying
    Option {
        right: OptionRight,
        strike: Price,
        underlying: Symbol,
        /// Expiry as Unix nanoseconds
        expiry: i64,
    },
    /// Recognized but not margin-able by this engine; requirement
    /// computation fails with `UnsupportedInstrumentKind` rather than
    /// silently returning zero
    OtherDerivative,
}

/// Instrument definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    pub kind: InstrumentKind,
    /// Minimum tradable increment (1 share, 1 contract)
    pub lot_size: Quantity,
    /// Units of underlying per unit of quantity (100 for equity options)
    pub contract_multiplier: Decimal,
    /// Instrument-specific maintenance rate override; engine default
    /// applies when None
    pub maintenance_rate: Option<Decimal>,
}

impl Instrument {
    /// Create a new instrument
    ///
    /// # Panics
    /// Panics if lot_size is zero or contract_multiplier is not positive
    /// (invalid configuration is a programmer error)
    pub fn new(
        symbol: Symbol,
        kind: InstrumentKind,
        lot_size: Quantity,
        contract_multiplier: Decimal,
    ) -> Self {
        assert!(!lot_size.is_zero(), "lot_size must be positive");
        assert!(
            contract_multiplier > Decimal::ZERO,
            "contract_multiplier must be positive"
        );
        Self {
            symbol,
            kind,
            lot_size,
            contract_multiplier,
            maintenance_rate: None,
        }
    }

    /// Cash equity with lot size 1 and multiplier 1
    pub fn equity(symbol: impl Into<Symbol>) -> Self {
        Self::new(
            symbol.into(),
            InstrumentKind::Equity,
            Quantity::new(Decimal::ONE),
            Decimal::ONE,
        )
    }

    /// Listed equity option: whole contracts, multiplier 100
    pub fn option(
        symbol: impl Into<Symbol>,
        right: OptionRight,
        strike: Price,
        underlying: impl Into<Symbol>,
        expiry: i64,
    ) -> Self {
        Self::new(
            symbol.into(),
            InstrumentKind::Option {
                right,
                strike,
                underlying: underlying.into(),
                expiry,
            },
            Quantity::new(Decimal::ONE),
            Decimal::from(100),
        )
    }

    /// Set an instrument-specific maintenance rate
    pub fn with_maintenance_rate(mut self, rate: Decimal) -> Self {
        assert!(rate >= Decimal::ZERO, "maintenance_rate must be non-negative");
        self.maintenance_rate = Some(rate);
        self
    }

    pub fn is_option(&self) -> bool {
        matches!(self.kind, InstrumentKind::Option { .. })
    }

    /// Underlying symbol for derivatives, None for cash instruments
    pub fn underlying(&self) -> Option<&Symbol> {
        match &self.kind {
            InstrumentKind::Option { underlying, .. } => Some(underlying),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equity_defaults() {
        let instr = Instrument::equity("GOOG");
        assert_eq!(instr.kind, InstrumentKind::Equity);
        assert_eq!(instr.contract_multiplier, Decimal::ONE);
        assert!(!instr.is_option());
        assert!(instr.underlying().is_none());
    }

    #[test]
    fn test_option_defaults() {
        let instr = Instrument::option(
            "GOOG151224C00750000",
            OptionRight::Call,
            Price::from_u64(750),
            "GOOG",
            1_451_001_600_000_000_000,
        );
        assert!(instr.is_option());
        assert_eq!(instr.contract_multiplier, Decimal::from(100));
        assert_eq!(instr.underlying().unwrap().as_str(), "GOOG");
        assert_eq!(instr.lot_size.as_decimal(), Decimal::ONE);
    }

    #[test]
    #[should_panic(expected = "lot_size must be positive")]
    fn test_zero_lot_size_panics() {
        Instrument::new(
            Symbol::new("X"),
            InstrumentKind::Equity,
            Quantity::new(Decimal::ZERO),
            Decimal::ONE,
        );
    }

    #[test]
    #[should_panic(expected = "contract_multiplier must be positive")]
    fn test_zero_multiplier_panics() {
        Instrument::new(
            Symbol::new("X"),
            InstrumentKind::Equity,
            Quantity::new(Decimal::ONE),
            Decimal::ZERO,
        );
    }

    #[test]
    fn test_maintenance_rate_override() {
        let instr = Instrument::equity("GOOG")
            .with_maintenance_rate(Decimal::from_str_exact("0.4").unwrap());
        assert_eq!(
            instr.maintenance_rate,
            Some(Decimal::from_str_exact("0.4").unwrap())
        );
    }

    #[test]
    fn test_kind_serialization() {
        let instr = Instrument::option(
            "GOOG151224C00750000",
            OptionRight::Call,
            Price::from_u64(750),
            "GOOG",
            0,
        );
        let json = serde_json::to_string(&instr).unwrap();
        let back: Instrument = serde_json::from_str(&json).unwrap();
        assert_eq!(instr, back);
    }
}
