//! External collaborator interfaces
//!
//! The engine consumes market data, submits liquidating orders, and
//! emits events through these traits. Production wiring binds them to
//! the data feed and the order-management service; the in-memory
//! implementations here back deterministic backtests and tests.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use types::errors::SubmissionError;
use types::ids::{OrderId, Symbol};
use types::numeric::Price;
use types::order::{LiquidationOrder, OrderType};

/// Current-mark provider
///
/// `None` means no current quote is available; the engine applies its
/// stale-data policy rather than treating the position as free.
pub trait MarkPriceSource {
    fn current_mark(&self, symbol: &Symbol) -> Option<Price>;
}

/// Order-management collaborator
///
/// Submission is fire-and-forget from the engine's point of view: a
/// rejected order is recorded and the cycle continues with the
/// remaining candidates.
pub trait OrderSubmitter {
    fn submit_order(
        &mut self,
        symbol: &Symbol,
        quantity: Decimal,
        order_type: OrderType,
    ) -> Result<OrderId, SubmissionError>;
}

/// Fixed mark table for backtests and tests
///
/// BTreeMap keeps iteration deterministic.
#[derive(Debug, Clone, Default)]
pub struct StaticMarks {
    marks: BTreeMap<Symbol, Price>,
}

impl StaticMarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, symbol: impl Into<Symbol>, price: Price) {
        self.marks.insert(symbol.into(), price);
    }

    pub fn remove(&mut self, symbol: &Symbol) {
        self.marks.remove(symbol);
    }
}

impl MarkPriceSource for StaticMarks {
    fn current_mark(&self, symbol: &Symbol) -> Option<Price> {
        self.marks.get(symbol).copied()
    }
}

/// Recording order-management double
///
/// Accepts every order unless the symbol has been programmed to fail.
/// Submission timestamps are a monotonic counter so recorded order
/// sequences are reproducible.
#[derive(Debug, Default)]
pub struct RecordingSubmitter {
    pub submitted: Vec<LiquidationOrder>,
    fail_symbols: BTreeSet<Symbol>,
    clock: i64,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program every submission for `symbol` to be rejected
    pub fn fail_symbol(&mut self, symbol: impl Into<Symbol>) {
        self.fail_symbols.insert(symbol.into());
    }

    pub fn order_count(&self) -> usize {
        self.submitted.len()
    }
}

impl OrderSubmitter for RecordingSubmitter {
    fn submit_order(
        &mut self,
        symbol: &Symbol,
        quantity: Decimal,
        order_type: OrderType,
    ) -> Result<OrderId, SubmissionError> {
        if self.fail_symbols.contains(symbol) {
            return Err(SubmissionError::new(
                symbol.as_str(),
                "rejected by execution layer",
            ));
        }
        let order_id = OrderId::new();
        self.clock += 1;
        self.submitted.push(LiquidationOrder::new(
            order_id,
            symbol.clone(),
            quantity,
            order_type,
            self.clock,
        ));
        Ok(order_id)
    }
}
