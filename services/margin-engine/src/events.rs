//! Margin-call event definitions and the notification bridge
//!
//! One `MarginCallEvent` is emitted per call cycle, carrying the full
//! list of submitted liquidating orders. Events are immutable once
//! emitted; observers (strategy layer, test harnesses) consume them
//! through the `EventSink` trait.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use types::ids::{EventId, OrderId, PortfolioId, Symbol};

/// Record of one liquidating order submission within a call cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedOrder {
    pub symbol: Symbol,
    /// Signed closing quantity
    pub quantity: Decimal,
    /// Assigned by the order-management collaborator; None when the
    /// submission was rejected
    pub order_id: Option<OrderId>,
    /// Rejection reason for a failed submission
    pub error: Option<String>,
}

impl SubmittedOrder {
    pub fn accepted(symbol: Symbol, quantity: Decimal, order_id: OrderId) -> Self {
        Self {
            symbol,
            quantity,
            order_id: Some(order_id),
            error: None,
        }
    }

    pub fn failed(symbol: Symbol, quantity: Decimal, error: impl Into<String>) -> Self {
        Self {
            symbol,
            quantity,
            order_id: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// A margin call and the liquidations it triggered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginCallEvent {
    pub event_id: EventId,
    pub portfolio_id: PortfolioId,
    /// Deficiency that triggered the call (> 0)
    pub deficiency: Decimal,
    pub total_maintenance: Decimal,
    pub total_value: Decimal,
    /// All orders in the liquidation plan, in submission order,
    /// including failed submissions
    pub orders: Vec<SubmittedOrder>,
    /// True when the full candidate set was consumed and a deficiency
    /// remains; the engine has done all it can
    pub insufficient_liquidatable_margin: bool,
    pub timestamp: i64,
}

impl MarginCallEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        portfolio_id: PortfolioId,
        deficiency: Decimal,
        total_maintenance: Decimal,
        total_value: Decimal,
        orders: Vec<SubmittedOrder>,
        insufficient_liquidatable_margin: bool,
        timestamp: i64,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            portfolio_id,
            deficiency,
            total_maintenance,
            total_value,
            orders,
            insufficient_liquidatable_margin,
            timestamp,
        }
    }

    /// Orders whose submission was rejected
    pub fn failed_orders(&self) -> impl Iterator<Item = &SubmittedOrder> {
        self.orders.iter().filter(|o| o.is_failed())
    }
}

/// Observer interface for margin-call notifications
pub trait EventSink {
    fn on_margin_call(&mut self, event: &MarginCallEvent);
}

/// Sink that records every event, for harnesses asserting on call
/// count and timing
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<MarginCallEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for RecordingSink {
    fn on_margin_call(&mut self, event: &MarginCallEvent) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> MarginCallEvent {
        MarginCallEvent::new(
            PortfolioId::new(),
            Decimal::from(56_000),
            Decimal::from(191_000),
            Decimal::from(135_000),
            vec![
                SubmittedOrder::accepted(
                    Symbol::new("GOOG151224C00750000"),
                    Decimal::from(3),
                    OrderId::new(),
                ),
                SubmittedOrder::failed(
                    Symbol::new("GOOG"),
                    Decimal::from(-5),
                    "rejected by execution layer",
                ),
            ],
            false,
            1_450_915_200_000_000_000,
        )
    }

    #[test]
    fn test_event_ids_unique() {
        let e1 = sample_event();
        let e2 = sample_event();
        assert_ne!(e1.event_id, e2.event_id);
    }

    #[test]
    fn test_failed_orders_iterator() {
        let event = sample_event();
        let failed: Vec<_> = event.failed_orders().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].symbol.as_str(), "GOOG");
        assert!(failed[0].order_id.is_none());
    }

    #[test]
    fn test_recording_sink_collects() {
        let mut sink = RecordingSink::new();
        sink.on_margin_call(&sample_event());
        sink.on_margin_call(&sample_event());
        assert_eq!(sink.events.len(), 2);
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = sample_event();
        let json = serde_json::to_string(&event).unwrap();
        let back: MarginCallEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
