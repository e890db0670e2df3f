//! Margin Engine Service
//!
//! Margin-call detection and forced liquidation for portfolio-margin
//! accounts:
//! - per-instrument margin requirement model (equities, options)
//! - portfolio margin aggregation and deficiency detection
//! - deterministic liquidation selection
//! - the margin-call orchestration state machine and its event bridge
//!
//! All computation is fixed-point Decimal and replayable: given an
//! identical sequence of ticks, two runs produce identical order
//! sequences.

pub mod aggregator;
pub mod events;
pub mod orchestrator;
pub mod providers;
pub mod requirement;
pub mod selector;
