//! Core type definitions for the portfolio-margin risk engine
//!
//! Frozen data model shared by the margin engine and its test
//! harnesses: identifiers, fixed-point numerics, instruments,
//! positions, portfolio snapshots, liquidation orders, and the
//! error taxonomy.

pub mod errors;
pub mod ids;
pub mod instrument;
pub mod numeric;
pub mod order;
pub mod portfolio;
pub mod position;
