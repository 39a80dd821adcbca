//! Data layer of the pay analyzer.
//!
//! Parses earnings CSV exports into work items, aggregates them into
//! dashboard statistics and runs the range-selection pipeline.

pub mod aggregator;
pub mod analysis;
pub mod reader;

pub use pay_core as core;
