//! Runtime layer of the pay analyzer.
//!
//! Owns the network-facing pieces: exchange-rate lookup with its TTL cache
//! and the feedback relay server.

pub mod rates;
pub mod relay;

pub use pay_core as core;
