//! Core types shared by the pay analyzer crates.
//!
//! Holds the work-item data model, the error type, pay-cycle date math,
//! the currency model and the number formatting helpers used by reports.

pub mod currency;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{PayError, Result};
