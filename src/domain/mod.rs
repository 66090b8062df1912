//! Core domain types and logic.

pub mod error;
pub mod transaction;
pub mod instrument;
pub mod series;
pub mod fx;
pub mod holdings;
pub mod valuation;
pub mod summary;
