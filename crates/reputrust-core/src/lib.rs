//! # reputrust-core
//! Foundation types, ids, errors, and clock abstraction for the reputation
//! and trust core.

pub mod amount;
pub mod clock;
pub mod constants;
pub mod error;
pub mod ids;
pub mod types;
