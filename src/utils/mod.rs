//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants, contract ABIs, unit conversion and the tax cache.

pub mod abi;
pub mod cache;
pub mod constants;
pub mod units;

pub use cache::*;
pub use constants::*;
pub use units::*;
