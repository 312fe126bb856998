//! Types library for the ITCH VWAP pipeline
//!
//! This library provides the core domain values shared by the feed decoder
//! and the aggregation engine, ensuring type safety and deterministic
//! arithmetic end to end.
//!
//! # Modules
//! - `symbol`: validated ticker symbols (fixed-width, space-padded on the wire)
//! - `numeric`: fixed-point decimal prices
//! - `timestamp`: nanoseconds-since-midnight helpers and hour math

// Public modules
pub mod numeric;
pub mod symbol;
pub mod timestamp;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::numeric::*;
    pub use crate::symbol::*;
    pub use crate::timestamp::*;
}
