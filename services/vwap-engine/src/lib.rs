//! VWAP Engine
//!
//! Consumes a TotalView-ITCH 5.0 feed and produces:
//! - Per-security cumulative VWAP accumulation
//! - Hour-boundary snapshots across the trading-session grid
//! - A close snapshot per security at end of market hours
//! - Session statistics with a per-tag message tally
//! - A bounded buffer of non-fatal diagnostics
//!
//! # Architecture
//!
//! ```text
//! feed bytes
//!      │
//!  ┌───▼────┐
//!  │Framing │  ← itch-feed
//!  └───┬────┘
//!      │
//!  ┌───▼────┐
//!  │Decode  │  ← itch-feed
//!  └───┬────┘
//!      │
//!  ┌───┴─────────┬─────────────┐
//!  │             │             │
//! ┌▼─────────┐ ┌─▼─────────┐ ┌─▼────────┐
//! │Registry  │ │Aggregator │ │ Tally    │
//! └──────────┘ └─┬─────────┘ └─┬────────┘
//!                │             │
//!            ┌───▼─────────────▼──┐
//!            │   SessionReport    │
//!            └────────────────────┘
//! ```

pub mod aggregator;
pub mod report;
pub mod session;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
