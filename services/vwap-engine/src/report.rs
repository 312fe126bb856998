//! Session Report — assembled output of a completed run
//!
//! The aggregator emits a flat snapshot sequence; this module groups it
//! into the per-security series handed to output sinks, together with the
//! run counters and any diagnostics. Everything here is plain data: sinks
//! choose the serialization format.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use types::symbol::Symbol;

use crate::session::SessionDiagnostic;

// ── Hour Labels ─────────────────────────────────────────────────────

/// Label attached to each snapshot.
///
/// Orders boundary snapshots by hour with the close snapshot after all of
/// them, matching emission order within one security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HourLabel {
    /// Snapshot at a wall-clock hour boundary; renders as "HH:00".
    Hour(u8),
    /// Final snapshot at market close; renders as "close".
    Close,
}

impl fmt::Display for HourLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HourLabel::Hour(hour) => write!(f, "{:02}:00", hour),
            HourLabel::Close => write!(f, "close"),
        }
    }
}

impl Serialize for HourLabel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

// ── Snapshots ───────────────────────────────────────────────────────

/// One emitted VWAP observation. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VwapSnapshot {
    pub symbol: Symbol,
    pub hour_label: HourLabel,
    pub vwap: Decimal,
}

/// `(hour_label, vwap)` pair within one security's series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRow {
    pub hour_label: HourLabel,
    pub vwap: Decimal,
}

// ── Session Stats ───────────────────────────────────────────────────

/// Counters for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Successfully framed messages, malformed and ignored included.
    pub messages_parsed: u64,
    /// Frames that decoded to an error and were skipped.
    pub malformed_messages: u64,
    /// Timestamps that moved backwards.
    pub clock_regressions: u64,
    /// Trades folded into accumulators.
    pub trades_applied: u64,
    /// Trades dropped because the session was already closed.
    pub trades_after_close: u64,
    /// Message count per wire tag.
    pub tally: BTreeMap<String, u64>,
}

// ── Session Report ──────────────────────────────────────────────────

/// Final output of one run over a feed.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Per-security snapshot series, in emission (hour) order.
    pub vwap: BTreeMap<Symbol, Vec<SnapshotRow>>,
    /// Run counters.
    pub stats: SessionStats,
    /// Non-fatal issues recorded during the run, oldest first.
    pub diagnostics: Vec<SessionDiagnostic>,
    /// Diagnostics discarded once the retention buffer filled.
    pub diagnostics_dropped: u64,
}

impl SessionReport {
    /// Group an emission-ordered snapshot sequence by security.
    pub fn assemble(
        snapshots: Vec<VwapSnapshot>,
        stats: SessionStats,
        diagnostics: Vec<SessionDiagnostic>,
        diagnostics_dropped: u64,
    ) -> Self {
        let mut vwap: BTreeMap<Symbol, Vec<SnapshotRow>> = BTreeMap::new();
        for snapshot in snapshots {
            vwap.entry(snapshot.symbol).or_default().push(SnapshotRow {
                hour_label: snapshot.hour_label,
                vwap: snapshot.vwap,
            });
        }
        Self {
            vwap,
            stats,
            diagnostics,
            diagnostics_dropped,
        }
    }

    /// Total messages successfully framed.
    pub fn messages_parsed(&self) -> u64 {
        self.stats.messages_parsed
    }

    /// Number of securities with at least one snapshot.
    pub fn securities(&self) -> usize {
        self.vwap.len()
    }

    /// Total snapshot rows across all securities.
    pub fn total_snapshots(&self) -> usize {
        self.vwap.values().map(Vec::len).sum()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
