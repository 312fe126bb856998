//! VWAP Aggregator — per-security accumulation and boundary snapshots
//!
//! Maintains running notional and share totals per security, watches the
//! stream clock for wall-clock hour boundaries, and emits cumulative VWAP
//! snapshots: one per security at every boundary on the session grid, and
//! one labeled "close" when market hours end.
//!
//! Boundary invariants:
//! - A boundary snapshot covers every trade stamped at or before the
//!   boundary instant; the trade that reveals the crossing is folded only
//!   after the snapshot is taken.
//! - An hour with no messages produces no gap: the skipped boundaries are
//!   emitted with the totals carried forward when the clock next moves.
//! - Snapshots are immutable once emitted, so after the close snapshot the
//!   accumulators freeze and late trades are counted but never folded.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use itch_feed::messages::{Message, SystemEventCode};
use types::numeric::{Price, PRICE_SCALE};
use types::symbol::Symbol;
use types::timestamp::{completed_hour, format_hms, wall_clock_ns, NANOS_PER_HOUR};

use crate::report::{HourLabel, VwapSnapshot};

// ── Session Window ──────────────────────────────────────────────────

/// Trading-session bounds, nanoseconds since midnight.
///
/// The snapshot grid runs from the first full hour after the open through
/// the hour of the close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionWindow {
    pub market_open_ns: u64,
    pub market_close_ns: u64,
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            market_open_ns: wall_clock_ns(9, 30, 0),
            market_close_ns: wall_clock_ns(16, 0, 0),
        }
    }
}

impl SessionWindow {
    /// First wall-clock hour eligible for a boundary snapshot.
    pub fn first_grid_hour(&self) -> u64 {
        self.market_open_ns / NANOS_PER_HOUR + 1
    }

    /// Last wall-clock hour eligible for a boundary snapshot.
    pub fn last_grid_hour(&self) -> u64 {
        self.market_close_ns / NANOS_PER_HOUR
    }

    /// Whether `hour` falls on the session's snapshot grid.
    pub fn in_grid(&self, hour: u64) -> bool {
        (self.first_grid_hour()..=self.last_grid_hour()).contains(&hour)
    }
}

// ── Security Accumulator ────────────────────────────────────────────

/// Running totals for one security.
///
/// Only created alongside a nonzero-share trade, so `vwap()` never
/// divides by zero.
#[derive(Debug, Clone)]
pub struct SecurityAccumulator {
    cumulative_notional: Decimal,
    cumulative_shares: u64,
    trades_folded: u64,
    last_snapshot_hour: Option<u64>,
}

impl SecurityAccumulator {
    fn new() -> Self {
        Self {
            cumulative_notional: Decimal::ZERO,
            cumulative_shares: 0,
            trades_folded: 0,
            last_snapshot_hour: None,
        }
    }

    fn fold(&mut self, shares: u64, price: Price) {
        self.cumulative_notional += price.notional(shares);
        self.cumulative_shares += shares;
        self.trades_folded += 1;
    }

    /// Cumulative VWAP over everything folded so far, rounded half-to-even
    /// and rendered at the feed's four-decimal price scale.
    pub fn vwap(&self) -> Decimal {
        let mut vwap = (self.cumulative_notional / Decimal::from(self.cumulative_shares))
            .round_dp(PRICE_SCALE);
        vwap.rescale(PRICE_SCALE);
        vwap
    }

    pub fn cumulative_shares(&self) -> u64 {
        self.cumulative_shares
    }

    pub fn trades_folded(&self) -> u64 {
        self.trades_folded
    }

    /// Hour of this security's most recent boundary snapshot, if any.
    pub fn last_snapshot_hour(&self) -> Option<u64> {
        self.last_snapshot_hour
    }
}

// ── Ingest Outcome ──────────────────────────────────────────────────

/// Result of ingesting a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Trade folded into its security's running totals.
    Applied,
    /// Timestamp moved backwards; totals were still updated but the
    /// timestamp was ignored for boundary detection.
    ClockRegression { last_ns: u64, observed_ns: u64 },
    /// Trade arrived after the session closed; counted, not folded.
    AfterClose,
    /// End-of-market-hours event closed the session.
    Closed,
    /// Message kind carries nothing for the aggregator.
    NoEffect,
}

// ── VWAP Aggregator ─────────────────────────────────────────────────

/// Per-security VWAP accumulation with hour-boundary snapshot emission.
///
/// Owns the only mutable map of accumulators; all access goes through
/// [`VwapAggregator::ingest`] and [`VwapAggregator::flush_final`].
pub struct VwapAggregator {
    window: SessionWindow,
    /// Per-security totals, keyed for deterministic emission order.
    accumulators: BTreeMap<Symbol, SecurityAccumulator>,
    /// Snapshots in emission order.
    snapshots: Vec<VwapSnapshot>,
    /// Highest timestamp observed on the stream clock.
    last_timestamp_ns: Option<u64>,
    /// Highest completed hour already swept for boundaries.
    watermark_hour: Option<u64>,
    /// Set once the close snapshot has been emitted.
    closed: bool,
    /// Trades folded into accumulators.
    trades_applied: u64,
    /// Trades dropped because the session was already closed.
    trades_after_close: u64,
    /// Timestamps that moved backwards.
    clock_regressions: u64,
}

impl VwapAggregator {
    /// Create an aggregator for the given session window.
    ///
    /// Panics if the window closes at or before it opens.
    pub fn new(window: SessionWindow) -> Self {
        assert!(
            window.market_open_ns < window.market_close_ns,
            "Session window must open before it closes"
        );
        info!(
            open = %format_hms(window.market_open_ns),
            close = %format_hms(window.market_close_ns),
            first_grid_hour = window.first_grid_hour(),
            last_grid_hour = window.last_grid_hour(),
            "VWAP aggregator initialized"
        );

        Self {
            window,
            accumulators: BTreeMap::new(),
            snapshots: Vec::new(),
            last_timestamp_ns: None,
            watermark_hour: None,
            closed: false,
            trades_applied: 0,
            trades_after_close: 0,
            clock_regressions: 0,
        }
    }

    /// Create an aggregator for the default 09:30–16:00 session.
    pub fn with_defaults() -> Self {
        Self::new(SessionWindow::default())
    }

    /// Ingest a single decoded message.
    ///
    /// Trades and cross trades fold into their security's totals; system
    /// events advance the stream clock and may close the session. Other
    /// kinds are inert here.
    pub fn ingest(&mut self, msg: &Message) -> IngestOutcome {
        match msg {
            Message::SystemEvent {
                timestamp_ns, code, ..
            } => {
                let regression = self.observe_clock(*timestamp_ns);
                if *code == SystemEventCode::EndOfMarketHours {
                    self.close_session();
                    return IngestOutcome::Closed;
                }
                match regression {
                    Some((last_ns, observed_ns)) => IngestOutcome::ClockRegression {
                        last_ns,
                        observed_ns,
                    },
                    None => IngestOutcome::NoEffect,
                }
            }
            Message::Trade {
                timestamp_ns,
                shares,
                symbol,
                price,
                ..
            }
            | Message::CrossTrade {
                timestamp_ns,
                shares,
                symbol,
                price,
                ..
            } => self.apply_trade(symbol, *shares, *price, *timestamp_ns),
            Message::StockDirectory { .. } | Message::Ignored { .. } => IngestOutcome::NoEffect,
        }
    }

    /// Emit the closing snapshot for every security with at least one
    /// folded trade and freeze the accumulators.
    ///
    /// Repeated close events are no-ops: the close snapshot is emitted
    /// once.
    pub fn close_session(&mut self) {
        if self.closed {
            debug!("Close event repeated; session already closed");
            return;
        }
        self.closed = true;

        for (symbol, acc) in &self.accumulators {
            self.snapshots.push(VwapSnapshot {
                symbol: symbol.clone(),
                hour_label: HourLabel::Close,
                vwap: acc.vwap(),
            });
        }
        info!(
            securities = self.accumulators.len(),
            trades = self.trades_applied,
            "Session closed"
        );
    }

    /// Close the session if still open and hand over every snapshot
    /// emitted during the run, in emission order.
    pub fn flush_final(&mut self) -> Vec<VwapSnapshot> {
        if !self.closed {
            self.close_session();
        }
        std::mem::take(&mut self.snapshots)
    }

    /// Session window this aggregator was built with.
    pub fn window(&self) -> &SessionWindow {
        &self.window
    }

    /// Number of securities with at least one folded trade.
    pub fn securities_tracked(&self) -> usize {
        self.accumulators.len()
    }

    /// Read access to one security's totals.
    pub fn accumulator(&self, symbol: &Symbol) -> Option<&SecurityAccumulator> {
        self.accumulators.get(symbol)
    }

    /// Total trades folded since creation.
    pub fn trades_applied(&self) -> u64 {
        self.trades_applied
    }

    /// Total trades dropped after close since creation.
    pub fn trades_after_close(&self) -> u64 {
        self.trades_after_close
    }

    /// Total clock regressions observed since creation.
    pub fn clock_regressions(&self) -> u64 {
        self.clock_regressions
    }

    /// Whether the close snapshot has been emitted.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ── Internal Helpers ────────────────────────────────────────────

    fn apply_trade(
        &mut self,
        symbol: &Symbol,
        shares: u64,
        price: Price,
        timestamp_ns: u64,
    ) -> IngestOutcome {
        let regression = self.observe_clock(timestamp_ns);

        if self.closed {
            self.trades_after_close += 1;
            debug!(
                symbol = %symbol,
                timestamp = %format_hms(timestamp_ns),
                "Trade after close; totals frozen"
            );
            return IngestOutcome::AfterClose;
        }

        let acc = self
            .accumulators
            .entry(symbol.clone())
            .or_insert_with(SecurityAccumulator::new);
        acc.fold(shares, price);
        self.trades_applied += 1;

        match regression {
            Some((last_ns, observed_ns)) => IngestOutcome::ClockRegression {
                last_ns,
                observed_ns,
            },
            None => IngestOutcome::Applied,
        }
    }

    /// Track the stream clock. Returns the `(last, observed)` pair when the
    /// timestamp moves backwards; otherwise advances the boundary sweep.
    fn observe_clock(&mut self, timestamp_ns: u64) -> Option<(u64, u64)> {
        if let Some(last) = self.last_timestamp_ns {
            if timestamp_ns < last {
                self.clock_regressions += 1;
                warn!(
                    last = %format_hms(last),
                    observed = %format_hms(timestamp_ns),
                    "Clock regression; timestamp ignored for boundary detection"
                );
                return Some((last, timestamp_ns));
            }
        }
        self.last_timestamp_ns = Some(timestamp_ns);
        if !self.closed {
            self.advance_watermark(timestamp_ns);
        }
        None
    }

    /// Emit snapshots for every grid hour the stream clock has moved past.
    ///
    /// Runs before the revealing message is folded, so each boundary
    /// snapshot covers exactly the trades stamped at or before the
    /// boundary instant.
    fn advance_watermark(&mut self, timestamp_ns: u64) {
        let completed = match completed_hour(timestamp_ns) {
            Some(hour) => hour,
            None => return,
        };
        let start = match self.watermark_hour {
            Some(prev) if completed <= prev => return,
            Some(prev) => prev + 1,
            None => self.window.first_grid_hour(),
        };
        for hour in start..=completed {
            if self.window.in_grid(hour) {
                self.emit_boundary(hour);
            }
        }
        self.watermark_hour = Some(completed);
    }

    /// Record one snapshot per tracked security at the given hour.
    fn emit_boundary(&mut self, hour: u64) {
        let label = HourLabel::Hour(hour as u8);
        for (symbol, acc) in &mut self.accumulators {
            acc.last_snapshot_hour = Some(hour);
            self.snapshots.push(VwapSnapshot {
                symbol: symbol.clone(),
                hour_label: label,
                vwap: acc.vwap(),
            });
        }
        debug!(
            hour,
            securities = self.accumulators.len(),
            "Hour boundary snapshots emitted"
        );
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use types::timestamp::NANOS_PER_SEC;

    fn at(hours: u64, minutes: u64, seconds: u64) -> u64 {
        wall_clock_ns(hours, minutes, seconds)
    }

    fn trade(symbol: &str, shares: u64, price_fixed4: u32, ts_ns: u64) -> Message {
        Message::Trade {
            locate: 1,
            timestamp_ns: ts_ns,
            shares,
            symbol: Symbol::new(symbol),
            price: Price::from_fixed4(price_fixed4),
            match_number: 0,
        }
    }

    fn cross(symbol: &str, shares: u64, price_fixed4: u32, ts_ns: u64) -> Message {
        Message::CrossTrade {
            locate: 1,
            timestamp_ns: ts_ns,
            shares,
            symbol: Symbol::new(symbol),
            price: Price::from_fixed4(price_fixed4),
            match_number: 0,
            cross_type: itch_feed::messages::CrossType::Closing,
        }
    }

    fn market_close(ts_ns: u64) -> Message {
        Message::SystemEvent {
            locate: 0,
            timestamp_ns: ts_ns,
            code: SystemEventCode::EndOfMarketHours,
        }
    }

    fn series_for<'a>(snapshots: &'a [VwapSnapshot], symbol: &str) -> Vec<&'a VwapSnapshot> {
        snapshots
            .iter()
            .filter(|s| s.symbol.as_str() == symbol)
            .collect()
    }

    #[test]
    fn test_single_trade_close_vwap() {
        let mut agg = VwapAggregator::with_defaults();
        assert_eq!(
            agg.ingest(&trade("AAPL", 100, 1_500_000, at(10, 15, 0))),
            IngestOutcome::Applied
        );

        let snapshots = agg.flush_final();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].hour_label, HourLabel::Close);
        assert_eq!(snapshots[0].vwap.to_string(), "150.0000");
    }

    #[test]
    fn test_boundary_scenario() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(10, 59, 59)));
        agg.ingest(&trade("AAPL", 50, 1_510_000, at(11, 0, 1)));
        agg.ingest(&trade("AAPL", 200, 1_490_000, at(15, 59, 59)));
        assert_eq!(agg.ingest(&market_close(at(16, 0, 0))), IngestOutcome::Closed);

        let snapshots = agg.flush_final();
        let aapl = series_for(&snapshots, "AAPL");

        let expected = [
            (HourLabel::Hour(11), "150.0000"),
            (HourLabel::Hour(12), "150.3333"),
            (HourLabel::Hour(13), "150.3333"),
            (HourLabel::Hour(14), "150.3333"),
            (HourLabel::Hour(15), "150.3333"),
            (HourLabel::Close, "149.5714"),
        ];
        assert_eq!(aapl.len(), expected.len());
        for (snap, (label, vwap)) in aapl.iter().zip(expected) {
            assert_eq!(snap.hour_label, label);
            assert_eq!(snap.vwap.to_string(), vwap);
        }
    }

    #[test]
    fn test_trade_at_exact_boundary_included() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(10, 30, 0)));
        // Stamped exactly on the boundary instant: belongs to the 11:00
        // snapshot, not the one after
        agg.ingest(&trade("AAPL", 50, 1_510_000, at(11, 0, 0)));
        agg.ingest(&trade("AAPL", 10, 1_000_000, at(11, 0, 0) + 1));

        let snapshots = agg.flush_final();
        let aapl = series_for(&snapshots, "AAPL");
        assert_eq!(aapl[0].hour_label, HourLabel::Hour(11));
        // (100*150 + 50*151) / 150
        assert_eq!(aapl[0].vwap.to_string(), "150.3333");
    }

    #[test]
    fn test_cross_trades_fold_like_trades() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("MSFT", 100, 2_000_000, at(10, 0, 30)));
        agg.ingest(&cross("MSFT", 300, 2_100_000, at(10, 5, 0)));

        let snapshots = agg.flush_final();
        // (100*200 + 300*210) / 400 = 207.5
        assert_eq!(snapshots[0].vwap.to_string(), "207.5000");
        assert_eq!(agg.trades_applied(), 2);
    }

    #[test]
    fn test_quiet_hours_carry_forward() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(10, 10, 0)));
        // Next activity four hours later; skipped boundaries backfill
        agg.ingest(&trade("AAPL", 100, 1_600_000, at(14, 10, 0)));

        let snapshots = agg.flush_final();
        let aapl = series_for(&snapshots, "AAPL");
        let labels: Vec<HourLabel> = aapl.iter().map(|s| s.hour_label).collect();
        assert_eq!(
            labels,
            vec![
                HourLabel::Hour(11),
                HourLabel::Hour(12),
                HourLabel::Hour(13),
                HourLabel::Hour(14),
                HourLabel::Close,
            ]
        );
        for snap in &aapl[..4] {
            assert_eq!(snap.vwap.to_string(), "150.0000");
        }
        assert_eq!(aapl[4].vwap.to_string(), "155.0000");
    }

    #[test]
    fn test_new_security_joins_at_next_boundary() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(10, 10, 0)));
        agg.ingest(&trade("MSFT", 10, 2_000_000, at(12, 30, 0)));
        agg.ingest(&trade("AAPL", 1, 1_500_000, at(13, 30, 0)));

        let snapshots = agg.flush_final();
        let msft = series_for(&snapshots, "MSFT");
        assert_eq!(msft[0].hour_label, HourLabel::Hour(13));

        let aapl = series_for(&snapshots, "AAPL");
        assert_eq!(aapl[0].hour_label, HourLabel::Hour(11));
    }

    #[test]
    fn test_clock_regression_still_folds() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(11, 30, 0)));

        let outcome = agg.ingest(&trade("AAPL", 100, 1_600_000, at(11, 15, 0)));
        assert_eq!(
            outcome,
            IngestOutcome::ClockRegression {
                last_ns: at(11, 30, 0),
                observed_ns: at(11, 15, 0),
            }
        );
        assert_eq!(agg.clock_regressions(), 1);
        assert_eq!(agg.trades_applied(), 2);

        let snapshots = agg.flush_final();
        let close = snapshots.last().unwrap();
        assert_eq!(close.hour_label, HourLabel::Close);
        assert_eq!(close.vwap.to_string(), "155.0000");
    }

    #[test]
    fn test_trade_after_close_not_folded() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(15, 30, 0)));
        agg.ingest(&market_close(at(16, 0, 0)));

        let outcome = agg.ingest(&trade("AAPL", 999, 9_990_000, at(16, 0, 5)));
        assert_eq!(outcome, IngestOutcome::AfterClose);
        assert_eq!(agg.trades_after_close(), 1);

        let snapshots = agg.flush_final();
        let close = snapshots.last().unwrap();
        assert_eq!(close.vwap.to_string(), "150.0000");
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(15, 30, 0)));
        agg.ingest(&market_close(at(16, 0, 0)));
        agg.ingest(&market_close(at(16, 0, 1)));

        let snapshots = agg.flush_final();
        let closes = snapshots
            .iter()
            .filter(|s| s.hour_label == HourLabel::Close)
            .count();
        assert_eq!(closes, 1);
    }

    #[test]
    fn test_flush_without_close_event() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(10, 15, 0)));

        let snapshots = agg.flush_final();
        assert!(agg.is_closed());
        assert_eq!(snapshots.last().unwrap().hour_label, HourLabel::Close);
        // A second flush hands over nothing new
        assert!(agg.flush_final().is_empty());
    }

    #[test]
    fn test_no_trades_no_snapshots() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&market_close(at(16, 0, 0)));
        assert!(agg.flush_final().is_empty());
        assert_eq!(agg.securities_tracked(), 0);
    }

    #[test]
    fn test_boundary_emission_precedes_close() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(15, 59, 0)));
        // Close event stamped past the 16:00 boundary reveals the crossing
        // first, then closes
        agg.ingest(&market_close(at(16, 0, 0) + NANOS_PER_SEC));

        let snapshots = agg.flush_final();
        let aapl = series_for(&snapshots, "AAPL");
        assert_eq!(aapl[0].hour_label, HourLabel::Hour(16));
        assert_eq!(aapl[1].hour_label, HourLabel::Close);
    }

    #[test]
    fn test_accumulator_bookkeeping() {
        let mut agg = VwapAggregator::with_defaults();
        agg.ingest(&trade("AAPL", 100, 1_500_000, at(10, 30, 0)));
        agg.ingest(&trade("AAPL", 50, 1_510_000, at(11, 30, 0)));

        let acc = agg.accumulator(&Symbol::new("AAPL")).unwrap();
        assert_eq!(acc.cumulative_shares(), 150);
        assert_eq!(acc.trades_folded(), 2);
        assert_eq!(acc.last_snapshot_hour(), Some(11));
    }

    #[test]
    #[should_panic(expected = "Session window must open before it closes")]
    fn test_inverted_window_rejected() {
        VwapAggregator::new(SessionWindow {
            market_open_ns: at(16, 0, 0),
            market_close_ns: at(9, 30, 0),
        });
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Close VWAP equals total notional over total shares for the
            /// whole session, however the trades arrive.
            #[test]
            fn prop_close_vwap_matches_ratio(
                trades in prop::collection::vec(
                    (1u64..10_000, 1u32..5_000_000, 0u64..23_400),
                    1..40,
                )
            ) {
                let mut agg = VwapAggregator::with_defaults();
                let mut notional = Decimal::ZERO;
                let mut volume = 0u64;

                for (shares, price_fixed4, offset_s) in &trades {
                    let ts = at(9, 30, 0) + offset_s * NANOS_PER_SEC;
                    agg.ingest(&trade("AAPL", *shares, *price_fixed4, ts));
                    notional += Price::from_fixed4(*price_fixed4).notional(*shares);
                    volume += shares;
                }

                let snapshots = agg.flush_final();
                let close = snapshots.last().unwrap();
                prop_assert_eq!(close.hour_label, HourLabel::Close);

                let mut expected = (notional / Decimal::from(volume)).round_dp(PRICE_SCALE);
                expected.rescale(PRICE_SCALE);
                prop_assert_eq!(close.vwap, expected);
            }

            /// Per-security snapshot labels are strictly increasing in hour
            /// order whatever the trade spacing.
            #[test]
            fn prop_snapshot_labels_strictly_increase(
                offsets in prop::collection::vec(0u64..23_400, 1..40)
            ) {
                let mut sorted = offsets;
                sorted.sort_unstable();

                let mut agg = VwapAggregator::with_defaults();
                for offset_s in &sorted {
                    let ts = at(9, 30, 0) + offset_s * NANOS_PER_SEC;
                    agg.ingest(&trade("AAPL", 10, 1_000_000, ts));
                }

                let snapshots = agg.flush_final();
                let labels: Vec<HourLabel> =
                    series_for(&snapshots, "AAPL").iter().map(|s| s.hour_label).collect();
                for pair in labels.windows(2) {
                    prop_assert!(pair[0] < pair[1]);
                }
            }
        }
    }
}
