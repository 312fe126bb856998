//! Session Driver — runs the feed pipeline to completion
//!
//! Owns the Reader → Decoder → (Registry, Aggregator) loop for one feed:
//! counts every successfully framed message, routes directory entries to
//! the registry and everything else to the aggregator, records non-fatal
//! issues in a bounded diagnostics buffer, and materializes the final
//! [`SessionReport`].
//!
//! Framing errors are fatal and abort the run; decode errors skip the
//! message and the run continues.

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use itch_feed::frame::{FrameReader, FramingError};
use itch_feed::messages::Message;
use itch_feed::registry::SymbolRegistry;
use types::symbol::Symbol;
use types::timestamp::format_hms;

use crate::aggregator::{IngestOutcome, SessionWindow, VwapAggregator};
use crate::report::{SessionReport, SessionStats};

// ── Errors ──────────────────────────────────────────────────────────

/// Fatal session failures.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Feed framing failed: {0}")]
    Framing(#[from] FramingError),
}

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for one session run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Trading-session window defining the snapshot grid.
    pub window: SessionWindow,
    /// Log a progress line every N parsed messages. Zero disables.
    pub progress_interval: u64,
    /// Maximum retained diagnostics; the rest are counted and dropped.
    pub max_diagnostics: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            window: SessionWindow::default(),
            progress_interval: 10_000_000,
            max_diagnostics: 1_000,
        }
    }
}

// ── Diagnostics ─────────────────────────────────────────────────────

/// One non-fatal issue observed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDiagnostic {
    /// 1-based index of the frame in the stream.
    pub frame_index: u64,
    /// Stream offset of the frame's length prefix.
    pub byte_offset: u64,
    /// What went wrong.
    pub kind: DiagnosticKind,
}

/// Category of a recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum DiagnosticKind {
    /// Frame decoded to an error and was skipped.
    MalformedMessage { tag: char, detail: String },
    /// Timestamp moved backwards.
    ClockRegression { last_ns: u64, observed_ns: u64 },
    /// Trade arrived after the session close.
    TradeAfterClose { symbol: Symbol },
}

// ── Session Driver ──────────────────────────────────────────────────

/// Single-pass pipeline driver over one feed stream.
///
/// Consumed by [`SessionDriver::run`]: a session either completes to end
/// of stream or aborts on a fatal framing error, and is never reused.
pub struct SessionDriver {
    config: DriverConfig,
    registry: SymbolRegistry,
    aggregator: VwapAggregator,
    /// Message count per wire tag.
    tally: BTreeMap<String, u64>,
    /// Successfully framed messages, malformed and ignored included.
    messages_parsed: u64,
    /// Frames that decoded to an error and were skipped.
    malformed_messages: u64,
    /// Retained diagnostics, oldest first.
    diagnostics: Vec<SessionDiagnostic>,
    /// Diagnostics discarded after the buffer filled.
    diagnostics_dropped: u64,
}

impl SessionDriver {
    /// Create a driver with the given configuration.
    pub fn new(config: DriverConfig) -> Self {
        info!(
            progress_interval = config.progress_interval,
            max_diagnostics = config.max_diagnostics,
            "Session driver initialized"
        );

        let aggregator = VwapAggregator::new(config.window.clone());
        Self {
            config,
            registry: SymbolRegistry::new(),
            aggregator,
            tally: BTreeMap::new(),
            messages_parsed: 0,
            malformed_messages: 0,
            diagnostics: Vec::new(),
            diagnostics_dropped: 0,
        }
    }

    /// Create a driver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(DriverConfig::default())
    }

    /// Drive the pipeline over `source` until end of stream.
    ///
    /// Every successfully framed message counts toward the total; frames
    /// lost to a fatal framing error do not.
    pub fn run<R: Read>(mut self, source: R) -> Result<SessionReport, SessionError> {
        let started = Instant::now();
        let mut reader = FrameReader::new(source);

        loop {
            let byte_offset = reader.offset();
            let frame = match reader.next_frame()? {
                Some(frame) => frame,
                None => break,
            };

            self.messages_parsed += 1;
            *self.tally.entry(tally_key(frame.tag)).or_insert(0) += 1;

            if self.config.progress_interval > 0
                && self.messages_parsed % self.config.progress_interval == 0
            {
                info!(
                    messages = self.messages_parsed,
                    offset = reader.offset(),
                    "Feed progress"
                );
            }

            match Message::decode(&frame) {
                Ok(Message::StockDirectory { locate, symbol, .. }) => {
                    self.registry.register(locate, symbol);
                }
                Ok(message) => {
                    if let Message::SystemEvent {
                        timestamp_ns, code, ..
                    } = &message
                    {
                        info!(
                            event = code.description(),
                            time = %format_hms(*timestamp_ns),
                            "System event"
                        );
                    }
                    let outcome = self.aggregator.ingest(&message);
                    self.record_outcome(&message, outcome, reader.frames_read(), byte_offset);
                }
                Err(err) => {
                    self.malformed_messages += 1;
                    warn!(offset = byte_offset, error = %err, "Malformed message skipped");
                    self.push_diagnostic(
                        reader.frames_read(),
                        byte_offset,
                        DiagnosticKind::MalformedMessage {
                            tag: frame.tag as char,
                            detail: err.to_string(),
                        },
                    );
                }
            }
        }

        let snapshots = self.aggregator.flush_final();
        info!(
            messages = self.messages_parsed,
            malformed = self.malformed_messages,
            trades = self.aggregator.trades_applied(),
            securities = self.aggregator.securities_tracked(),
            directory_symbols = self.registry.len(),
            snapshots = snapshots.len(),
            tally = ?self.tally,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Session complete"
        );

        let stats = SessionStats {
            messages_parsed: self.messages_parsed,
            malformed_messages: self.malformed_messages,
            clock_regressions: self.aggregator.clock_regressions(),
            trades_applied: self.aggregator.trades_applied(),
            trades_after_close: self.aggregator.trades_after_close(),
            tally: self.tally,
        };
        Ok(SessionReport::assemble(
            snapshots,
            stats,
            self.diagnostics,
            self.diagnostics_dropped,
        ))
    }

    // ── Internal Helpers ────────────────────────────────────────────

    fn record_outcome(
        &mut self,
        message: &Message,
        outcome: IngestOutcome,
        frame_index: u64,
        byte_offset: u64,
    ) {
        match outcome {
            IngestOutcome::ClockRegression {
                last_ns,
                observed_ns,
            } => {
                self.push_diagnostic(
                    frame_index,
                    byte_offset,
                    DiagnosticKind::ClockRegression {
                        last_ns,
                        observed_ns,
                    },
                );
            }
            IngestOutcome::AfterClose => {
                if let Some(symbol) = message.symbol() {
                    self.push_diagnostic(
                        frame_index,
                        byte_offset,
                        DiagnosticKind::TradeAfterClose {
                            symbol: symbol.clone(),
                        },
                    );
                }
            }
            IngestOutcome::Applied | IngestOutcome::Closed | IngestOutcome::NoEffect => {}
        }
    }

    fn push_diagnostic(&mut self, frame_index: u64, byte_offset: u64, kind: DiagnosticKind) {
        if self.diagnostics.len() >= self.config.max_diagnostics {
            self.diagnostics_dropped += 1;
            return;
        }
        self.diagnostics.push(SessionDiagnostic {
            frame_index,
            byte_offset,
            kind,
        });
    }
}

/// Tally key for a wire tag: the ASCII character itself, or a hex form
/// for bytes outside the printable range.
fn tally_key(tag: u8) -> String {
    if tag.is_ascii_graphic() {
        (tag as char).to_string()
    } else {
        format!("0x{:02X}", tag)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
