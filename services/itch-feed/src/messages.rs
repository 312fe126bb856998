//! Message Decoder — Typed views over raw ITCH 5.0 frames
//!
//! Dispatches on the frame's type tag and extracts the fields the VWAP
//! pipeline cares about. Four tags are decoded in full:
//!
//! - `S` System Event — session milestones, bounds the aggregation window
//! - `R` Stock Directory — locate-to-symbol mapping
//! - `P` Trade (non-cross) — primary VWAP input
//! - `Q` Cross Trade — auction executions, second VWAP input
//!
//! Every other tag decodes to [`Message::Ignored`], which carries only the
//! tag so the session tally stays complete. All integer fields are
//! big-endian; timestamps are 48-bit nanoseconds since midnight; prices are
//! unsigned 32-bit with four implied decimal places.

use crate::frame::RawFrame;
use thiserror::Error;
use types::numeric::Price;
use types::symbol::{Symbol, SymbolError};

/// Wire lengths (type tag included) per the ITCH 5.0 layouts.
pub const SYSTEM_EVENT_WIRE_LEN: usize = 12;
pub const STOCK_DIRECTORY_WIRE_LEN: usize = 39;
pub const TRADE_WIRE_LEN: usize = 44;
pub const CROSS_TRADE_WIRE_LEN: usize = 40;

// ── Errors ──────────────────────────────────────────────────────────

/// Recoverable per-message decode failures.
///
/// The session driver records these and skips the message; the frame still
/// counts toward the total parsed.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Short payload for '{tag}' message: declared {got} bytes, layout requires {needed}")]
    ShortPayload {
        tag: char,
        needed: usize,
        got: usize,
    },

    #[error("Bad symbol in '{tag}' message: {source}")]
    BadSymbol {
        tag: char,
        #[source]
        source: SymbolError,
    },

    #[error("Zero-share execution for {symbol} in '{tag}' message")]
    ZeroShares { tag: char, symbol: Symbol },
}

// ── System Event Codes ──────────────────────────────────────────────

/// Session milestone carried by an `S` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventCode {
    /// 'O' — first message of the day
    StartOfMessages,
    /// 'S' — system accepting orders
    StartOfSystemHours,
    /// 'Q' — continuous trading open
    StartOfMarketHours,
    /// 'M' — continuous trading closed
    EndOfMarketHours,
    /// 'E' — system no longer accepting orders
    EndOfSystemHours,
    /// 'C' — last message of the day
    EndOfMessages,
    /// Any code outside the published set
    Unknown(u8),
}

impl SystemEventCode {
    pub fn from_byte(code: u8) -> Self {
        match code {
            b'O' => SystemEventCode::StartOfMessages,
            b'S' => SystemEventCode::StartOfSystemHours,
            b'Q' => SystemEventCode::StartOfMarketHours,
            b'M' => SystemEventCode::EndOfMarketHours,
            b'E' => SystemEventCode::EndOfSystemHours,
            b'C' => SystemEventCode::EndOfMessages,
            other => SystemEventCode::Unknown(other),
        }
    }

    /// Human-readable description for logging.
    pub fn description(&self) -> &'static str {
        match self {
            SystemEventCode::StartOfMessages => "Start of Messages",
            SystemEventCode::StartOfSystemHours => "Start of System Hours",
            SystemEventCode::StartOfMarketHours => "Start of Market Hours",
            SystemEventCode::EndOfMarketHours => "End of Market Hours",
            SystemEventCode::EndOfSystemHours => "End of System Hours",
            SystemEventCode::EndOfMessages => "End of Messages",
            SystemEventCode::Unknown(_) => "Unknown",
        }
    }
}

// ── Cross Types ─────────────────────────────────────────────────────

/// Auction variety carried by a `Q` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossType {
    /// 'O' — opening cross
    Opening,
    /// 'C' — closing cross
    Closing,
    /// 'H' — cross for IPO or halted/paused securities
    IpoOrHalted,
    /// Any code outside the published set
    Unknown(u8),
}

impl CrossType {
    pub fn from_byte(code: u8) -> Self {
        match code {
            b'O' => CrossType::Opening,
            b'C' => CrossType::Closing,
            b'H' => CrossType::IpoOrHalted,
            other => CrossType::Unknown(other),
        }
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// Typed view of one decoded frame.
///
/// `shares` on [`Message::Trade`] is widened from the wire's `u32` so both
/// trade kinds feed the aggregator through the same arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// 'S' — session milestone
    SystemEvent {
        locate: u16,
        timestamp_ns: u64,
        code: SystemEventCode,
    },

    /// 'R' — directory entry establishing the locate-to-symbol mapping
    StockDirectory {
        locate: u16,
        timestamp_ns: u64,
        symbol: Symbol,
    },

    /// 'P' — completed non-cross execution
    Trade {
        locate: u16,
        timestamp_ns: u64,
        shares: u64,
        symbol: Symbol,
        price: Price,
        match_number: u64,
    },

    /// 'Q' — completed cross execution
    CrossTrade {
        locate: u16,
        timestamp_ns: u64,
        shares: u64,
        symbol: Symbol,
        price: Price,
        match_number: u64,
        cross_type: CrossType,
    },

    /// Every other tag; retained only for the message tally
    Ignored { tag: u8 },
}

impl Message {
    /// Decode a raw frame into a typed message.
    ///
    /// Total over the tag space: unrecognized tags are never an error. A
    /// recognized tag with a payload shorter than its fixed layout is a
    /// [`DecodeError`]; a longer payload decodes its known prefix.
    pub fn decode(frame: &RawFrame) -> Result<Self, DecodeError> {
        match frame.tag {
            b'S' => decode_system_event(frame),
            b'R' => decode_stock_directory(frame),
            b'P' => decode_trade(frame),
            b'Q' => decode_cross_trade(frame),
            tag => Ok(Message::Ignored { tag }),
        }
    }

    /// Message type tag as it appears on the wire.
    pub fn type_tag(&self) -> u8 {
        match self {
            Message::SystemEvent { .. } => b'S',
            Message::StockDirectory { .. } => b'R',
            Message::Trade { .. } => b'P',
            Message::CrossTrade { .. } => b'Q',
            Message::Ignored { tag } => *tag,
        }
    }

    /// Get the message kind as a string label for logging.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Message::SystemEvent { .. } => "SystemEvent",
            Message::StockDirectory { .. } => "StockDirectory",
            Message::Trade { .. } => "Trade",
            Message::CrossTrade { .. } => "CrossTrade",
            Message::Ignored { .. } => "Ignored",
        }
    }

    /// Wire timestamp if the kind carries one.
    pub fn timestamp_ns(&self) -> Option<u64> {
        match self {
            Message::SystemEvent { timestamp_ns, .. }
            | Message::StockDirectory { timestamp_ns, .. }
            | Message::Trade { timestamp_ns, .. }
            | Message::CrossTrade { timestamp_ns, .. } => Some(*timestamp_ns),
            Message::Ignored { .. } => None,
        }
    }

    /// Extract the symbol from the message if present.
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Message::StockDirectory { symbol, .. }
            | Message::Trade { symbol, .. }
            | Message::CrossTrade { symbol, .. } => Some(symbol),
            Message::SystemEvent { .. } | Message::Ignored { .. } => None,
        }
    }
}

// ── Per-Type Decoders ───────────────────────────────────────────────
//
// Offsets below are payload-relative: the type tag at wire offset 0 has
// already been split off by the frame reader, so wire offset N lands at
// payload offset N-1.

fn decode_system_event(frame: &RawFrame) -> Result<Message, DecodeError> {
    ensure_wire_len(frame, SYSTEM_EVENT_WIRE_LEN)?;
    let p = frame.payload.as_slice();
    Ok(Message::SystemEvent {
        locate: be_u16(p, 0),
        timestamp_ns: be_u48(p, 4),
        code: SystemEventCode::from_byte(p[10]),
    })
}

fn decode_stock_directory(frame: &RawFrame) -> Result<Message, DecodeError> {
    ensure_wire_len(frame, STOCK_DIRECTORY_WIRE_LEN)?;
    let p = frame.payload.as_slice();
    Ok(Message::StockDirectory {
        locate: be_u16(p, 0),
        timestamp_ns: be_u48(p, 4),
        symbol: read_symbol(frame, &p[10..18])?,
    })
}

fn decode_trade(frame: &RawFrame) -> Result<Message, DecodeError> {
    ensure_wire_len(frame, TRADE_WIRE_LEN)?;
    let p = frame.payload.as_slice();
    let symbol = read_symbol(frame, &p[23..31])?;
    let shares = u64::from(be_u32(p, 19));
    if shares == 0 {
        return Err(DecodeError::ZeroShares {
            tag: frame.tag as char,
            symbol,
        });
    }
    Ok(Message::Trade {
        locate: be_u16(p, 0),
        timestamp_ns: be_u48(p, 4),
        shares,
        symbol,
        price: Price::from_fixed4(be_u32(p, 31)),
        match_number: be_u64(p, 35),
    })
}

fn decode_cross_trade(frame: &RawFrame) -> Result<Message, DecodeError> {
    ensure_wire_len(frame, CROSS_TRADE_WIRE_LEN)?;
    let p = frame.payload.as_slice();
    let symbol = read_symbol(frame, &p[18..26])?;
    let shares = be_u64(p, 10);
    if shares == 0 {
        return Err(DecodeError::ZeroShares {
            tag: frame.tag as char,
            symbol,
        });
    }
    Ok(Message::CrossTrade {
        locate: be_u16(p, 0),
        timestamp_ns: be_u48(p, 4),
        shares,
        symbol,
        price: Price::from_fixed4(be_u32(p, 26)),
        match_number: be_u64(p, 30),
        cross_type: CrossType::from_byte(p[38]),
    })
}

// ── Field Helpers ───────────────────────────────────────────────────

fn ensure_wire_len(frame: &RawFrame, needed: usize) -> Result<(), DecodeError> {
    let got = frame.wire_len();
    if got < needed {
        return Err(DecodeError::ShortPayload {
            tag: frame.tag as char,
            needed,
            got,
        });
    }
    Ok(())
}

fn read_symbol(frame: &RawFrame, raw: &[u8]) -> Result<Symbol, DecodeError> {
    Symbol::from_padded(raw).map_err(|source| DecodeError::BadSymbol {
        tag: frame.tag as char,
        source,
    })
}

fn be_u16(p: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([p[at], p[at + 1]])
}

fn be_u32(p: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([p[at], p[at + 1], p[at + 2], p[at + 3]])
}

/// 48-bit big-endian timestamp, widened to u64.
fn be_u48(p: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf[2..].copy_from_slice(&p[at..at + 6]);
    u64::from_be_bytes(buf)
}

fn be_u64(p: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&p[at..at + 8]);
    u64::from_be_bytes(buf)
}

// ── Tests ───────────────────────────────────────────────────────────
