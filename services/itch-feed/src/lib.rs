//! ITCH Feed — TotalView-ITCH 5.0 framing and message decoding
//!
//! Turns a raw feed byte stream into typed messages:
//! - Length-delimited frame extraction with byte-offset tracking
//! - Per-tag field decoding for the message kinds the VWAP pipeline consumes
//! - Locate-code symbol registry built from directory messages
//!
//! # Architecture
//!
//! ```text
//! bytes ──▶ FrameReader ──▶ RawFrame ──▶ Message::decode ──▶ Message
//!                                            │
//!                                    SymbolRegistry (R)
//! ```

pub mod frame;
pub mod messages;
pub mod registry;
