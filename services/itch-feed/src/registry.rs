//! Symbol Registry — Locate-code to ticker resolution
//!
//! Directory (`R`) messages assign each security a per-session numeric
//! locate code. The trade messages this pipeline aggregates carry their
//! symbol inline, so the registry is a safety net for message kinds that
//! identify securities only by locate code, and a count of the listed
//! universe for end-of-run logging.

use std::collections::HashMap;
use tracing::debug;
use types::symbol::Symbol;

/// Locate-code to symbol map built from directory messages.
#[derive(Debug, Default)]
pub struct SymbolRegistry {
    by_locate: HashMap<u16, Symbol>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a directory entry.
    ///
    /// The feed may re-issue directory entries intraday; the latest mapping
    /// for a locate code wins.
    pub fn register(&mut self, locate: u16, symbol: Symbol) {
        if let Some(previous) = self.by_locate.get(&locate) {
            if *previous != symbol {
                debug!(locate, from = %previous, to = %symbol, "Locate code remapped");
            }
        }
        self.by_locate.insert(locate, symbol);
    }

    /// Resolve a locate code to its ticker, if the directory has seen it.
    pub fn resolve(&self, locate: u16) -> Option<&Symbol> {
        self.by_locate.get(&locate)
    }

    /// Number of distinct locate codes registered.
    pub fn len(&self) -> usize {
        self.by_locate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_locate.is_empty()
    }
}
