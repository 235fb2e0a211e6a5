//! Runtime Configuration
//!
//! Per-thread knobs for the reactive runtime. The defaults are what the
//! runtime uses when nothing is configured.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default cap on chained flush rounds.
pub const DEFAULT_MAX_FLUSH_ROUNDS: usize = 100;

/// Configuration for the reactive runtime on the current thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many flushes may chain (each scheduled by effects of the previous
    /// one) before the pending effects are dropped and an error is logged.
    pub max_flush_rounds: usize,

    /// Catch panics raised by effect and lifecycle callbacks and log them
    /// instead of unwinding into the scheduler.
    ///
    /// When off, a panicking effect unwinds out of the flush. Effects of the
    /// same batch that had not run yet stay queued and a new flush is
    /// requested for them.
    pub catch_panics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_flush_rounds: DEFAULT_MAX_FLUSH_ROUNDS,
            catch_panics: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_flush_rounds(mut self, rounds: usize) -> Self {
        self.max_flush_rounds = rounds;
        self
    }

    pub fn with_catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }
}
