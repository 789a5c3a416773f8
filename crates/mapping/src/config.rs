//! Evaluation limits.
//!
//! [`EvalConfig`] bounds how long a single evaluation may run. The bound is
//! enforced cooperatively: the evaluator checks the deadline at every node
//! and every array element it visits, so a program can never block its
//! caller for much longer than `timeout_ms`.
//!
//! ```rust
//! use mapping::EvalConfig;
//!
//! let cfg = EvalConfig::default();
//! assert_eq!(cfg.timeout_ms, 1_000);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default evaluation bound, one second.
pub const DEFAULT_TIMEOUT_MS: u64 = 1_000;

/// Per-evaluation limits shared by every provider expression.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvalConfig {
    /// Wall-clock budget for one evaluation, in milliseconds.
    ///
    /// Zero is accepted and makes every evaluation time out, which is
    /// mostly useful in tests.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl EvalConfig {
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
