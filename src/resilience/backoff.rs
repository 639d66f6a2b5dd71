//! Delay between retry attempts.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with up to 10% jitter. The default waits zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
}

impl Backoff {
    /// Start at `base_ms`, double per attempt, never exceed `max_ms`
    /// (or `base_ms` if that is larger).
    pub fn exponential(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms: max_ms.max(base_ms),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.base_ms == 0
    }

    /// Delay before retry number `attempt`, counting from 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.is_disabled() {
            return Duration::ZERO;
        }
        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        let ceiling = self.base_ms.saturating_mul(factor).min(self.max_ms);

        let spread = ceiling / 10;
        let jitter = match spread {
            0 => 0,
            n => rand::thread_rng().gen_range(0..n),
        };
        Duration::from_millis(ceiling + jitter)
    }
}
