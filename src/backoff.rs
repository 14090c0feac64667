//! Polling backoff for load-balanced workers.
//!
//! When every queue in sight is empty, a polling worker sleeps between scan
//! rounds. The sleep ramps up from the configured base interval so an idle
//! pool stops burning cycles, and collapses back to the base as soon as any
//! task is obtained.

use std::time::Duration;

/// How the polling interval grows between consecutive empty rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffPolicy {
    /// `base * (1 + n)` after `n` backoff steps.
    #[default]
    Linear,
    /// `base * 2^n` after `n` backoff steps.
    Exponential,
}

/// Saturating step counter over a [`BackoffPolicy`].
pub(crate) struct BackoffTimer {
    base_ms: u64,
    policy: BackoffPolicy,
    max_steps: u32,
    step: u32,
}

impl BackoffTimer {
    pub fn new(base_ms: u64, policy: BackoffPolicy, max_steps: u32) -> Self {
        BackoffTimer {
            base_ms,
            policy,
            max_steps,
            step: 0,
        }
    }

    /// Returns the next sleep interval, advancing the step counter until it
    /// saturates at `max_steps`.
    pub fn next_interval(&mut self) -> Duration {
        if self.step < self.max_steps {
            self.step += 1;
        }
        let ms = match self.policy {
            BackoffPolicy::Linear => self.base_ms.saturating_mul(1 + u64::from(self.step)),
            BackoffPolicy::Exponential => {
                self.base_ms.saturating_mul(2u64.saturating_pow(self.step))
            }
        };
        Duration::from_millis(ms)
    }

    /// Collapses the ramp; called whenever a task is obtained.
    pub fn reset(&mut self) {
        self.step = 0;
    }
}
