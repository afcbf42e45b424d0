use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::stack::Stack;

/// Result of a readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl Readiness {
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Fixed-interval readiness poller. No backoff, no jitter: the
/// check runs up to `attempts` times with `interval` between
/// failures.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub attempts: u32,
    pub interval: Duration,
}

impl Poller {
    #[must_use]
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    #[must_use]
    pub const fn for_stack(stack: &Stack) -> Self {
        Self::new(stack.ready_attempts, stack.ready_interval)
    }

    /// Poll `check` until it succeeds or attempts run out. Running
    /// out is not an error: it is logged and reported, and the
    /// caller carries on.
    pub fn wait<F>(&self, what: &str, mut check: F) -> Readiness
    where
        F: FnMut() -> bool,
    {
        for attempt in 1..=self.attempts {
            if check() {
                info!("✓ {what} ready ({attempt}/{})", self.attempts);
                return Readiness::Ready { attempts: attempt };
            }
            info!("Waiting for {what} ({attempt}/{})... retrying", self.attempts);
            if attempt < self.attempts {
                thread::sleep(self.interval);
            }
        }

        warn!(
            "⚠ {what} not ready after {} attempts, continuing anyway",
            self.attempts
        );
        Readiness::Exhausted {
            attempts: self.attempts,
        }
    }
}
