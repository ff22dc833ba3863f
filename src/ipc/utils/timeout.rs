/*!
 * Rendezvous Deadline
 *
 * Absolute expiry computed once when a wait starts. Native timed primitives
 * (`mq_timedreceive`, `sem_timedwait`) take the wall-clock form; poll loops
 * and the alarm timer use the monotonic form.
 */

use nix::sys::time::TimeSpec;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Absolute point in time at which a wait gives up
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    at: Instant,
    wall: SystemTime,
    timeout: Duration,
}

impl Deadline {
    /// Deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            at: started + timeout,
            wall: SystemTime::now() + timeout,
            timeout,
        }
    }

    /// Configured timeout this deadline was derived from
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before expiry, zero once expired
    #[inline]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Wall-clock expiry as a `CLOCK_REALTIME` timespec
    pub fn realtime(&self) -> TimeSpec {
        let since_epoch = self
            .wall
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        TimeSpec::from_duration(since_epoch)
    }
}
