/*!
 * Alarm Timer
 *
 * SIGALRM-driven timeout for backends whose blocking call has no native
 * deadline (System V `msgrcv` and `semop`). The handler is installed without
 * `SA_RESTART` so the blocking call fails with `EINTR`; the only state it
 * touches is a private flag that `AlarmTimer::poll` moves into the caller's
 * `CancellationToken`.
 *
 * The timer targets the arming thread and keeps firing every
 * `ALARM_RETRIGGER_INTERVAL` after the deadline, so a call entered right
 * after the first signal is still interrupted.
 */

use super::token::CancellationToken;
use crate::core::limits::ALARM_RETRIGGER_INTERVAL;
use crate::ipc::{Deadline, IpcError, IpcResult};
use nix::sys::signal::{
    sigaction, SaFlags, SigAction, SigEvent, SigHandler, SigSet, SigevNotify, Signal,
};
use nix::sys::time::TimeSpec;
use nix::sys::timer::{Expiration, Timer, TimerSetTimeFlags};
use nix::time::ClockId;
use nix::unistd::gettid;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

static ALARM_FIRED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_alarm(_: libc::c_int) {
    ALARM_FIRED.store(true, Ordering::SeqCst);
}

/// Armed SIGALRM timer; deleted and the previous handler restored on drop
pub struct AlarmTimer {
    timer: Option<Timer>,
    previous: SigAction,
    token: CancellationToken,
}

impl AlarmTimer {
    /// Install the handler and arm a timer that expires at `deadline`
    ///
    /// The signal is directed at the calling thread, which must be the one
    /// that blocks in the interruptible call.
    pub fn arm(deadline: &Deadline, token: CancellationToken) -> IpcResult<Self> {
        ALARM_FIRED.store(false, Ordering::SeqCst);

        let action = SigAction::new(
            SigHandler::Handler(on_alarm),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // SAFETY: the handler only stores into an atomic
        let previous = unsafe { sigaction(Signal::SIGALRM, &action) }
            .map_err(|e| IpcError::os("sigaction", e))?;

        // a zero first expiry would disarm the timer
        let first = deadline.remaining().max(Duration::from_micros(1));
        match thread_timer(first, ALARM_RETRIGGER_INTERVAL) {
            Ok(timer) => {
                debug!(first_ms = first.as_millis() as u64, "Alarm timer armed");
                Ok(Self {
                    timer: Some(timer),
                    previous,
                    token,
                })
            }
            Err(e) => {
                // SAFETY: restoring the disposition that was active before
                if let Err(errno) = unsafe { sigaction(Signal::SIGALRM, &previous) } {
                    warn!(error = %errno, "Failed to restore SIGALRM disposition");
                }
                Err(e)
            }
        }
    }

    /// Move a delivered alarm into the token; returns whether the token is cancelled
    pub fn poll(&self) -> bool {
        if ALARM_FIRED.swap(false, Ordering::SeqCst) {
            debug!("SIGALRM delivered, cancelling wait");
            self.token.cancel();
        }
        self.token.is_cancelled()
    }
}

impl Drop for AlarmTimer {
    fn drop(&mut self) {
        // delete the timer before the handler goes, or a late SIGALRM
        // would hit the default disposition
        drop(self.timer.take());
        // SAFETY: restoring the disposition that was active before arm()
        if let Err(e) = unsafe { sigaction(Signal::SIGALRM, &self.previous) } {
            warn!(error = %e, "Failed to restore SIGALRM disposition");
        }
        ALARM_FIRED.store(false, Ordering::SeqCst);
    }
}

/// Monotonic timer delivering SIGALRM to the calling thread, re-firing every `interval`
fn thread_timer(first: Duration, interval: Duration) -> IpcResult<Timer> {
    let event = SigEvent::new(SigevNotify::SigevThreadId {
        signal: Signal::SIGALRM,
        thread_id: gettid().as_raw(),
        si_value: 0,
    });
    let mut timer =
        Timer::new(ClockId::CLOCK_MONOTONIC, event).map_err(|e| IpcError::os("timer_create", e))?;
    timer
        .set(
            Expiration::IntervalDelayed(TimeSpec::from(first), TimeSpec::from(interval)),
            TimerSetTimeFlags::empty(),
        )
        .map_err(|e| IpcError::os("timer_settime", e))?;
    Ok(timer)
}
