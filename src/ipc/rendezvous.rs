/*!
 * Deadline-Bounded Rendezvous
 *
 * One logical wait: the deadline is computed once, right before the first
 * receive, and every retry after an interruption waits against that same
 * deadline. Alarm-based backends get a SIGALRM timer armed for the deadline
 * for the duration of the wait; its expiry reaches the loop only through the
 * cancellation token.
 */

use super::core::traits::TransportBackend;
use super::core::types::{IpcError, Message, Received, TimeoutMechanism};
use super::utils::Deadline;
use crate::signals::{AlarmTimer, CancellationToken};
use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Terminal rendezvous failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum RendezvousError {
    #[error("No peer within {timeout:?} (waited {elapsed:?})")]
    #[diagnostic(code(rendezvous::timed_out))]
    TimedOut { elapsed: Duration, timeout: Duration },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Failed(#[from] IpcError),
}

/// Bounded wait for a single message, signal or connection
#[derive(Debug, Clone, Copy)]
pub struct Rendezvous {
    timeout: Duration,
}

impl Rendezvous {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait on `handle` until a message arrives or the deadline passes
    pub fn run<B: TransportBackend>(
        &self,
        backend: &B,
        handle: &B::Handle,
        token: &CancellationToken,
    ) -> Result<Message, RendezvousError> {
        let deadline = Deadline::after(self.timeout);
        let alarm = match backend.timeout_mechanism() {
            TimeoutMechanism::Alarm => Some(AlarmTimer::arm(&deadline, token.clone())?),
            TimeoutMechanism::Native => None,
        };

        let mut interruptions = 0u32;
        let result = loop {
            if let Some(alarm) = &alarm {
                alarm.poll();
            }
            if token.is_cancelled() {
                break Err(Self::timed_out(&deadline));
            }

            match backend.receive_with_deadline(handle, &deadline, token)? {
                Received::Message(message) => break Ok(message),
                Received::TimedOut => break Err(Self::timed_out(&deadline)),
                Received::Interrupted => {
                    interruptions += 1;
                    trace!(interruptions, "Wait interrupted, retrying");
                    // native primitives report expiry themselves, but a wakeup
                    // at the deadline must not start another wait
                    if alarm.is_none() && deadline.is_expired() {
                        break Err(Self::timed_out(&deadline));
                    }
                }
            }
        };

        debug!(
            backend = backend.kind().as_str(),
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            interruptions,
            ok = result.is_ok(),
            "Rendezvous finished"
        );
        result
    }

    fn timed_out(deadline: &Deadline) -> RendezvousError {
        RendezvousError::TimedOut {
            elapsed: deadline.elapsed(),
            timeout: deadline.timeout(),
        }
    }
}
